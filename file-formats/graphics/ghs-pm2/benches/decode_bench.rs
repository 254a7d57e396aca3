use criterion::{Criterion, criterion_group, criterion_main};
use ghs_pm2::{MeshBuffers, decode_model};
use std::hint::black_box;

/// Fixed-point morph model with `groups` groups of one 64-vertex strip each
fn create_test_model(groups: u32) -> Vec<u8> {
    let mut data = b"PM2\x33".to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&groups.to_le_bytes());

    for group in 0..groups {
        let mut halves: Vec<i16> = vec![0; 8];
        halves[4] = group as i16;
        halves.extend_from_slice(&[64 | 0x8000u16 as i16, 0, 0, 0]);
        for i in 0..64i16 {
            halves.extend_from_slice(&[i * 16, i * 8, 0, 0]);
            halves.extend_from_slice(&[0, 4096, 0, 0]);
            halves.extend_from_slice(&[0, 16, 0, 0]);
            halves.extend_from_slice(&[0, 0, 0, 0]);
            halves.extend_from_slice(&[255, 255, 255, 128]);
            halves.extend_from_slice(&[i * 64, 0, 0, 0]);
        }

        data.extend_from_slice(&[0, 0, 0, 0x01]);
        for chunk in halves.chunks(255 * 4) {
            data.extend_from_slice(&[0, 0, (chunk.len() / 4) as u8, 0x6D]);
            for half in chunk {
                data.extend_from_slice(&half.to_le_bytes());
            }
        }
        data.extend_from_slice(&[0, 0, 0, 0x17]);
    }
    data
}

fn bench_decode(c: &mut Criterion) {
    let data = create_test_model(32);

    c.bench_function("decode_model", |b| {
        b.iter(|| {
            let _model = decode_model(black_box(&data)).unwrap();
        })
    });
}

fn bench_mesh_buffers(c: &mut Criterion) {
    let model = decode_model(&create_test_model(32)).unwrap();

    c.bench_function("mesh_buffers", |b| {
        b.iter(|| {
            let _mesh = MeshBuffers::from_model(black_box(&model));
        })
    });
}

criterion_group!(benches, bench_decode, bench_mesh_buffers);
criterion_main!(benches);
