mod common;

use common::*;
use ghs_pm2::{MapContainer, MeshBuffers, ModelType, Pm2Error, decode_model};
use pretty_assertions::assert_eq;
use test_case::test_case;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[test]
fn test_four_vertex_strip_gives_two_triangles_with_flipped_winding() {
    // Zig-zag strip in the XY plane
    let positions = [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
    let vertices = positions
        .iter()
        .map(|&p| static_vertex(p, [0.0, 0.0, 1.0], [256.0, 256.0, 256.0, 128.0], [0.5, 0.5]))
        .collect();
    let data = pm2_file(FLOAT32, &[GroupFixture::new(0, vec![vertices])]);

    let model = decode_model(&data).unwrap();
    let primitive = &model.groups[0].primitives[0];
    let triangles = primitive.triangles();
    assert_eq!(triangles, vec![[1, 0, 2], [1, 2, 3]]);

    // Raw strip order alternates orientation; the emitted index order
    // flips the first triangle so both faces point the same way.
    let normal_of = |[a, b, c]: [u32; 3]| {
        let p = |i: u32| primitive.vertices[i as usize].position;
        cross(sub(p(b), p(a)), sub(p(c), p(a)))[2]
    };
    let raw_first = normal_of([0, 1, 2]);
    let raw_second = normal_of([1, 2, 3]);
    assert!(raw_first * raw_second < 0.0);
    assert!(normal_of(triangles[0]) * normal_of(triangles[1]) > 0.0);
}

#[test]
fn test_float_model_only_normalizes_color() {
    let vertex = static_vertex(
        [1.5, -2.0, 3.25],
        [0.0, 1.0, 0.0],
        [256.0, 128.0, 0.0, 64.0],
        [0.25, 0.75],
    );
    let data = pm2_file(FLOAT32, &[GroupFixture::new(0x0ABC, vec![vec![vertex; 3]])]);

    let model = decode_model(&data).unwrap();
    assert_eq!(model.model_type, ModelType::Float32);
    assert!(!model.animated());
    assert_eq!(model.groups[0].texture_offset, 0x0ABC);
    assert_eq!(model.groups[0].texture_hint(), "abc");

    let v = model.groups[0].primitives[0].vertices[0];
    assert_eq!(v.position, [1.5, -2.0, 3.25]);
    assert_eq!(v.normal, [0.0, 1.0, 0.0]);
    assert_eq!(v.color, [1.0, 0.5, 0.0, 0.5]);
    assert_eq!(v.texcoord, [0.25, 0.75]);
    assert!(v.position_delta.is_none());
}

#[test]
fn test_fixed_point_model_normalizes_every_field() {
    let vertex = animated_vertex(
        [1024.0, -2048.0, 512.0],
        [4096.0, 0.0, -4096.0],
        [-1024.0, 0.0, 256.0],
        [0.0, 2048.0, 0.0],
        [128.0, 64.0, 256.0, 128.0],
        [2048.0, 4096.0],
    );
    let data = pm2_file(FIXED16_ANIM, &[GroupFixture::new(0xF00D, vec![vec![vertex; 3]])]);

    let model = decode_model(&data).unwrap();
    assert!(model.animated());
    assert_eq!(model.groups[0].texture_offset, 0xF00D);

    let v = model.groups[0].primitives[0].vertices[2];
    assert_eq!(v.position, [1.0, -2.0, 0.5]);
    assert_eq!(v.normal, [1.0, 0.0, -1.0]);
    assert_eq!(v.position_delta, Some([-1.0, 0.0, 0.25]));
    assert_eq!(v.normal_delta, Some([0.0, 0.5, 0.0]));
    assert_eq!(v.color, [0.5, 0.25, 1.0, 1.0]);
    assert!(approx(v.texcoord[0], 0.5) && approx(v.texcoord[1], 1.0));
}

#[test]
fn test_multiple_groups_and_primitives() {
    let v = static_vertex([0.0; 3], [0.0; 3], [0.0; 4], [0.0; 2]);
    let groups = [
        GroupFixture::new(1, vec![vec![v.clone(); 3], vec![v.clone(); 5]]),
        GroupFixture::new(2, vec![vec![v.clone(); 4]]),
    ];
    let model = decode_model(&pm2_file(FIXED16, &groups)).unwrap();

    assert_eq!(model.groups.len(), 2);
    assert_eq!(model.groups[0].primitives.len(), 2);
    assert_eq!(model.groups[0].primitives[1].len(), 5);
    assert_eq!(model.primitive_count(), 3);
    assert_eq!(model.triangle_count(), 1 + 3 + 2);

    let mesh = MeshBuffers::from_model(&model);
    assert_eq!(mesh.vertex_count(), 12);
    assert_eq!(mesh.triangle_groups, vec![0, 0, 0, 0, 1, 1]);
}

#[test]
fn test_large_group_spans_several_unpack_commands() {
    // 200 vertices of 16 fields need 800 qwords, more than one command holds
    let v = static_vertex([1.0; 3], [0.0; 3], [0.0; 4], [0.0; 2]);
    let data = pm2_file(FLOAT32, &[GroupFixture::new(0, vec![vec![v; 200]])]);
    let model = decode_model(&data).unwrap();
    assert_eq!(model.vertex_count(), 200);
}

#[test_log::test]
fn test_every_truncation_fails_with_truncated_input() {
    let data = float_strip(4);
    for len in 0..data.len() {
        let err = decode_model(&data[..len]).unwrap_err();
        assert!(
            err.is_truncated(),
            "length {} gave {:?} instead of truncation",
            len,
            err
        );
    }
    assert!(decode_model(&data).is_ok());
}

#[test_case(0x00 ; "zero")]
#[test_case(0x11 ; "below float")]
#[test_case(0x31 ; "below fixed")]
#[test_case(0xFF ; "all bits")]
fn test_unknown_type_is_invalid_format(type_byte: u8) {
    let mut data = float_strip(3);
    data[3] = type_byte;
    let err = decode_model(&data).unwrap_err();
    assert!(err.is_invalid_format());
    assert!(matches!(err.root(), Pm2Error::UnknownModelType(t) if *t == type_byte));
}

#[test_log::test]
fn test_unknown_opcode_aborts_decode() {
    let mut data = float_strip(3);
    // First command of the first group is STCYCL at offset 16
    data[19] = 0x6E;
    let err = decode_model(&data).unwrap_err();
    assert!(err.is_invalid_format());
    assert!(matches!(
        err.root(),
        Pm2Error::UnknownOpcode {
            opcode: 0x6E,
            offset: 16
        }
    ));
}

#[test_log::test]
fn test_map_container_batch_keeps_good_entries() {
    let good = float_strip(3);
    let mut bad = float_strip(3);
    bad[3] = 0x99;

    // "MAP\0" + size + 2x1 grid + reserved + 2 offsets
    let table_end = 16 + 8;
    let mut data = b"MAP\0".to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&(table_end as u32).to_le_bytes());
    data.extend_from_slice(&((table_end + good.len()) as u32).to_le_bytes());
    data.extend_from_slice(&good);
    data.extend_from_slice(&bad);
    let size = data.len() as u32;
    data[4..8].copy_from_slice(&size.to_le_bytes());

    let map = MapContainer::parse(&data).unwrap();
    let models = map.models();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].as_ref().unwrap().vertex_count(), 3);
    assert!(models[1].as_ref().unwrap_err().is_invalid_format());
}
