//! In-memory PM2 fixture writer

#![allow(dead_code)]

pub const FLOAT32: u8 = 0x12;
pub const FLOAT32_ANIM: u8 = 0x13;
pub const FIXED16: u8 = 0x32;
pub const FIXED16_ANIM: u8 = 0x33;

const STCYCL: u8 = 0x01;
const MSCNT: u8 = 0x17;
const UNPACK_V4_32: u8 = 0x6C;
const UNPACK_V4_16: u8 = 0x6D;

/// Raw vertex fields as they sit in VU memory (16 or 24 values)
pub type RawVertex = Vec<f32>;

pub struct GroupFixture {
    pub texture_offset: u16,
    pub primitives: Vec<Vec<RawVertex>>,
}

impl GroupFixture {
    pub fn new(texture_offset: u16, primitives: Vec<Vec<RawVertex>>) -> Self {
        Self {
            texture_offset,
            primitives,
        }
    }
}

fn is_fixed(type_byte: u8) -> bool {
    type_byte & 0xF0 == 0x30
}

/// Build a static vertex record
pub fn static_vertex(position: [f32; 3], normal: [f32; 3], color: [f32; 4], st: [f32; 2]) -> RawVertex {
    let mut fields = Vec::with_capacity(16);
    fields.extend_from_slice(&position);
    fields.push(0.0);
    fields.extend_from_slice(&normal);
    fields.push(0.0);
    fields.extend_from_slice(&color);
    fields.extend_from_slice(&st);
    fields.extend_from_slice(&[0.0, 0.0]);
    fields
}

/// Build a morph vertex record
pub fn animated_vertex(
    position: [f32; 3],
    normal: [f32; 3],
    position_delta: [f32; 3],
    normal_delta: [f32; 3],
    color: [f32; 4],
    st: [f32; 2],
) -> RawVertex {
    let mut fields = Vec::with_capacity(24);
    for triple in [position, normal, position_delta, normal_delta] {
        fields.extend_from_slice(&triple);
        fields.push(0.0);
    }
    fields.extend_from_slice(&color);
    fields.extend_from_slice(&st);
    fields.extend_from_slice(&[0.0, 0.0]);
    fields
}

/// Encode a group's VU memory image as 32-bit words
fn vu_words(type_byte: u8, group: &GroupFixture) -> Vec<u32> {
    let mut words = vec![0u32; 8];
    words[4] = u32::from(group.texture_offset);

    let count = group.primitives.len();
    for (index, primitive) in group.primitives.iter().enumerate() {
        let mut flags = primitive.len() as u32;
        if index + 1 == count {
            flags |= 0x8000;
        }
        words.extend_from_slice(&[flags, 0, 0, 0]);
        for vertex in primitive {
            for &field in vertex {
                let word = if is_fixed(type_byte) {
                    field as i32 as u32
                } else {
                    field.to_bits()
                };
                words.push(word);
            }
        }
    }
    words
}

fn command(opcode: u8, num: u8) -> [u8; 4] {
    [0, 0, num, opcode]
}

/// Encode one group as a micro-op stream
pub fn group_stream(type_byte: u8, group: &GroupFixture) -> Vec<u8> {
    let words = vu_words(type_byte, group);
    let mut stream = command(STCYCL, 0).to_vec();
    for chunk in words.chunks(255 * 4) {
        let num = (chunk.len() / 4) as u8;
        if is_fixed(type_byte) {
            stream.extend_from_slice(&command(UNPACK_V4_16, num));
            for &word in chunk {
                // Sign-extension on unpack restores the flag bit and negative values
                stream.extend_from_slice(&(word as u16).to_le_bytes());
            }
        } else {
            stream.extend_from_slice(&command(UNPACK_V4_32, num));
            for &word in chunk {
                stream.extend_from_slice(&word.to_le_bytes());
            }
        }
    }
    stream.extend_from_slice(&command(MSCNT, 0));
    stream
}

pub fn header(type_byte: u8, group_count: u32, file_size: u32) -> Vec<u8> {
    let mut data = b"PM2".to_vec();
    data.push(type_byte);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&file_size.to_le_bytes());
    data.extend_from_slice(&group_count.to_le_bytes());
    data
}

/// Encode a complete PM2 file
pub fn pm2_file(type_byte: u8, groups: &[GroupFixture]) -> Vec<u8> {
    let mut body = Vec::new();
    for group in groups {
        body.extend(group_stream(type_byte, group));
    }
    let mut data = header(type_byte, groups.len() as u32, (16 + body.len()) as u32);
    data.extend(body);
    data
}

/// A single-group, single-strip static float model with `n` vertices
pub fn float_strip(n: usize) -> Vec<u8> {
    let vertices = (0..n)
        .map(|i| {
            static_vertex(
                [i as f32, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [128.0, 128.0, 128.0, 128.0],
                [0.0, 0.0],
            )
        })
        .collect();
    pm2_file(FLOAT32, &[GroupFixture::new(0x1234, vec![vertices])])
}
