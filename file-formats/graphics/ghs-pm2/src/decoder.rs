//! PM2 model decoding
//!
//! A PM2 file is a 16-byte header followed by one VIF micro-op stream per
//! primitive group. Each stream is replayed into a simulated VU memory
//! buffer, which is then read back as a group header and a run of
//! primitive blocks.

use std::fs;
use std::path::Path;

use log::{debug, trace, warn};

use crate::error::{Pm2Error, Result};
use crate::model::{Model, ModelType, Primitive, PrimitiveGroup, Vertex};
use crate::reader::{ByteReader, Cursor};

/// Magic tag at the start of every PM2 file
pub const PM2_MAGIC: [u8; 3] = *b"PM2";

/// Size of the file header in bytes
pub const HEADER_SIZE: usize = 0x10;

/// Size of the group header at the start of VU memory
pub const GROUP_HEADER_SIZE: usize = 0x20;

/// Offset of `texture_offset` inside the group header
pub const TEXTURE_OFFSET_FIELD: usize = 0x10;

/// Size of a primitive header; only the first u32 is meaningful
pub const PRIMITIVE_HEADER_SIZE: usize = 0x10;

const PRIMITIVE_COUNT_MASK: u32 = 0x7FFF;
const PRIMITIVE_LAST_FLAG: u32 = 0x8000;

const POSITION_SCALE: f32 = 1024.0;
const NORMAL_SCALE: f32 = 4096.0;
const TEXCOORD_SCALE: f32 = 4096.0;
const RGB_SCALE: f32 = 256.0;
const ALPHA_SCALE: f32 = 128.0;

/// PM2 file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pm2Header {
    pub model_type: ModelType,
    pub unknown: u32,
    /// Declared file size; not trusted by the decoder
    pub file_size: u32,
    pub group_count: u32,
}

impl Pm2Header {
    pub fn parse<R: ByteReader>(reader: &mut R) -> Result<Self> {
        let magic = reader.take(3).map_err(|e| e.with_context("magic"))?;
        if magic != PM2_MAGIC {
            return Err(Pm2Error::InvalidMagic {
                expected: "PM2".to_string(),
                actual: String::from_utf8_lossy(magic).into_owned(),
            });
        }

        let type_byte = reader.read_u8().map_err(|e| e.with_context("model_type"))?;
        let model_type = ModelType::from_u8(type_byte)?;
        let unknown = reader.read_u32().map_err(|e| e.with_context("unknown"))?;
        let file_size = reader.read_u32().map_err(|e| e.with_context("file_size"))?;
        let group_count = reader
            .read_u32()
            .map_err(|e| e.with_context("group_count"))?;

        Ok(Self {
            model_type,
            unknown,
            file_size,
            group_count,
        })
    }
}

/// VIF opcodes understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VifOpcode {
    Nop = 0x00,
    /// Set write cycle; the decoder does not model cycles
    StCycl = 0x01,
    /// Start microprogram, marks the end of a group's stream
    MsCnt = 0x17,
    /// Unpack `num` 4x32-bit vectors verbatim
    UnpackV4_32 = 0x6C,
    /// Unpack `num` 4x16-bit vectors, sign-extended to 32 bits
    UnpackV4_16 = 0x6D,
}

impl VifOpcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::StCycl),
            0x17 => Some(Self::MsCnt),
            0x6C => Some(Self::UnpackV4_32),
            0x6D => Some(Self::UnpackV4_16),
            _ => None,
        }
    }
}

/// One 4-byte micro-op record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VifCommand {
    pub immediate: u16,
    pub num: u8,
    pub opcode: u8,
}

impl VifCommand {
    pub fn parse<R: ByteReader>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            immediate: reader.read_u16()?,
            num: reader.read_u8()?,
            opcode: reader.read_u8()?,
        })
    }
}

/// Decode a PM2 model from an in-memory byte buffer
pub fn decode_model(bytes: &[u8]) -> Result<Model> {
    let mut reader = Cursor::new(bytes);
    decode_model_from(&mut reader)
}

/// Read and decode a PM2 model file from disk
pub fn decode_model_file<P: AsRef<Path>>(path: P) -> Result<Model> {
    let bytes = fs::read(path)?;
    decode_model(&bytes)
}

/// Decode a PM2 model starting at the reader's current position
pub fn decode_model_from<R: ByteReader>(reader: &mut R) -> Result<Model> {
    let header = Pm2Header::parse(reader).map_err(|e| e.with_context("header"))?;
    debug!(
        "PM2 header: type {:?}, {} groups, declared size {}",
        header.model_type, header.group_count, header.file_size
    );

    // Each group needs at least one 4-byte command, cap the preallocation accordingly
    let capacity = (header.group_count as usize).min(reader.remaining() / 4);
    let mut groups = Vec::with_capacity(capacity);
    for index in 0..header.group_count {
        let group = decode_group(reader, header.model_type)
            .map_err(|e| e.with_context(&format!("group {}", index)))?;
        debug!(
            "group {}: texture 0x{:04X}, {} primitives",
            index,
            group.texture_offset,
            group.primitives.len()
        );
        groups.push(group);
    }

    if reader.remaining() > 0 {
        debug!("{} trailing bytes after last group", reader.remaining());
    }

    Ok(Model {
        model_type: header.model_type,
        groups,
    })
}

fn decode_group<R: ByteReader>(reader: &mut R, model_type: ModelType) -> Result<PrimitiveGroup> {
    let vu_memory = run_vif_stream(reader)?;
    parse_vu_memory(&vu_memory, model_type)
}

/// Replay micro-ops until end-of-block, returning the simulated VU memory
pub fn run_vif_stream<R: ByteReader>(reader: &mut R) -> Result<Vec<u8>> {
    let mut vu_memory = Vec::new();
    loop {
        let offset = reader.position();
        let command = VifCommand::parse(reader)?;
        let opcode = VifOpcode::from_u8(command.opcode).ok_or(Pm2Error::UnknownOpcode {
            opcode: command.opcode,
            offset,
        })?;
        trace!("VIF {:?} num={} imm=0x{:04X}", opcode, command.num, command.immediate);

        match opcode {
            VifOpcode::Nop | VifOpcode::StCycl => {}
            VifOpcode::MsCnt => break,
            VifOpcode::UnpackV4_32 => {
                let words = reader.take(command.num as usize * 16)?;
                vu_memory.extend_from_slice(words);
            }
            VifOpcode::UnpackV4_16 => {
                let halves = reader.read_i16_array(command.num as usize * 4)?;
                vu_memory.reserve(halves.len() * 4);
                for half in halves {
                    vu_memory.extend_from_slice(&i32::from(half).to_le_bytes());
                }
            }
        }
    }
    Ok(vu_memory)
}

fn parse_vu_memory(vu_memory: &[u8], model_type: ModelType) -> Result<PrimitiveGroup> {
    let mut reader = Cursor::new(vu_memory);
    let header = reader
        .take(GROUP_HEADER_SIZE)
        .map_err(|e| e.with_context("group header"))?;
    let texture_offset = u16::from_le_bytes([
        header[TEXTURE_OFFSET_FIELD],
        header[TEXTURE_OFFSET_FIELD + 1],
    ]);

    let mut primitives = Vec::new();
    loop {
        let index = primitives.len();
        let flags = reader
            .read_u32()
            .and_then(|flags| reader.skip(PRIMITIVE_HEADER_SIZE - 4).map(|()| flags))
            .map_err(|e| e.with_context(&format!("primitive {} header", index)))?;
        let count = (flags & PRIMITIVE_COUNT_MASK) as usize;
        let is_last = flags & PRIMITIVE_LAST_FLAG != 0;
        trace!("primitive {}: {} vertices, last={}", index, count, is_last);
        if count < 3 {
            warn!("primitive {} has only {} vertices", index, count);
        }

        let mut vertices = Vec::with_capacity(count.min(reader.remaining() / 64));
        for _ in 0..count {
            let vertex = read_vertex(&mut reader, model_type)
                .map_err(|e| e.with_context(&format!("primitive {} vertex", index)))?;
            vertices.push(vertex);
        }
        primitives.push(Primitive::new(vertices));

        if is_last {
            break;
        }
    }

    Ok(PrimitiveGroup {
        texture_offset,
        // The flag is not part of the decoded stream
        double_sided: false,
        primitives,
    })
}

fn read_vertex(reader: &mut Cursor<'_>, model_type: ModelType) -> Result<Vertex> {
    let count = model_type.fields_per_vertex();
    let fields: Vec<f32> = if model_type.is_fixed_point() {
        reader
            .read_i32_array(count)?
            .into_iter()
            .map(|v| v as f32)
            .collect()
    } else {
        reader.read_f32_array(count)?
    };

    let (position, normal, position_delta, normal_delta, color, st) = if model_type.is_animated()
    {
        (
            &fields[0..3],
            &fields[4..7],
            Some(&fields[8..11]),
            Some(&fields[12..15]),
            &fields[16..20],
            &fields[20..22],
        )
    } else {
        (
            &fields[0..3],
            &fields[4..7],
            None,
            None,
            &fields[8..12],
            &fields[12..14],
        )
    };

    let (position_scale, normal_scale, texcoord_scale) = if model_type.is_fixed_point() {
        (POSITION_SCALE, NORMAL_SCALE, TEXCOORD_SCALE)
    } else {
        (1.0, 1.0, 1.0)
    };

    Ok(Vertex {
        position: scaled3(position, position_scale),
        normal: scaled3(normal, normal_scale),
        color: [
            color[0] / RGB_SCALE,
            color[1] / RGB_SCALE,
            color[2] / RGB_SCALE,
            color[3] / ALPHA_SCALE,
        ],
        texcoord: [st[0] / texcoord_scale, st[1] / texcoord_scale],
        position_delta: position_delta.map(|d| scaled3(d, position_scale)),
        normal_delta: normal_delta.map(|d| scaled3(d, normal_scale)),
    })
}

fn scaled3(values: &[f32], divisor: f32) -> [f32; 3] {
    [values[0] / divisor, values[1] / divisor, values[2] / divisor]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(type_byte: u8, groups: u32) -> Vec<u8> {
        let mut data = b"PM2".to_vec();
        data.push(type_byte);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&groups.to_le_bytes());
        data
    }

    fn command(opcode: u8, num: u8) -> [u8; 4] {
        [0, 0, num, opcode]
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut data = header(0x12, 0);
        data[0] = b'Q';
        let err = decode_model(&data).unwrap_err();
        assert!(err.is_invalid_format());
        assert!(matches!(err.root(), Pm2Error::InvalidMagic { actual, .. } if actual == "QM2"));
    }

    #[test]
    fn test_header_rejects_unknown_type() {
        let err = decode_model(&header(0x14, 0)).unwrap_err();
        assert!(matches!(err.root(), Pm2Error::UnknownModelType(0x14)));
    }

    #[test]
    fn test_zero_groups() {
        let model = decode_model(&header(0x33, 0)).unwrap();
        assert!(model.animated());
        assert!(model.groups.is_empty());
    }

    #[test]
    fn test_unpack16_sign_extends() {
        let mut data = Vec::new();
        data.extend_from_slice(&command(0x01, 0));
        data.extend_from_slice(&command(0x6D, 1));
        for v in [-1i16, 2, -3, 4] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&command(0x17, 0));

        let vu = run_vif_stream(&mut Cursor::new(&data)).unwrap();
        let words: Vec<i32> = vu
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(words, vec![-1, 2, -3, 4]);
    }

    #[test]
    fn test_unknown_opcode_reports_offset() {
        let mut data = Vec::new();
        data.extend_from_slice(&command(0x00, 0));
        data.extend_from_slice(&command(0x6E, 1));
        let err = run_vif_stream(&mut Cursor::new(&data)).unwrap_err();
        assert!(matches!(
            err,
            Pm2Error::UnknownOpcode {
                opcode: 0x6E,
                offset: 4
            }
        ));
    }

    #[test]
    fn test_stream_without_end_is_truncated() {
        let data = command(0x00, 0);
        let err = run_vif_stream(&mut Cursor::new(&data)).unwrap_err();
        assert!(err.is_truncated());
    }
}
