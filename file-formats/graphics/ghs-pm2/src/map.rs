//! MAP-PM2 room containers
//!
//! A room file bundles many PM2 models behind a grid of offsets:
//!
//! ```text
//! [ "MAP\0" ]            optional, missing in some files
//! u32 file_size
//! u16 columns, u16 rows
//! u32 reserved
//! u32 offsets[columns * rows]   0 marks an empty cell
//! ... embedded PM2 files ...
//! ```
//!
//! Each embedded file runs from its offset to the next larger offset, the
//! last one to the end of the container.

use std::fs;
use std::path::Path;

use custom_debug::Debug;
use log::{debug, warn};

use crate::debug;
use crate::decoder::{PM2_MAGIC, decode_model};
use crate::error::{Pm2Error, Result};
use crate::model::Model;
use crate::reader::{ByteReader, Cursor};

/// Magic tag of containers that carry the 4-byte prefix
pub const MAP_MAGIC: [u8; 3] = *b"MAP";

/// One embedded PM2 file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    /// Offset of the entry inside the container
    pub offset: usize,
    #[debug(with = debug::trimmed_collection_fmt)]
    pub data: Vec<u8>,
}

impl MapEntry {
    pub fn decode(&self) -> Result<Model> {
        decode_model(&self.data).map_err(|e| e.with_context(&format!("entry at 0x{:X}", self.offset)))
    }
}

/// A parsed MAP-PM2 container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapContainer {
    /// Whether the file started with the `MAP` prefix
    pub has_magic: bool,
    pub file_size: u32,
    pub columns: u16,
    pub rows: u16,
    /// Raw grid of offsets, zero for empty cells
    #[debug(with = debug::trimmed_collection_fmt)]
    pub offsets: Vec<u32>,
    /// Embedded files in offset order
    pub entries: Vec<MapEntry>,
}

impl MapContainer {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let has_magic = bytes.get(..3) == Some(&MAP_MAGIC[..]);
        if !has_magic && !is_headerless_container(bytes) {
            let actual = String::from_utf8_lossy(bytes.get(..3).unwrap_or(bytes)).into_owned();
            return Err(Pm2Error::InvalidMagic {
                expected: "MAP".to_string(),
                actual,
            });
        }

        let mut reader = Cursor::new(bytes);
        if has_magic {
            reader.skip(4)?;
        }
        let (file_size, columns, rows, offsets) = read_table(&mut reader)?;

        if file_size as usize != bytes.len() {
            debug!(
                "MAP declared size {} differs from actual size {}",
                file_size,
                bytes.len()
            );
        }

        let entries = split_entries(bytes, &offsets);
        debug!(
            "MAP container {}x{}: {} embedded models",
            columns,
            rows,
            entries.len()
        );

        Ok(Self {
            has_magic,
            file_size,
            columns,
            rows,
            offsets,
            entries,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Decode every entry; a bad entry fails on its own without affecting the others
    pub fn models(&self) -> Vec<Result<Model>> {
        self.entries.iter().map(MapEntry::decode).collect()
    }

    /// Number of non-empty cells in the offset grid
    pub fn occupied_cells(&self) -> usize {
        self.offsets.iter().filter(|&&o| o > 0).count()
    }
}

fn split_entries(bytes: &[u8], offsets: &[u32]) -> Vec<MapEntry> {
    let mut starts: Vec<usize> = offsets
        .iter()
        .filter(|&&o| o > 0)
        .map(|&o| o as usize)
        .collect();
    starts.sort_unstable();

    let mut entries = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(bytes.len()).min(bytes.len());
        if start >= end {
            // Duplicate offsets and offsets past the end carry no data
            if start > bytes.len() {
                warn!("MAP offset 0x{:X} is past the end of the file", start);
            }
            continue;
        }
        entries.push(MapEntry {
            offset: start,
            data: bytes[start..end].to_vec(),
        });
    }
    entries
}

fn read_table(reader: &mut Cursor<'_>) -> Result<(u32, u16, u16, Vec<u32>)> {
    let file_size = reader.read_u32().map_err(|e| e.with_context("file_size"))?;
    let columns = reader.read_u16().map_err(|e| e.with_context("columns"))?;
    let rows = reader.read_u16().map_err(|e| e.with_context("rows"))?;
    reader.skip(4).map_err(|e| e.with_context("reserved"))?;
    let offsets = reader
        .read_u32_array(columns as usize * rows as usize)
        .map_err(|e| e.with_context("offset table"))?;
    Ok((file_size, columns, rows, offsets))
}

/// Detect a container that lacks the `MAP` prefix
///
/// The first u32 must equal the container length, the offset table must
/// fit, and every non-zero offset must point at a PM2 magic.
pub fn is_headerless_container(bytes: &[u8]) -> bool {
    let Ok((file_size, _, _, offsets)) = read_table(&mut Cursor::new(bytes)) else {
        return false;
    };
    if file_size as usize != bytes.len() {
        return false;
    }

    let mut occupied = offsets.iter().filter(|&&o| o > 0).peekable();
    if occupied.peek().is_none() {
        return false;
    }
    occupied.all(|&offset| {
        let offset = offset as usize;
        bytes.get(offset..offset + 3) == Some(&PM2_MAGIC[..])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(with_magic: bool, cells: &[u32], trailer: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        if with_magic {
            data.extend_from_slice(b"MAP\0");
        }
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&(cells.len() as u16).to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        for cell in cells {
            data.extend_from_slice(&cell.to_le_bytes());
        }
        data.extend_from_slice(trailer);
        let size = data.len() as u32;
        let size_at = if with_magic { 4 } else { 0 };
        data[size_at..size_at + 4].copy_from_slice(&size.to_le_bytes());
        data
    }

    #[test]
    fn test_entries_span_to_next_offset() {
        // header 16 + 3 cells 12 = 28
        let payload = b"PM2aaaaPM2bb";
        let data = container(true, &[35, 0, 28], payload);
        let map = MapContainer::parse(&data).unwrap();

        assert!(map.has_magic);
        assert_eq!(map.occupied_cells(), 2);
        assert_eq!(map.entries.len(), 2);
        assert_eq!(map.entries[0].offset, 28);
        assert_eq!(map.entries[0].data, b"PM2aaaa");
        assert_eq!(map.entries[1].data, b"PM2bb");
    }

    #[test]
    fn test_headerless_detection() {
        // header 12 + 1 cell 4 = 16
        let data = container(false, &[16], b"PM2x");
        assert!(is_headerless_container(&data));
        let map = MapContainer::parse(&data).unwrap();
        assert!(!map.has_magic);
        assert_eq!(map.entries[0].data, b"PM2x");
    }

    #[test]
    fn test_headerless_requires_pm2_targets() {
        let data = container(false, &[16], b"XYZx");
        assert!(!is_headerless_container(&data));
        assert!(matches!(
            MapContainer::parse(&data),
            Err(Pm2Error::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_headerless_requires_matching_size() {
        let mut data = container(false, &[16], b"PM2x");
        data.push(0);
        assert!(!is_headerless_container(&data));
    }

    #[test]
    fn test_empty_spans_are_skipped() {
        let data = container(true, &[28, 28, 500], b"PM2q");
        let map = MapContainer::parse(&data).unwrap();
        assert_eq!(map.entries.len(), 1);
        assert_eq!(map.entries[0].data, b"PM2q");
    }
}
