//! Formatting utilities

use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a submodel id the way files are named on disc
pub fn format_submodel(id: i32) -> String {
    if id < 0 {
        id.to_string()
    } else {
        format!("{:03x}", id)
    }
}

/// Format a min/max box
pub fn format_bounds(min: [f32; 3], max: [f32; 3]) -> String {
    format!(
        "({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
        min[0], min[1], min[2], max[0], max[1], max[2]
    )
}

/// Format a visibility timeline as `frame:on/off` pairs
pub fn format_samples(samples: &[(i32, bool)]) -> String {
    if samples.is_empty() {
        return "always".to_string();
    }
    samples
        .iter()
        .map(|&(frame, visible)| format!("{}:{}", frame, if visible { "on" } else { "off" }))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1024), "1.02 kB");
    }

    #[test]
    fn test_format_submodel() {
        assert_eq!(format_submodel(0x1a), "01a");
        assert_eq!(format_submodel(-3), "-3");
    }

    #[test]
    fn test_format_samples() {
        assert_eq!(format_samples(&[]), "always");
        assert_eq!(format_samples(&[(0, false), (11, true)]), "0:off 11:on");
    }
}
