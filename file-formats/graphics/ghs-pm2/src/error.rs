use std::io;
use thiserror::Error;

/// Error types for PM2 model and MAP-PM2 container decoding
#[derive(Error, Debug)]
pub enum Pm2Error {
    /// I/O error while reading a file from disk
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended before a fixed-size read could complete
    #[error(
        "Truncated input at offset {offset}: requested {requested} bytes, {remaining} remaining"
    )]
    TruncatedInput {
        /// Cursor position at which the read was attempted
        offset: usize,
        /// Number of bytes the read needed
        requested: usize,
        /// Number of bytes left in the stream
        remaining: usize,
    },

    /// Invalid magic tag at the start of a file
    #[error("Invalid magic: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// Header type byte is not one of the four known model types
    #[error("Unknown PM2 model type 0x{0:02X}")]
    UnknownModelType(u8),

    /// Micro-op stream contains an opcode the decoder does not handle
    #[error("Unknown VIF opcode 0x{opcode:02X} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// MAP-PM2 container layout is inconsistent
    #[error("Invalid MAP-PM2 container: {0}")]
    InvalidContainer(String),

    /// Decoder error with the structure that was being read
    #[error("{0}: {1}")]
    Context(String, Box<Self>),
}

impl Pm2Error {
    /// Wrap this error with the name of the structure being decoded
    pub fn with_context(self, context: &str) -> Self {
        Self::Context(context.to_owned(), Box::new(self))
    }

    /// The innermost error, with all context layers removed
    pub fn root(&self) -> &Self {
        match self {
            Self::Context(_, inner) => inner.root(),
            other => other,
        }
    }

    /// True when the input was truncated
    pub fn is_truncated(&self) -> bool {
        matches!(self.root(), Self::TruncatedInput { .. })
    }

    /// True for bad magic, unknown type byte or unknown opcode
    pub fn is_invalid_format(&self) -> bool {
        matches!(
            self.root(),
            Self::InvalidMagic { .. } | Self::UnknownModelType(_) | Self::UnknownOpcode { .. }
        )
    }
}

/// Result type using Pm2Error
pub type Result<T> = std::result::Result<T, Pm2Error>;
