//! Error types for encoding and decoding trees.
//!
//! Tree mutations never fail; only the stream codec surfaces errors.

use thiserror::Error;

/// Boxed error returned by value codecs.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Record field that was cut short by the end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Opcode byte; only an inflater can end a stream here without a clean EOF.
    Opcode,
    /// Length varint in front of a prefix.
    PrefixLength,
    /// Prefix bytes.
    Prefix,
    /// Length varint in front of a value.
    ValueLength,
    /// Marshaled value bytes.
    Value,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Field::Opcode => "opcode",
            Field::PrefixLength => "prefix length",
            Field::Prefix => "prefix",
            Field::ValueLength => "value length",
            Field::Value => "value",
        };
        f.write_str(name)
    }
}

/// Ways the open/close nesting of a stream can fail to balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Imbalance {
    /// A close record arrived while no node was open.
    UnexpectedClose {
        /// Index of the offending record.
        record: u64,
    },
    /// The stream ended with nodes still open.
    Unclosed {
        /// Number of nodes left open.
        open: usize,
    },
}

impl std::fmt::Display for Imbalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Imbalance::UnexpectedClose { record } => {
                write!(f, "close record {record} has no open node")
            }
            Imbalance::Unclosed { open } => write!(f, "{open} node(s) left open at end of stream"),
        }
    }
}

/// Coarse error category, one per fatal failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad opcode, truncated or invalid record.
    MalformedStream,
    /// Open/close records do not nest.
    Unbalanced,
    /// The value codec rejected a value.
    Codec,
    /// The underlying reader or writer failed.
    Io,
}

/// The error type for encoding and decoding.
#[derive(Error, Debug)]
pub enum Error {
    /// Byte at an opcode position is not `+`, `=` or `-`.
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode {
        /// The offending byte.
        opcode: u8,
        /// Byte offset of the opcode in the uncompressed stream.
        offset: u64,
    },

    /// The stream ended in the middle of a record.
    #[error("stream truncated inside {field} at offset {offset}")]
    Truncated {
        /// The field that was cut short.
        field: Field,
        /// Byte offset where the field starts.
        offset: u64,
    },

    /// A varint ran past ten bytes or overflowed 64 bits.
    #[error("invalid varint at offset {offset}")]
    InvalidVarint {
        /// Byte offset of the first varint byte.
        offset: u64,
    },

    /// A length field decoded to a negative number.
    #[error("invalid length {len} at offset {offset}")]
    InvalidLength {
        /// The decoded length.
        len: i64,
        /// Byte offset of the length varint.
        offset: u64,
    },

    /// A node record carried a zero-length prefix.
    #[error("empty prefix in record at offset {offset}")]
    EmptyPrefix {
        /// Byte offset of the record's opcode.
        offset: u64,
    },

    /// Sibling records were not in strictly ascending first-byte order.
    #[error("record {record} is out of order among its siblings")]
    MisorderedSibling {
        /// Index of the open record of the misplaced node.
        record: u64,
    },

    /// Open/close records do not nest.
    #[error("unbalanced stream: {0}")]
    Unbalanced(Imbalance),

    /// Marshal or unmarshal callback failed.
    #[error("value codec failed: {0}")]
    Codec(#[source] BoxError),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownOpcode { .. }
            | Error::Truncated { .. }
            | Error::InvalidVarint { .. }
            | Error::InvalidLength { .. }
            | Error::EmptyPrefix { .. }
            | Error::MisorderedSibling { .. } => ErrorKind::MalformedStream,
            Error::Unbalanced(_) => ErrorKind::Unbalanced,
            Error::Codec(_) => ErrorKind::Codec,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}
