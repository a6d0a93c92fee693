//! # cow-radix
//!
//! A radix (PATRICIA) tree over byte-string keys with O(1) copy-on-write
//! snapshots and a compact streaming format for saving and reloading it.
//!
//! ## Features
//!
//! - **Canonical compressed form**: prefixes are split on insert and merged
//!   back on delete, so no valueless node ever has a single child
//! - **Snapshots**: [`RadixTree::snapshot`] shares every node; later writes
//!   fork only the nodes on their own path
//! - **Node pool**: cleared nodes are recycled through a bounded, lockable
//!   [`NodePool`] that trees may share
//! - **Streaming format**: a pre-order opcode stream, optionally gzip-wrapped,
//!   rebuilt by a two-stage pipelined [`Decoder`]
//!
//! ## Example
//!
//! ```rust
//! use cow_radix::{RadixTree, Utf8};
//!
//! let mut tree: RadixTree<String> = RadixTree::new();
//! tree.replace_or_insert(b"romane", "first".to_string());
//! tree.replace_or_insert(b"romanus", "second".to_string());
//!
//! let mut snapshot = tree.snapshot();
//! snapshot.delete(b"romane");
//! assert!(tree.contains(b"romane"));
//! assert!(!snapshot.contains(b"romane"));
//!
//! let mut bytes = Vec::new();
//! tree.write_to(&mut bytes, Utf8).unwrap();
//! let loaded: RadixTree<String> = RadixTree::read_from(&bytes[..], Utf8).unwrap();
//! assert_eq!(loaded.get(b"romanus").map(String::as_str), Some("second"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
mod config;
mod cow;
mod decoder;
mod encoder;
pub mod encoding;
mod error;
mod node;
mod pool;
mod tree;

pub use codec::{Bytes, FnCodec, Unit, Utf8, ValueCodec};
pub use config::{
    Compression, Config, DecoderConfig, EncoderConfig, DEFAULT_BATCH_SIZE, DEFAULT_GZIP_LEVEL,
    DEFAULT_QUEUE_DEPTH,
};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{BoxError, Error, ErrorKind, Field, Imbalance, Result};
pub use pool::{NodePool, DEFAULT_POOL_CAPACITY};
pub use tree::{Iter, RadixTree};

#[cfg(test)]
mod proptests;
