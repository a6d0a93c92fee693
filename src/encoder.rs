//! Serialize a tree to the pre-order opcode stream.
//!
//! Every node becomes one open record (`+` for a branch, `=` for a node with
//! a value) followed by its children's records and a closing `-`:
//!
//! ```text
//! +  varint(len) prefix
//! =  varint(len) prefix  varint(len) value
//! -
//! ```
//!
//! The stream is staged in memory and handed to the writer in one go, so a
//! value that fails to marshal leaves the writer untouched.

use std::io::Write;

use flate2::write::GzEncoder;
use tracing::debug;

use crate::codec::ValueCodec;
use crate::config::{Compression, EncoderConfig};
use crate::encoding::{encode_bytes, OP_BRANCH, OP_CLOSE, OP_KEYED};
use crate::error::{Error, Result};
use crate::node::Node;
use crate::tree::RadixTree;

/// Writes trees as opcode streams using a value codec.
#[derive(Debug, Clone)]
pub struct Encoder<C> {
    codec: C,
    config: EncoderConfig,
}

/// Counters from staging one stream.
#[derive(Debug, Default, Clone, Copy)]
struct Staged {
    records: u64,
    keys: u64,
}

impl<C> Encoder<C> {
    /// Create an encoder with the default (uncompressed) configuration.
    pub fn new(codec: C) -> Self {
        Self::with_config(codec, EncoderConfig::default())
    }

    /// Create an encoder with an explicit configuration.
    pub fn with_config(codec: C, config: EncoderConfig) -> Self {
        Self { codec, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode `tree` into a byte vector, compressed if configured.
    pub fn encode<V>(&self, tree: &RadixTree<V>) -> Result<Vec<u8>>
    where
        C: ValueCodec<V>,
    {
        let mut out = Vec::new();
        self.write_to(tree, &mut out)?;
        Ok(out)
    }

    /// Encode `tree` into `writer`.
    ///
    /// Returns the length of the opcode stream, before any compression.
    pub fn write_to<V, W: Write>(&self, tree: &RadixTree<V>, mut writer: W) -> Result<u64>
    where
        C: ValueCodec<V>,
    {
        let (stream, staged) = self.stage(tree)?;

        match self.config.compression {
            Compression::None => {
                writer.write_all(&stream)?;
                writer.flush()?;
            }
            Compression::Gzip => {
                let level = flate2::Compression::new(self.config.gzip_level);
                let mut gz = GzEncoder::new(writer, level);
                gz.write_all(&stream)?;
                gz.finish()?.flush()?;
            }
        }

        debug!(
            records = staged.records,
            keys = staged.keys,
            bytes = stream.len(),
            compression = ?self.config.compression,
            "encoded tree"
        );
        Ok(stream.len() as u64)
    }

    /// Build the uncompressed stream in memory.
    fn stage<V>(&self, tree: &RadixTree<V>) -> Result<(Vec<u8>, Staged)>
    where
        C: ValueCodec<V>,
    {
        let mut out = Vec::new();
        let mut value_buf = Vec::new();
        let mut staged = Staged::default();

        // (node, closing): a node is pushed once to open and once to close.
        let mut stack: Vec<(&Node<V>, bool)> =
            tree.children.iter().rev().map(|child| (&**child, false)).collect();

        while let Some((node, closing)) = stack.pop() {
            if closing {
                out.push(OP_CLOSE);
                continue;
            }
            staged.records += 1;
            match &node.value {
                None => {
                    out.push(OP_BRANCH);
                    encode_bytes(&node.prefix, &mut out);
                }
                Some(value) => {
                    staged.keys += 1;
                    value_buf.clear();
                    self.codec
                        .marshal(value, &mut value_buf)
                        .map_err(Error::Codec)?;
                    out.push(OP_KEYED);
                    encode_bytes(&node.prefix, &mut out);
                    encode_bytes(&value_buf, &mut out);
                }
            }
            stack.push((node, true));
            stack.extend(node.children.iter().rev().map(|child| (&**child, false)));
        }

        Ok((out, staged))
    }
}

impl<V> RadixTree<V> {
    /// Write this tree as an uncompressed opcode stream.
    ///
    /// Shorthand for `Encoder::new(codec).write_to(self, writer)`.
    pub fn write_to<C, W>(&self, writer: W, codec: C) -> Result<u64>
    where
        C: ValueCodec<V>,
        W: Write,
    {
        Encoder::new(codec).write_to(self, writer)
    }
}
