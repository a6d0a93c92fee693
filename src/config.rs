//! Configuration for trees and for the stream codec.

use crate::pool::DEFAULT_POOL_CAPACITY;

/// Records per batch handed from the decode producer to the consumer.
pub const DEFAULT_BATCH_SIZE: usize = 1 << 10;

/// Batches the decode queue holds before the producer blocks.
pub const DEFAULT_QUEUE_DEPTH: usize = 4 << 10;

/// Default gzip compression level.
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Optional envelope around the opcode stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Bare opcode stream.
    #[default]
    None,
    /// gzip-wrapped opcode stream.
    Gzip,
}

/// Configuration for a [`RadixTree`](crate::RadixTree).
#[derive(Debug, Clone)]
pub struct Config {
    /// Idle node shells the tree's pool retains
    pub pool_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Configuration for an [`Encoder`](crate::Encoder).
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Envelope to wrap the stream in
    pub compression: Compression,
    /// gzip level, 0-9
    pub gzip_level: u32,
}

impl EncoderConfig {
    /// Wrap the stream in gzip at the default level.
    pub fn gzip() -> Self {
        Self {
            compression: Compression::Gzip,
            ..Self::default()
        }
    }

    /// Set the gzip level (clamped to 0-9).
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level.min(9);
        self
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            compression: Compression::None,
            gzip_level: DEFAULT_GZIP_LEVEL,
        }
    }
}

/// Configuration for a [`Decoder`](crate::Decoder).
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Records per batch sent through the queue
    pub batch_size: usize,
    /// Batches buffered before the producer blocks
    pub queue_depth: usize,
    /// Envelope of the input; `None` detects gzip by its magic bytes
    pub compression: Option<Compression>,
    /// Pool capacity of the rebuilt tree
    pub pool_capacity: usize,
}

impl DecoderConfig {
    /// Set the batch size (at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the queue depth (at least 1).
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth.max(1);
        self
    }

    /// Skip detection and assume the given envelope.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            compression: None,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}
