//! Rebuild a tree from an opcode stream.
//!
//! Decoding is split in two stages joined by a bounded channel. A producer
//! thread parses records (unmarshaling values on the way) and ships them in
//! batches; the calling thread consumes the batches in order and rebuilds the
//! node structure with an explicit stack. When the channel is full the
//! producer blocks, so memory held by in-flight records stays bounded.
//!
//! A failed decode never returns a partial tree. If the producer hits a
//! malformed record it stops and its error is reported; if the consumer finds
//! an imbalance it drops the channel, which stops the producer at its next
//! send.

use std::io::{self, BufReader, Read};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use flate2::bufread::MultiGzDecoder;
use tracing::{debug, trace};

use crate::codec::ValueCodec;
use crate::config::{Compression, DecoderConfig};
use crate::cow::CowContext;
use crate::encoding::{read_varint, VarintError, GZIP_MAGIC, OP_BRANCH, OP_CLOSE, OP_KEYED};
use crate::error::{Error, Field, Imbalance, Result};
use crate::node::{Children, Node};
use crate::pool::NodePool;
use crate::tree::RadixTree;

/// Reads opcode streams back into trees using a value codec.
#[derive(Debug, Clone)]
pub struct Decoder<C> {
    codec: C,
    config: DecoderConfig,
}

/// One parsed record as it travels from producer to consumer.
enum Record<V> {
    Open { prefix: Vec<u8>, value: Option<V> },
    Close,
}

type Batch<V> = Vec<Record<V>>;

impl<C> Decoder<C> {
    /// Create a decoder that detects gzip input on its own.
    pub fn new(codec: C) -> Self {
        Self::with_config(codec, DecoderConfig::default())
    }

    /// Create a decoder with an explicit configuration.
    pub fn with_config(codec: C, config: DecoderConfig) -> Self {
        Self { codec, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a tree from an in-memory stream.
    pub fn decode<V>(&self, bytes: &[u8]) -> Result<RadixTree<V>>
    where
        C: ValueCodec<V> + Sync,
        V: Send,
    {
        self.read_from(bytes)
    }

    /// Decode a tree from `reader`.
    ///
    /// The stream is parsed on a scoped worker thread, so the reader must be
    /// `Send`. Input starting with the gzip magic is inflated unless the
    /// configuration pins the compression.
    pub fn read_from<V, R>(&self, reader: R) -> Result<RadixTree<V>>
    where
        C: ValueCodec<V> + Sync,
        V: Send,
        R: Read + Send,
    {
        let mut reader = reader;
        let mut magic = [0u8; GZIP_MAGIC.len()];
        let (compression, peeked) = match self.config.compression {
            Some(compression) => (compression, 0),
            None => {
                let peeked = peek(&mut reader, &mut magic)?;
                if magic[..peeked] == GZIP_MAGIC {
                    (Compression::Gzip, peeked)
                } else {
                    (Compression::None, peeked)
                }
            }
        };
        // Put the sniffed bytes back in front of the rest of the input.
        let reader = BufReader::new(io::Cursor::new(magic).take(peeked as u64).chain(reader));

        let result = match compression {
            Compression::None => self.pipeline(reader),
            Compression::Gzip => self.pipeline(MultiGzDecoder::new(reader)),
        };
        if let Err(err) = &result {
            debug!(error = %err, ?compression, "decode aborted");
        }
        result
    }

    fn pipeline<V, R>(&self, reader: R) -> Result<RadixTree<V>>
    where
        C: ValueCodec<V> + Sync,
        V: Send,
        R: Read + Send,
    {
        let batch_size = self.config.batch_size.max(1);
        let (tx, rx) = channel::bounded(self.config.queue_depth.max(1));
        let cx = CowContext::new(Arc::new(NodePool::new(self.config.pool_capacity)));
        let codec = &self.codec;

        thread::scope(|scope| {
            let producer = scope.spawn(move || produce(reader, codec, batch_size, tx));
            let built = consume(cx, rx);
            let produced = match producer.join() {
                Ok(produced) => produced,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            // A producer failure explains whatever the consumer saw after it.
            produced?;
            built
        })
    }
}

impl<V: Send> RadixTree<V> {
    /// Read a tree written by [`RadixTree::write_to`] or an [`Encoder`](crate::Encoder).
    ///
    /// Shorthand for `Decoder::new(codec).read_from(reader)`; gzip input is
    /// detected automatically.
    pub fn read_from<C, R>(reader: R, codec: C) -> Result<Self>
    where
        C: ValueCodec<V> + Sync,
        R: Read + Send,
    {
        Decoder::new(codec).read_from(reader)
    }
}

/// Fill `buf` from `reader`, stopping early only at end of input.
///
/// Readers may hand out a single byte per call, so one `read` is not enough
/// to see the whole gzip magic.
fn peek<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Byte reader that tracks its position for error reporting.
struct Tracked<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

impl<R: Read> Tracked<R> {
    fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Next opcode byte, or `None` at a clean end of stream.
    ///
    /// An inflater that runs dry before its trailer reports `UnexpectedEof`;
    /// that is a truncated stream, not a transport failure.
    fn opcode(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(Error::Truncated {
                        field: Field::Opcode,
                        offset: self.offset,
                    })
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Length-prefixed byte string.
    fn field(&mut self, length: Field, payload: Field) -> Result<Vec<u8>> {
        let start = self.offset;
        let len = match read_varint(self) {
            Ok((len, _)) => len,
            Err(VarintError::Eof) => {
                return Err(Error::Truncated {
                    field: length,
                    offset: start,
                })
            }
            Err(VarintError::Overflow) => return Err(Error::InvalidVarint { offset: start }),
            Err(VarintError::Io(e)) => return Err(Error::Io(e)),
        };
        if len < 0 {
            return Err(Error::InvalidLength { len, offset: start });
        }

        let start = self.offset;
        let len = len as u64;
        // Cap the upfront allocation; a corrupt length must not reserve gigabytes.
        let mut bytes = Vec::with_capacity(len.min(64 * 1024) as usize);
        let read = self.by_ref().take(len).read_to_end(&mut bytes);
        if let Err(e) = read {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                return Err(e.into());
            }
        }
        if (bytes.len() as u64) < len {
            return Err(Error::Truncated {
                field: payload,
                offset: start,
            });
        }
        Ok(bytes)
    }
}

/// Parse records and ship them to the consumer in batches.
///
/// Returns `Ok` early if the consumer has hung up; its own error is the one
/// worth reporting.
fn produce<R, V, C>(reader: R, codec: &C, batch_size: usize, tx: Sender<Batch<V>>) -> Result<()>
where
    R: Read,
    C: ValueCodec<V>,
{
    let mut reader = Tracked::new(reader);
    let mut batch = Vec::with_capacity(batch_size);
    let mut batches = 0u64;

    while let Some(opcode) = reader.opcode()? {
        let offset = reader.offset - 1;
        let record = match opcode {
            OP_CLOSE => Record::Close,
            OP_BRANCH | OP_KEYED => {
                let prefix = reader.field(Field::PrefixLength, Field::Prefix)?;
                if prefix.is_empty() {
                    return Err(Error::EmptyPrefix { offset });
                }
                let value = if opcode == OP_KEYED {
                    let bytes = reader.field(Field::ValueLength, Field::Value)?;
                    Some(codec.unmarshal(&bytes).map_err(Error::Codec)?)
                } else {
                    None
                };
                Record::Open { prefix, value }
            }
            opcode => return Err(Error::UnknownOpcode { opcode, offset }),
        };

        batch.push(record);
        if batch.len() == batch_size {
            batches += 1;
            trace!(batch = batches, offset = reader.offset, "decoded batch");
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if tx.send(full).is_err() {
                return Ok(());
            }
        }
    }

    if !batch.is_empty() {
        trace!(batch = batches + 1, records = batch.len(), "decoded final batch");
        let _ = tx.send(batch);
    }
    Ok(())
}

/// Rebuild the tree from batches in stream order.
///
/// Each open record pushes a fresh node; each close pops it and attaches it
/// to the node below it on the stack, or to the root list. Siblings must
/// arrive in strictly ascending first-byte order. Closed nodes are brought
/// into canonical form: valueless leaves are dropped and a valueless node
/// with one child absorbs it.
fn consume<V>(cx: CowContext<V>, rx: Receiver<Batch<V>>) -> Result<RadixTree<V>> {
    let mut roots = Children::new();
    let mut open: Vec<(u64, Node<V>)> = Vec::new();
    let mut record = 0u64;
    let mut keys = 0usize;

    for batch in rx {
        for item in batch {
            match item {
                Record::Open { prefix, value } => {
                    if value.is_some() {
                        keys += 1;
                    }
                    open.push((record, cx.new_node(&prefix, value)));
                }
                Record::Close => {
                    let Some((opened, mut node)) = open.pop() else {
                        return Err(Error::Unbalanced(Imbalance::UnexpectedClose { record }));
                    };
                    // Children closed first, so they are already canonical.
                    if !node.canonicalize(&cx) {
                        cx.release(node);
                    } else {
                        let siblings = match open.last_mut() {
                            Some((_, parent)) => &mut parent.children,
                            None => &mut roots,
                        };
                        if !siblings.push_ordered(Arc::new(node)) {
                            return Err(Error::MisorderedSibling { record: opened });
                        }
                    }
                }
            }
            record += 1;
        }
    }

    if !open.is_empty() {
        return Err(Error::Unbalanced(Imbalance::Unclosed { open: open.len() }));
    }

    debug!(records = record, keys, top_level = roots.len(), "decoded tree");
    Ok(RadixTree::from_parts(cx, roots, keys))
}
