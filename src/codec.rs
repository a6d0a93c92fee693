//! Value marshalling for the stream format.
//!
//! The tree itself never looks inside values. Encoding and decoding go
//! through a [`ValueCodec`] chosen by the caller.

use crate::error::BoxError;

/// Converts values to and from the bytes stored in keyed records.
///
/// Decoding runs `unmarshal` on a producer thread, hence the `Sync` bound
/// where a codec is handed to [`Decoder`](crate::Decoder).
pub trait ValueCodec<V> {
    /// Append the encoding of `value` to `out`.
    fn marshal(&self, value: &V, out: &mut Vec<u8>) -> Result<(), BoxError>;

    /// Rebuild a value from its encoding.
    fn unmarshal(&self, bytes: &[u8]) -> Result<V, BoxError>;
}

impl<V, C: ValueCodec<V> + ?Sized> ValueCodec<V> for &C {
    fn marshal(&self, value: &V, out: &mut Vec<u8>) -> Result<(), BoxError> {
        (**self).marshal(value, out)
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<V, BoxError> {
        (**self).unmarshal(bytes)
    }
}

/// Codec for key-only trees. Values encode as zero bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unit;

impl ValueCodec<()> for Unit {
    fn marshal(&self, _value: &(), _out: &mut Vec<u8>) -> Result<(), BoxError> {
        Ok(())
    }

    fn unmarshal(&self, _bytes: &[u8]) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Codec storing `Vec<u8>` values verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bytes;

impl ValueCodec<Vec<u8>> for Bytes {
    fn marshal(&self, value: &Vec<u8>, out: &mut Vec<u8>) -> Result<(), BoxError> {
        out.extend_from_slice(value);
        Ok(())
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(bytes.to_vec())
    }
}

/// Codec for `String` values; rejects invalid UTF-8 on decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8;

impl ValueCodec<String> for Utf8 {
    fn marshal(&self, value: &String, out: &mut Vec<u8>) -> Result<(), BoxError> {
        out.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<String, BoxError> {
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Codec built from a pair of closures.
///
/// # Example
/// ```
/// use cow_radix::{BoxError, FnCodec, ValueCodec};
///
/// let codec = FnCodec::new(
///     |v: &u64| -> Result<Vec<u8>, BoxError> { Ok(v.to_le_bytes().to_vec()) },
///     |b: &[u8]| -> Result<u64, BoxError> { Ok(u64::from_le_bytes(b.try_into()?)) },
/// );
/// let mut out = Vec::new();
/// codec.marshal(&7u64, &mut out).unwrap();
/// let back: u64 = codec.unmarshal(&out).unwrap();
/// assert_eq!(back, 7);
/// ```
pub struct FnCodec<M, U> {
    marshal: M,
    unmarshal: U,
}

impl<M, U> FnCodec<M, U> {
    /// Wrap a marshal and an unmarshal function.
    pub fn new(marshal: M, unmarshal: U) -> Self {
        Self { marshal, unmarshal }
    }
}

impl<V, M, U> ValueCodec<V> for FnCodec<M, U>
where
    M: Fn(&V) -> Result<Vec<u8>, BoxError>,
    U: Fn(&[u8]) -> Result<V, BoxError>,
{
    fn marshal(&self, value: &V, out: &mut Vec<u8>) -> Result<(), BoxError> {
        out.extend_from_slice(&(self.marshal)(value)?);
        Ok(())
    }

    fn unmarshal(&self, bytes: &[u8]) -> Result<V, BoxError> {
        (self.unmarshal)(bytes)
    }
}
