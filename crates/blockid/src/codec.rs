//! Decimal encoding of the authoritative counter.
//!
//! Stores persist one record per scope holding the exclusive upper bound of
//! every id ever reserved, written as a plain base-10 string. Decoding is
//! strict: anything other than ASCII digits is treated as corruption rather
//! than guessed at.

/// Errors produced while decoding a stored counter value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The stored value was the empty string.
    #[error("empty counter value")]
    Empty,
    /// A byte other than `0`-`9` was found.
    #[error("invalid byte {byte:#04x} at index {index}")]
    InvalidDigit {
        /// Offset of the offending byte.
        index: usize,
        /// The offending byte.
        byte: u8,
    },
    /// The value does not fit in a `u64`.
    #[error("counter value exceeds u64::MAX")]
    Overflow,
}

/// Encodes a counter value in its canonical decimal form.
///
/// # Example
/// ```
/// assert_eq!(blockid::encode(300), "300");
/// ```
pub fn encode(value: u64) -> String {
    value.to_string()
}

/// Decodes a stored counter value.
///
/// Leading zeros are accepted; signs, whitespace and every other non-digit
/// byte are rejected.
///
/// # Errors
///
/// Returns a [`CodecError`] describing the first problem found.
///
/// # Example
/// ```
/// use blockid::{CodecError, decode};
///
/// assert_eq!(decode("0042"), Ok(42));
/// assert_eq!(decode(" 42"), Err(CodecError::InvalidDigit { index: 0, byte: b' ' }));
/// ```
pub fn decode(raw: &str) -> Result<u64, CodecError> {
    if raw.is_empty() {
        return Err(CodecError::Empty);
    }

    raw.bytes().enumerate().try_fold(0u64, |acc, (index, byte)| {
        if !byte.is_ascii_digit() {
            return Err(CodecError::InvalidDigit { index, byte });
        }
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(u64::from(byte - b'0')))
            .ok_or(CodecError::Overflow)
    })
}
