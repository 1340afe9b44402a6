//! Growable byte buffer and the field reader used to decode responses.
//!
//! Every request payload is assembled in a [`Buffer`] and every response body is walked
//! with a [`FieldReader`]. Both speak the RDS field grammar:
//!
//! - a **number** is ASCII decimal digits terminated by `:` (`42:`);
//! - a **field** is a number giving the byte length followed by exactly that many raw
//!   bytes (`5:hello`). Requests prefix each field with a `STR:` tag (`STR:5:hello`),
//!   which the reader accepts and skips.
//!
//! Raw field content is never interpreted, so it may contain `:`, NUL or any other byte.
use thiserror::Error;

const BLOCK_SIZE: usize = 1024;
const BLOCK_SLACK: usize = 512;

/// Tag written in front of every request field.
pub(crate) const FIELD_TAG: &[u8] = b"STR:";

/// Reasons a response body can fail to decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("number is missing its ':' terminator")]
    UnterminatedNumber,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("negative field length {0}")]
    NegativeLength(i64),

    #[error("field declares {declared} bytes but only {remaining} remain")]
    Truncated { declared: usize, remaining: usize },

    #[error("expected {expected} fields, got {found}")]
    FieldCount { expected: String, found: i64 },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{0} unexpected bytes after the last field")]
    TrailingBytes(usize),
}

/// Capacity a buffer grows to when it must hold `needed` bytes.
///
/// Rounds up past the next kilobyte boundary, keeping at least half a kilobyte spare.
pub(crate) fn grown_capacity(needed: usize) -> usize {
    ((needed + BLOCK_SLACK) / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Append-only byte buffer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn reader(&self) -> FieldReader<'_> {
        FieldReader::new(&self.data)
    }

    fn reserve_for(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed > self.data.capacity() {
            let target = grown_capacity(needed);
            self.data.reserve_exact(target - self.data.len());
        }
    }

    /// Makes sure at least `spare` bytes can be appended without reallocating.
    pub fn reserve_above(&mut self, spare: usize) {
        if self.data.capacity() - self.data.len() < spare {
            self.data.reserve_exact(spare);
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub fn append_str(&mut self, s: &str) {
        self.append(s.as_bytes());
    }

    /// Writes the leading `<count>:` of a request.
    pub fn append_count(&mut self, count: usize) {
        self.append_str(&count.to_string());
        self.append(b":");
    }

    /// Writes `STR:<len>:<bytes>`.
    pub fn append_field(&mut self, bytes: &[u8]) {
        self.append(FIELD_TAG);
        self.append_count(bytes.len());
        self.append(bytes);
    }

    /// Lets `read` fill up to `chunk` bytes at the end of the buffer, keeping what it
    /// reports as read.
    pub fn fill<E>(
        &mut self,
        chunk: usize,
        read: impl FnOnce(&mut [u8]) -> Result<usize, E>,
    ) -> Result<usize, E> {
        self.reserve_above(chunk);
        let start = self.data.len();
        self.data.resize(start + chunk, 0);

        let res = read(&mut self.data[start..]);
        let n = match &res {
            Ok(n) => (*n).min(chunk),
            Err(_) => 0,
        };
        self.data.truncate(start + n);
        res
    }
}

/// Read cursor over an encoded field stream.
///
/// A failed read leaves the cursor where it was.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        self.data
    }

    pub fn number(&mut self) -> Result<i64, DecodeError> {
        let end = self
            .data
            .iter()
            .position(|b| *b == b':')
            .ok_or(DecodeError::UnterminatedNumber)?;
        let value = parse_number(&self.data[..end])?;
        self.data = &self.data[end + 1..];
        Ok(value)
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let start = *self;
        let res = self.bytes_inner();
        if res.is_err() {
            *self = start;
        }
        res
    }

    fn bytes_inner(&mut self) -> Result<&'a [u8], DecodeError> {
        if let Some(tagged) = self.data.strip_prefix(FIELD_TAG) {
            self.data = tagged;
        }

        let declared = self.number()?;
        let declared =
            usize::try_from(declared).map_err(|_| DecodeError::NegativeLength(declared))?;
        if declared > self.data.len() {
            return Err(DecodeError::Truncated {
                declared,
                remaining: self.data.len(),
            });
        }

        let (field, rest) = self.data.split_at(declared);
        self.data = rest;
        Ok(field)
    }

    pub fn string(&mut self) -> Result<String, DecodeError> {
        self.bytes()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Reads a text field holding a decimal integer.
    pub fn integer(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        let start = *self;
        let text = self.bytes()?;
        parse_number(text).map_err(|e| {
            *self = start;
            DecodeError::InvalidField {
                field,
                reason: e.to_string(),
            }
        })
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes(self.data.len()))
        }
    }
}

fn parse_number(digits: &[u8]) -> Result<i64, DecodeError> {
    let text = String::from_utf8_lossy(digits);
    text.trim()
        .parse::<i64>()
        .map_err(|_| DecodeError::InvalidNumber(text.into_owned()))
}
