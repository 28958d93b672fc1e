//! Minimal byte-order aware reader over a snapshot byte stream.
//!
//! The byte order is fixed per record by the 'L'/'B' marker and applied to
//! every multi-byte field that follows it.

use crate::utils::config::{BYTE_ORDER_BIG, BYTE_ORDER_LITTLE};
use crate::utils::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};

/// Byte order of the integers in one snapshot record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Map a marker byte to a byte order
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            BYTE_ORDER_LITTLE => Some(ByteOrder::LittleEndian),
            BYTE_ORDER_BIG => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Marker byte written for this order
    pub fn marker(self) -> u8 {
        match self {
            ByteOrder::LittleEndian => BYTE_ORDER_LITTLE,
            ByteOrder::BigEndian => BYTE_ORDER_BIG,
        }
    }
}

/// Reader that tracks its absolute stream position
pub struct BinaryCursor<R> {
    inner: R,
    position: u64,
    len: Option<u64>,
    order: ByteOrder,
}

impl<R: Read> BinaryCursor<R> {
    /// Wrap `inner`, which is already positioned at `start`
    ///
    /// `len` is the total stream length when known; it lets string reads
    /// reject impossible lengths before allocating.
    pub fn new(inner: R, start: u64, len: Option<u64>) -> Self {
        Self {
            inner,
            position: start,
            len,
            order: ByteOrder::default(),
        }
    }

    /// Absolute offset of the next byte to be read
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Bytes left in the stream, if the length is known
    pub fn remaining(&self) -> Option<u64> {
        self.len.map(|len| len.saturating_sub(self.position))
    }

    /// Read one byte, returning `None` on a clean end of stream
    pub fn try_read_u8(&mut self) -> Result<Option<u8>, DecodeError> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.position += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e)),
            }
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let mut buf = [0u8; 1];
        self.fill(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(match self.order {
            ByteOrder::LittleEndian => i32::from_le_bytes(buf),
            ByteOrder::BigEndian => i32::from_be_bytes(buf),
        })
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf)?;
        Ok(match self.order {
            ByteOrder::LittleEndian => u64::from_le_bytes(buf),
            ByteOrder::BigEndian => u64::from_be_bytes(buf),
        })
    }

    /// Read a u64 length prefix followed by that many bytes
    pub fn read_length_prefixed(&mut self) -> Result<Vec<u8>, DecodeError> {
        let declared = self.read_u64()?;
        let offset = self.position;

        if let Some(available) = self.remaining() {
            if declared > available {
                return Err(DecodeError::TruncatedString {
                    offset,
                    declared,
                    available,
                });
            }
        }

        // Buffer grows with the bytes present, never with the declared length
        let mut buf = Vec::new();
        (&mut self.inner)
            .take(declared)
            .read_to_end(&mut buf)
            .map_err(DecodeError::Io)?;
        self.position += buf.len() as u64;

        if (buf.len() as u64) < declared {
            return Err(DecodeError::TruncatedString {
                offset,
                declared,
                available: buf.len() as u64,
            });
        }
        Ok(buf)
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        let start = self.position;
        let read = self.fill_partial(buf)?;
        if read < buf.len() {
            return Err(DecodeError::UnexpectedEof { offset: start });
        }
        Ok(())
    }

    /// Read until `buf` is full or the stream ends, returning bytes read
    fn fill_partial(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => {
                    filled += n;
                    self.position += n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DecodeError::Io(e)),
            }
        }
        Ok(filled)
    }
}
