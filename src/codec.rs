// src/codec.rs

//! Length-prefixed string encoding used by Unreal Engine metadata files
//!
//! Strings are stored as a little-endian `u32` byte count followed by the
//! bytes themselves. The count includes a trailing NUL terminator, so the
//! string `"hello!!!"` is stored as `09 00 00 00 h e l l o ! ! ! 00`.
//! A count of zero encodes the empty string with no payload at all.
//!
//! The same encoding is used by `mod.info`, `modmeta.info` and the `.mod`
//! descriptor the dedicated server loads at boot.

use thiserror::Error;

/// Errors raised while decoding length-prefixed data
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Truncated {what}: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("String at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Cursor over a byte slice that tracks its offset for error reporting
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Consume exactly `len` bytes
    pub fn take(&mut self, len: usize, what: &'static str) -> CodecResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::Truncated {
                what,
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self, what: &'static str) -> CodecResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn read_u32(&mut self, what: &'static str) -> CodecResult<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read one length-prefixed string
    ///
    /// Returns the decoded value and the number of bytes consumed
    /// (`4 + L` where `L` is the stored length).
    pub fn read_string(&mut self) -> CodecResult<(String, usize)> {
        let start = self.offset;
        let len = self.read_u32("string length")? as usize;
        if len == 0 {
            return Ok((String::new(), 4));
        }

        let raw = match self.take(len, "string body") {
            Ok(raw) => raw,
            Err(e) => {
                // Leave the cursor where the string started
                self.offset = start;
                return Err(e);
            }
        };

        // Last byte is the NUL terminator
        let body = &raw[..len - 1];
        let value = std::str::from_utf8(body)
            .map_err(|_| CodecError::InvalidUtf8 { offset: start + 4 })?
            .to_string();

        Ok((value, 4 + len))
    }
}

/// Decode a single string from the front of `data`
pub fn decode_string(data: &[u8]) -> CodecResult<(String, usize)> {
    ByteReader::new(data).read_string()
}

/// Encode a string with its length prefix and NUL terminator
pub fn encode_string(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 5);
    write_string(&mut out, value);
    out
}

/// Append an encoded string to `out`
pub fn write_string(out: &mut Vec<u8>, value: &str) {
    let len = (value.len() + 1) as u32;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_hello() {
        let encoded = encode_string("hello!!!");
        // 4-byte length (9 = 8 chars + NUL), 8 chars, NUL
        assert_eq!(encoded.len(), 13);
        assert_eq!(&encoded[..4], &9u32.to_le_bytes());
        assert_eq!(&encoded[4..12], b"hello!!!");
        assert_eq!(encoded[12], 0);

        let (value, consumed) = decode_string(&encoded).unwrap();
        assert_eq!(value, "hello!!!");
        assert_eq!(consumed, 4 + "hello!!!".len() + 1);
    }

    #[test]
    fn test_decode_zero_length() {
        let (value, consumed) = decode_string(&[0, 0, 0, 0, 0xAA]).unwrap();
        assert_eq!(value, "");
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_encode_empty_string_keeps_terminator() {
        // Writer side always emits the terminator, even for ""
        let encoded = encode_string("");
        assert_eq!(encoded, vec![1, 0, 0, 0, 0]);
        assert_eq!(decode_string(&encoded).unwrap(), (String::new(), 5));
    }

    #[test]
    fn test_truncated_body() {
        let mut encoded = encode_string("ShooterGame");
        encoded.truncate(8);
        let err = decode_string(&encoded).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                what: "string body",
                offset: 4,
                needed: 12,
                available: 4,
            }
        );
    }

    #[test]
    fn test_truncated_length() {
        assert!(matches!(
            decode_string(&[3, 0]),
            Err(CodecError::Truncated { what: "string length", .. })
        ));
    }

    #[test]
    fn test_reader_sequence() {
        let mut data = Vec::new();
        write_string(&mut data, "TheIsland");
        data.extend_from_slice(&7u32.to_le_bytes());
        write_string(&mut data, "Ragnarok");

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_string().unwrap().0, "TheIsland");
        assert_eq!(reader.read_u32("count").unwrap(), 7);
        assert_eq!(reader.read_string().unwrap(), ("Ragnarok".to_string(), 13));
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_non_ascii_round_trip() {
        let title = "Structures Plus (S+) \u{00e9}dition";
        let encoded = encode_string(title);
        let (value, consumed) = decode_string(&encoded).unwrap();
        assert_eq!(value, title);
        assert_eq!(consumed, encoded.len());
    }
}
