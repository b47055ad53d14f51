use crate::error::{FacetError, FacetResult};
use crate::error_consts;

/// Writes an unsigned varint to the buffer
pub(crate) fn write_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Writes a fixed width big-endian i64
pub(crate) fn write_i64(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Writes a length-prefixed byte slice
pub(crate) fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_uvarint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Writes a length-prefixed utf-8 string
pub(crate) fn write_str(buf: &mut Vec<u8>, value: &str) {
    write_bytes(buf, value.as_bytes());
}

/// Reads an unsigned varint from the buffer
/// Returns the value and the number of bytes consumed, or None if invalid
pub(crate) fn read_uvarint(buf: &[u8], start_offset: usize) -> Option<(u64, usize)> {
    if start_offset >= buf.len() {
        return None;
    }

    let mut value: u64 = 0;
    let mut shift = 0;
    let mut current_offset = start_offset;

    loop {
        if current_offset >= buf.len() {
            return None; // Unexpected end of buffer
        }

        let byte = buf[current_offset];
        current_offset += 1;

        value |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }

        shift += 7;
        if shift > 63 {
            // Protect against malicious inputs
            return None;
        }
    }

    Some((value, current_offset - start_offset))
}

/// Cursor over an encoded buffer. Every read is bounds checked and reports
/// truncation as a serialization error.
#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> FacetResult<u8> {
        let byte = *self.buf.get(self.offset).ok_or_else(truncated)?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_uvarint(&mut self) -> FacetResult<u64> {
        let (value, read) = read_uvarint(self.buf, self.offset).ok_or_else(truncated)?;
        self.offset += read;
        Ok(value)
    }

    pub fn read_i64(&mut self) -> FacetResult<i64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    pub fn read_bytes(&mut self) -> FacetResult<&'a [u8]> {
        let len = self.read_uvarint()?;
        let len = usize::try_from(len).map_err(|_| truncated())?;
        self.take(len)
    }

    pub fn read_str(&mut self) -> FacetResult<&'a str> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|e| FacetError::Serialization(e.to_string()))
    }

    /// Fails unless the whole buffer has been consumed.
    pub fn finish(&self) -> FacetResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FacetError::Serialization(format!(
                "{} ({} bytes)",
                error_consts::TRAILING_BYTES,
                self.remaining()
            )))
        }
    }

    fn take(&mut self, len: usize) -> FacetResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(truncated());
        }
        let slice = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }
}

fn truncated() -> FacetError {
    FacetError::Serialization(error_consts::TRUNCATED_INPUT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_consumes_mixed_fields() {
        let mut buf = Vec::new();
        write_uvarint(&mut buf, 300);
        write_i64(&mut buf, 1_341_187_200_000);
        write_str(&mut buf, "terms");

        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_uvarint().unwrap(), 300);
        assert_eq!(reader.read_i64().unwrap(), 1_341_187_200_000);
        assert_eq!(reader.read_str().unwrap(), "terms");
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_reader_reports_truncation() {
        let mut buf = Vec::new();
        write_bytes(&mut buf, &[1, 2, 3, 4]);
        buf.truncate(3);

        let mut reader = ByteReader::new(&buf);
        let err = reader.read_bytes().unwrap_err();
        assert_eq!(
            err,
            FacetError::Serialization(error_consts::TRUNCATED_INPUT.to_string())
        );
    }

    #[test]
    fn test_reader_rejects_trailing_bytes() {
        let buf = vec![0u8, 1];
        let mut reader = ByteReader::new(&buf);
        reader.read_u8().unwrap();
        assert!(matches!(reader.finish(), Err(FacetError::Serialization(_))));
    }
}
