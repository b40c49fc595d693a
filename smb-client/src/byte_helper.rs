use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

/// Little-endian cursor over a received byte slice.
///
/// SMB field layouts are little-endian throughout; only the NetBIOS
/// session-service length prefix is big-endian and handled separately.
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn need(&self, count: usize) -> SMBResult<()> {
        if self.remaining() < count {
            return Err(SMBError::parse_error(format!(
                "Truncated message: needed {} more bytes, had {}",
                count,
                self.remaining()
            )));
        }
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> SMBResult<()> {
        self.need(count)?;
        self.pos += count;
        Ok(())
    }

    pub fn bytes(&mut self, count: usize) -> SMBResult<&'a [u8]> {
        self.need(count)?;
        let out = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(out)
    }

    pub fn array<const N: usize>(&mut self) -> SMBResult<[u8; N]> {
        let slice = self.bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn u8(&mut self) -> SMBResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> SMBResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> SMBResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> SMBResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// UTF-16LE encoding used for path and account name fields.
pub(crate) fn to_utf16le(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect()
}

pub(crate) fn from_utf16le(bytes: &[u8]) -> SMBResult<String> {
    if bytes.len() % 2 != 0 {
        return Err(SMBError::parse_error("Odd-length UTF-16 buffer"));
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect::<Vec<u16>>();
    String::from_utf16(&units).map_err(|_| SMBError::parse_error("Invalid UTF-16 string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_walks_fields_in_order() {
        let data = [0x01, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.u8().unwrap(), 1);
        assert_eq!(reader.u16().unwrap(), 2);
        assert_eq!(reader.u32().unwrap(), 3);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.u8().is_err());
    }

    #[test]
    fn utf16_round_trip() {
        let encoded = to_utf16le("\\\\server\\share");
        assert_eq!(from_utf16le(&encoded).unwrap(), "\\\\server\\share");
    }
}
