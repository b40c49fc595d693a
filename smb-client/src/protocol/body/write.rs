use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, ByteReader};
use crate::protocol::header::SMB2_HEADER_SIZE;

/// MS-SMB2 2.2.21.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBWriteRequest {
    pub offset: u64,
    pub file_id: [u8; 16],
    pub data: Vec<u8>,
}

impl SMBWriteRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(48 + self.data.len());
        put_u16(&mut out, 49); // StructureSize
        put_u16(&mut out, (SMB2_HEADER_SIZE + 48) as u16); // DataOffset
        put_u32(&mut out, self.data.len() as u32);
        put_u64(&mut out, self.offset);
        out.extend_from_slice(&self.file_id);
        put_u32(&mut out, 0); // Channel
        put_u32(&mut out, 0); // RemainingBytes
        put_u16(&mut out, 0); // WriteChannelInfoOffset
        put_u16(&mut out, 0); // WriteChannelInfoLength
        put_u32(&mut out, 0); // Flags
        out.extend_from_slice(&self.data);
        out
    }
}

/// MS-SMB2 2.2.22.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBWriteResponse {
    pub count: u32,
}

impl SMBWriteResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 17 {
            return Err(SMBError::parse_error("Bad write response structure size"));
        }
        reader.skip(2)?; // reserved
        let count = reader.u32()?;
        Ok(Self { count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_places_data_at_offset_112() {
        let bytes = SMBWriteRequest {
            offset: 8,
            file_id: [1u8; 16],
            data: b"hello".to_vec(),
        }
        .encode();
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 112);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 5);
        assert_eq!(&bytes[48..], b"hello");
    }

    #[test]
    fn response_reports_count() {
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&17u16.to_le_bytes());
        body[4..8].copy_from_slice(&5u32.to_le_bytes());
        assert_eq!(SMBWriteResponse::parse(&body).unwrap().count, 5);
    }
}
