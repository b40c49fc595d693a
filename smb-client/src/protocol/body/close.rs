use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, ByteReader};

pub const CLOSE_FLAG_POSTQUERY_ATTRIB: u16 = 0x0001;

/// MS-SMB2 2.2.15.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBCloseRequest {
    pub flags: u16,
    pub file_id: [u8; 16],
}

impl SMBCloseRequest {
    pub fn new(file_id: [u8; 16]) -> Self {
        Self { flags: 0, file_id }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        put_u16(&mut out, 24); // StructureSize
        put_u16(&mut out, self.flags);
        put_u32(&mut out, 0); // reserved
        out.extend_from_slice(&self.file_id);
        out
    }
}

/// MS-SMB2 2.2.16. Attribute fields are only valid when the request
/// set CLOSE_FLAG_POSTQUERY_ATTRIB; this client never does.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBCloseResponse;

impl SMBCloseResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 60 {
            return Err(SMBError::parse_error("Bad close response structure size"));
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_24_bytes_with_file_id_last() {
        let bytes = SMBCloseRequest::new([9u8; 16]).encode();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[8..24], &[9u8; 16]);
    }

    #[test]
    fn response_requires_structure_size_60() {
        let mut body = vec![0u8; 60];
        body[0..2].copy_from_slice(&60u16.to_le_bytes());
        assert!(SMBCloseResponse::parse(&body).is_ok());
        body[0] = 59;
        assert!(SMBCloseResponse::parse(&body).is_err());
    }
}
