use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, ByteReader};

pub const TRANSFORM_PROTOCOL_ID: [u8; 4] = [0xFD, b'S', b'M', b'B'];
pub const TRANSFORM_HEADER_SIZE: usize = 52;

/// MS-SMB2 2.2.41. Flags is always 0x0001 (encrypted).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBTransformHeader {
    pub signature: [u8; 16],
    pub nonce: [u8; 16],
    pub original_message_size: u32,
    pub session_id: u64,
}

impl SMBTransformHeader {
    pub fn new(nonce: [u8; 16], original_message_size: u32, session_id: u64) -> Self {
        Self {
            signature: [0; 16],
            nonce,
            original_message_size,
            session_id,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TRANSFORM_HEADER_SIZE);
        out.extend_from_slice(&TRANSFORM_PROTOCOL_ID);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.nonce);
        put_u32(&mut out, self.original_message_size);
        put_u16(&mut out, 0); // reserved
        put_u16(&mut out, 0x0001); // Flags: encrypted
        put_u64(&mut out, self.session_id);
        out
    }

    /// Everything after the signature is authenticated but not
    /// encrypted.
    pub fn associated_data(&self) -> Vec<u8> {
        self.encode()[20..].to_vec()
    }

    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(input);
        if reader.array::<4>()? != TRANSFORM_PROTOCOL_ID {
            return Err(SMBError::parse_error("Missing transform protocol id"));
        }
        let signature = reader.array::<16>()?;
        let nonce = reader.array::<16>()?;
        let original_message_size = reader.u32()?;
        reader.skip(2)?; // reserved
        if reader.u16()? != 0x0001 {
            return Err(SMBError::parse_error("Unknown transform flags"));
        }
        let session_id = reader.u64()?;
        Ok(Self {
            signature,
            nonce,
            original_message_size,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut header = SMBTransformHeader::new([5u8; 16], 96, 0x1122334455667788);
        header.signature = [9u8; 16];
        let bytes = header.encode();
        assert_eq!(bytes.len(), TRANSFORM_HEADER_SIZE);
        assert_eq!(SMBTransformHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn associated_data_excludes_signature() {
        let header = SMBTransformHeader::new([5u8; 16], 96, 7);
        let aad = header.associated_data();
        assert_eq!(aad.len(), 32);
        assert_eq!(&aad[..16], &[5u8; 16]); // nonce first
    }
}
