use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, ByteReader};
use crate::protocol::body::SessionSetupSecurityMode;
use crate::protocol::header::SMB2_HEADER_SIZE;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct SessionFlags: u16 {
        const IS_GUEST = 0x0001;
        const IS_NULL = 0x0002;
        const ENCRYPT_DATA = 0x0004;
    }
}

/// MS-SMB2 2.2.5. The security buffer carries the NTLM token.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBSessionSetupRequest {
    pub security_mode: SessionSetupSecurityMode,
    pub previous_session_id: u64,
    pub security_buffer: Vec<u8>,
}

impl SMBSessionSetupRequest {
    pub fn new(security_mode: SessionSetupSecurityMode, security_buffer: Vec<u8>) -> Self {
        Self {
            security_mode,
            previous_session_id: 0,
            security_buffer,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24 + self.security_buffer.len());
        put_u16(&mut out, 25); // StructureSize
        out.push(0); // Flags
        out.push(self.security_mode.bits());
        put_u32(&mut out, 0); // Capabilities
        put_u32(&mut out, 0); // Channel
        put_u16(&mut out, (SMB2_HEADER_SIZE + 24) as u16);
        put_u16(&mut out, self.security_buffer.len() as u16);
        put_u64(&mut out, self.previous_session_id);
        out.extend_from_slice(&self.security_buffer);
        out
    }
}

/// MS-SMB2 2.2.6.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBSessionSetupResponse {
    pub session_flags: SessionFlags,
    pub security_buffer: Vec<u8>,
}

impl SMBSessionSetupResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 9 {
            return Err(SMBError::parse_error(
                "Bad session setup response structure size",
            ));
        }
        let session_flags = SessionFlags::from_bits_truncate(reader.u16()?);
        let buffer_offset = reader.u16()? as usize;
        let buffer_length = reader.u16()? as usize;
        let security_buffer = if buffer_length > 0 {
            let start = buffer_offset
                .checked_sub(SMB2_HEADER_SIZE)
                .ok_or_else(|| SMBError::parse_error("Buffer offset inside the header"))?;
            if start + buffer_length > body.len() {
                return Err(SMBError::parse_error("Buffer extends past the message"));
            }
            body[start..start + buffer_length].to_vec()
        } else {
            Vec::new()
        };
        Ok(Self {
            session_flags,
            security_buffer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_places_buffer_after_fixed_part() {
        let request = SMBSessionSetupRequest::new(
            SessionSetupSecurityMode::SIGNING_ENABLED,
            vec![1, 2, 3],
        );
        let bytes = request.encode();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 25);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 88);
        assert_eq!(u16::from_le_bytes([bytes[14], bytes[15]]), 3);
        assert_eq!(&bytes[24..], &[1, 2, 3]);
    }

    #[test]
    fn response_parses_guest_flag_and_buffer() {
        let mut body = vec![0u8; 8];
        body[0..2].copy_from_slice(&9u16.to_le_bytes());
        body[2..4].copy_from_slice(&SessionFlags::IS_GUEST.bits().to_le_bytes());
        body[4..6].copy_from_slice(&((SMB2_HEADER_SIZE + 8) as u16).to_le_bytes());
        body[6..8].copy_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&[0xAA, 0xBB]);
        let parsed = SMBSessionSetupResponse::parse(&body).unwrap();
        assert!(parsed.session_flags.contains(SessionFlags::IS_GUEST));
        assert_eq!(parsed.security_buffer, vec![0xAA, 0xBB]);
    }
}
