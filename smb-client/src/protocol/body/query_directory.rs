use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, to_utf16le, ByteReader};
use crate::protocol::body::FileInformationClass;
use crate::protocol::header::SMB2_HEADER_SIZE;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct QueryDirectoryFlags: u8 {
        const RESTART_SCANS = 0x01;
        const RETURN_SINGLE_ENTRY = 0x02;
        const INDEX_SPECIFIED = 0x04;
        const REOPEN = 0x10;
    }
}

/// MS-SMB2 2.2.33.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBQueryDirectoryRequest {
    pub information_class: FileInformationClass,
    pub flags: QueryDirectoryFlags,
    pub file_id: [u8; 16],
    pub pattern: String,
    pub output_buffer_length: u32,
}

impl SMBQueryDirectoryRequest {
    pub fn encode(&self) -> Vec<u8> {
        let pattern = to_utf16le(&self.pattern);
        let mut out = Vec::with_capacity(32 + pattern.len().max(1));
        put_u16(&mut out, 33); // StructureSize
        out.push(self.information_class as u8);
        out.push(self.flags.bits());
        put_u32(&mut out, 0); // FileIndex
        out.extend_from_slice(&self.file_id);
        put_u16(&mut out, (SMB2_HEADER_SIZE + 32) as u16);
        put_u16(&mut out, pattern.len() as u16);
        put_u32(&mut out, self.output_buffer_length);
        if pattern.is_empty() {
            out.push(0);
        } else {
            out.extend_from_slice(&pattern);
        }
        out
    }
}

/// MS-SMB2 2.2.34.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBQueryDirectoryResponse {
    pub data: Vec<u8>,
}

impl SMBQueryDirectoryResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 9 {
            return Err(SMBError::parse_error(
                "Bad query directory response structure size",
            ));
        }
        let buffer_offset = reader.u16()? as usize;
        let buffer_length = reader.u32()? as usize;
        let start = buffer_offset
            .checked_sub(SMB2_HEADER_SIZE)
            .ok_or_else(|| SMBError::parse_error("Buffer offset inside the header"))?;
        if start + buffer_length > body.len() {
            return Err(SMBError::parse_error("Listing extends past the message"));
        }
        Ok(Self {
            data: body[start..start + buffer_length].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encodes_wildcard_pattern() {
        let bytes = SMBQueryDirectoryRequest {
            information_class: FileInformationClass::DirectoryInformation,
            flags: QueryDirectoryFlags::RESTART_SCANS,
            file_id: [4u8; 16],
            pattern: "*".to_string(),
            output_buffer_length: 65536,
        }
        .encode();
        assert_eq!(bytes[2], FileInformationClass::DirectoryInformation as u8);
        assert_eq!(u16::from_le_bytes([bytes[24], bytes[25]]), 96);
        assert_eq!(u16::from_le_bytes([bytes[26], bytes[27]]), 2);
        assert_eq!(&bytes[32..34], &[b'*', 0]);
    }

    #[test]
    fn response_extracts_listing_bytes() {
        let mut body = vec![0u8; 8];
        body[0..2].copy_from_slice(&9u16.to_le_bytes());
        body[2..4].copy_from_slice(&((SMB2_HEADER_SIZE + 8) as u16).to_le_bytes());
        body[4..8].copy_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&[0x10, 0x20]);
        assert_eq!(
            SMBQueryDirectoryResponse::parse(&body).unwrap().data,
            vec![0x10, 0x20]
        );
    }
}
