use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, to_utf16le, ByteReader};
use crate::protocol::header::SMB2_HEADER_SIZE;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum ShareType {
    Disk = 0x01,
    Pipe = 0x02,
    Print = 0x03,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct ShareFlags: u32 {
        const DFS = 0x0001;
        const DFS_ROOT = 0x0002;
        const RESTRICT_EXCLUSIVE_OPENS = 0x0100;
        const FORCE_SHARED_DELETE = 0x0200;
        const ALLOW_NAMESPACE_CACHING = 0x0400;
        const ACCESS_BASED_DIRECTORY_ENUM = 0x0800;
        const FORCE_LEVEL_II_OPLOCK = 0x1000;
        const ENABLE_HASH_V1 = 0x2000;
        const ENABLE_HASH_V2 = 0x4000;
        const ENCRYPT_DATA = 0x8000;
    }
}

/// MS-SMB2 2.2.9. Path is a full UNC name, `\\server\share`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBTreeConnectRequest {
    pub path: String,
}

impl SMBTreeConnectRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let path = to_utf16le(&self.path);
        let mut out = Vec::with_capacity(8 + path.len());
        put_u16(&mut out, 9); // StructureSize
        put_u16(&mut out, 0); // reserved
        put_u16(&mut out, (SMB2_HEADER_SIZE + 8) as u16);
        put_u16(&mut out, path.len() as u16);
        out.extend_from_slice(&path);
        out
    }
}

/// MS-SMB2 2.2.10.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBTreeConnectResponse {
    pub share_type: ShareType,
    pub share_flags: ShareFlags,
    pub maximal_access: u32,
}

impl SMBTreeConnectResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 16 {
            return Err(SMBError::parse_error(
                "Bad tree connect response structure size",
            ));
        }
        let share_type = ShareType::try_from_primitive(reader.u8()?)
            .map_err(|_| SMBError::parse_error("Unknown share type"))?;
        reader.skip(1)?; // reserved
        let share_flags = ShareFlags::from_bits_truncate(reader.u32()?);
        reader.skip(4)?; // Capabilities
        let maximal_access = reader.u32()?;
        Ok(Self {
            share_type,
            share_flags,
            maximal_access,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encodes_unc_path_utf16() {
        let request = SMBTreeConnectRequest::new("\\\\srv\\docs");
        let bytes = request.encode();
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 72);
        assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 20);
        assert_eq!(&bytes[8..10], &[b'\\', 0]);
    }

    #[test]
    fn response_parses_encrypted_disk_share() {
        let mut body = vec![0u8; 16];
        body[0..2].copy_from_slice(&16u16.to_le_bytes());
        body[2] = ShareType::Disk as u8;
        body[4..8].copy_from_slice(&ShareFlags::ENCRYPT_DATA.bits().to_le_bytes());
        body[12..16].copy_from_slice(&0x001F01FFu32.to_le_bytes());
        let parsed = SMBTreeConnectResponse::parse(&body).unwrap();
        assert_eq!(parsed.share_type, ShareType::Disk);
        assert!(parsed.share_flags.contains(ShareFlags::ENCRYPT_DATA));
        assert_eq!(parsed.maximal_access, 0x001F01FF);
    }
}
