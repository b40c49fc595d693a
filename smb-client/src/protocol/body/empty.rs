use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, ByteReader};

/// Zero-payload body shared by echo, logoff and tree disconnect
/// (MS-SMB2 2.2.7/2.2.8, 2.2.11/2.2.12, 2.2.28/2.2.29).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBEmpty;

impl SMBEmpty {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4);
        put_u16(&mut out, 4); // StructureSize
        put_u16(&mut out, 0); // reserved
        out
    }

    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 4 {
            return Err(SMBError::parse_error("Bad empty body structure size"));
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_round_trip() {
        let bytes = SMBEmpty.encode();
        assert_eq!(bytes, vec![4, 0, 0, 0]);
        assert!(SMBEmpty::parse(&bytes).is_ok());
    }
}
