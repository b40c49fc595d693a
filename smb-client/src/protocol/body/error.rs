use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::ByteReader;

/// SMB2 ERROR Response (MS-SMB2 2.2.2). The NT status lives in the
/// header; the body just confirms the frame shape.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBErrorResponse;

impl SMBErrorResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 9 {
            return Err(SMBError::parse_error("Bad error response structure size"));
        }
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_requires_structure_size_9() {
        assert!(SMBErrorResponse::parse(&[9, 0, 0, 0, 0, 0, 0, 0, 0]).is_ok());
        assert!(SMBErrorResponse::parse(&[8, 0, 0, 0]).is_err());
    }
}
