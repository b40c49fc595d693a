use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, ByteReader};
use crate::protocol::body::query_info::QueryInfoType;
use crate::protocol::body::FileInformationClass;
use crate::protocol::header::SMB2_HEADER_SIZE;

/// MS-SMB2 2.2.39.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBSetInfoRequest {
    pub information_class: FileInformationClass,
    pub file_id: [u8; 16],
    pub data: Vec<u8>,
}

impl SMBSetInfoRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.data.len());
        put_u16(&mut out, 33); // StructureSize
        out.push(QueryInfoType::File as u8);
        out.push(self.information_class as u8);
        put_u32(&mut out, self.data.len() as u32);
        put_u16(&mut out, (SMB2_HEADER_SIZE + 32) as u16);
        put_u16(&mut out, 0); // reserved
        put_u32(&mut out, 0); // AdditionalInformation
        out.extend_from_slice(&self.file_id);
        out.extend_from_slice(&self.data);
        out
    }
}

/// MS-SMB2 2.2.40.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBSetInfoResponse;

impl SMBSetInfoResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 2 {
            return Err(SMBError::parse_error("Bad set info response structure size"));
        }
        Ok(Self)
    }
}
