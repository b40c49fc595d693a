use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, ByteReader};
use crate::protocol::header::SMB2_HEADER_SIZE;

/// MS-SMB2 2.2.19.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBReadRequest {
    pub length: u32,
    pub offset: u64,
    pub file_id: [u8; 16],
}

impl SMBReadRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(49);
        put_u16(&mut out, 49); // StructureSize
        out.push(0); // Padding
        out.push(0); // Flags
        put_u32(&mut out, self.length);
        put_u64(&mut out, self.offset);
        out.extend_from_slice(&self.file_id);
        put_u32(&mut out, 0); // MinimumCount
        put_u32(&mut out, 0); // Channel
        put_u32(&mut out, 0); // RemainingBytes
        put_u16(&mut out, 0); // ReadChannelInfoOffset
        put_u16(&mut out, 0); // ReadChannelInfoLength
        out.push(0); // buffer placeholder
        out
    }
}

/// MS-SMB2 2.2.20.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBReadResponse {
    pub data: Vec<u8>,
}

impl SMBReadResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 17 {
            return Err(SMBError::parse_error("Bad read response structure size"));
        }
        let data_offset = reader.u8()? as usize;
        reader.skip(1)?; // reserved
        let data_length = reader.u32()? as usize;
        let start = data_offset
            .checked_sub(SMB2_HEADER_SIZE)
            .ok_or_else(|| SMBError::parse_error("Data offset inside the header"))?;
        if start + data_length > body.len() {
            return Err(SMBError::parse_error("Read data extends past the message"));
        }
        Ok(Self {
            data: body[start..start + data_length].to_vec(),
        })
    }
}
