use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, ByteReader};
use crate::protocol::body::FileInformationClass;
use crate::protocol::header::SMB2_HEADER_SIZE;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum QueryInfoType {
    File = 0x01,
    FileSystem = 0x02,
    Security = 0x03,
    Quota = 0x04,
}

/// MS-SMB2 2.2.37. Only file-class queries are issued, so the input
/// buffer is always empty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBQueryInfoRequest {
    pub information_class: FileInformationClass,
    pub output_buffer_length: u32,
    pub file_id: [u8; 16],
}

impl SMBQueryInfoRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(41);
        put_u16(&mut out, 41); // StructureSize
        out.push(QueryInfoType::File as u8);
        out.push(self.information_class as u8);
        put_u32(&mut out, self.output_buffer_length);
        put_u16(&mut out, 0); // InputBufferOffset
        put_u16(&mut out, 0); // reserved
        put_u32(&mut out, 0); // InputBufferLength
        put_u32(&mut out, 0); // AdditionalInformation
        put_u32(&mut out, 0); // Flags
        out.extend_from_slice(&self.file_id);
        out.push(0); // buffer placeholder
        out
    }
}

/// MS-SMB2 2.2.38.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBQueryInfoResponse {
    pub data: Vec<u8>,
}

impl SMBQueryInfoResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 9 {
            return Err(SMBError::parse_error(
                "Bad query info response structure size",
            ));
        }
        let buffer_offset = reader.u16()? as usize;
        let buffer_length = reader.u32()? as usize;
        let start = buffer_offset
            .checked_sub(SMB2_HEADER_SIZE)
            .ok_or_else(|| SMBError::parse_error("Buffer offset inside the header"))?;
        if start + buffer_length > body.len() {
            return Err(SMBError::parse_error("Info data extends past the message"));
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
    fn request_layout() {
        let bytes = SMBQueryInfoRequest {
            information_class: FileInformationClass::BasicInformation,
            output_buffer_length: 1024,
            file_id: [2u8; 16],
        }
        .encode();
        assert_eq!(bytes.len(), 41);
        assert_eq!(bytes[2], QueryInfoType::File as u8);
        assert_eq!(bytes[3], FileInformationClass::BasicInformation as u8);
        assert_eq!(&bytes[24..40], &[2u8; 16]);
    }

    #[test]
    fn response_extracts_info_bytes() {
        let mut body = vec![0u8; 8];
        body[0..2].copy_from_slice(&9u16.to_le_bytes());
        body[2..4].copy_from_slice(&((SMB2_HEADER_SIZE + 8) as u16).to_le_bytes());
        body[4..8].copy_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(&[1, 2, 3]);
        assert_eq!(SMBQueryInfoResponse::parse(&body).unwrap().data, vec![1, 2, 3]);
    }
}
