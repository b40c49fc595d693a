use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, ByteReader};
use crate::protocol::header::SMB2_HEADER_SIZE;

const IOCTL_IS_FSCTL: u32 = 0x0000_0001;

/// MS-SMB2 2.2.31. Only FSCTL pass-through is issued.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBIoctlRequest {
    pub ctl_code: u32,
    pub file_id: [u8; 16],
    pub input: Vec<u8>,
    pub max_output_response: u32,
}

impl SMBIoctlRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(56 + self.input.len().max(1));
        put_u16(&mut out, 57); // StructureSize
        put_u16(&mut out, 0); // reserved
        put_u32(&mut out, self.ctl_code);
        out.extend_from_slice(&self.file_id);
        put_u32(&mut out, (SMB2_HEADER_SIZE + 56) as u32); // InputOffset
        put_u32(&mut out, self.input.len() as u32);
        put_u32(&mut out, 0); // MaxInputResponse
        put_u32(&mut out, 0); // OutputOffset
        put_u32(&mut out, 0); // OutputCount
        put_u32(&mut out, self.max_output_response);
        put_u32(&mut out, IOCTL_IS_FSCTL);
        put_u32(&mut out, 0); // reserved2
        if self.input.is_empty() {
            out.push(0);
        } else {
            out.extend_from_slice(&self.input);
        }
        out
    }
}

/// MS-SMB2 2.2.32.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBIoctlResponse {
    pub output: Vec<u8>,
}

impl SMBIoctlResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 49 {
            return Err(SMBError::parse_error("Bad ioctl response structure size"));
        }
        reader.skip(2)?; // reserved
        reader.skip(4)?; // CtlCode
        reader.skip(16)?; // FileId
        reader.skip(8)?; // InputOffset + InputCount
        let output_offset = reader.u32()? as usize;
        let output_count = reader.u32()? as usize;
        let output = if output_count > 0 {
            let start = output_offset
                .checked_sub(SMB2_HEADER_SIZE)
                .ok_or_else(|| SMBError::parse_error("Output offset inside the header"))?;
            if start + output_count > body.len() {
                return Err(SMBError::parse_error("Output extends past the message"));
            }
            body[start..start + output_count].to_vec()
        } else {
            Vec::new()
        };
        Ok(Self { output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_marks_fsctl_passthrough() {
        let bytes = SMBIoctlRequest {
            ctl_code: 0x0011_C017, // FSCTL_PIPE_TRANSCEIVE
            file_id: [1u8; 16],
            input: vec![0xAB],
            max_output_response: 4096,
        }
        .encode();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 57);
        let flags = u32::from_le_bytes([bytes[48], bytes[49], bytes[50], bytes[51]]);
        assert_eq!(flags, IOCTL_IS_FSCTL);
        assert_eq!(bytes[56], 0xAB);
    }

    #[test]
    fn response_extracts_output() {
        let mut body = vec![0u8; 48];
        body[0..2].copy_from_slice(&49u16.to_le_bytes());
        body[32..36].copy_from_slice(&((SMB2_HEADER_SIZE + 48) as u32).to_le_bytes());
        body[36..40].copy_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&[0xCC, 0xDD]);
        assert_eq!(SMBIoctlResponse::parse(&body).unwrap().output, vec![0xCC, 0xDD]);
    }
}
