use crate::byte_helper::{put_u16, put_u32};

/// MS-SMB2 2.2.15. The response is the shared four-byte empty body.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBFlushRequest {
    pub file_id: [u8; 16],
}

impl SMBFlushRequest {
    pub fn new(file_id: [u8; 16]) -> Self {
        Self { file_id }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        put_u16(&mut out, 24); // StructureSize
        put_u16(&mut out, 0); // reserved1
        put_u32(&mut out, 0); // reserved2
        out.extend_from_slice(&self.file_id);
        out
    }
}
