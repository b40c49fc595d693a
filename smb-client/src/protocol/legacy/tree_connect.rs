use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, to_utf16le, ByteReader};
use crate::protocol::header::SMB1_HEADER_SIZE;
use crate::protocol::legacy::{push_andx, SMB1Body};

/// Matches any share type.
const SERVICE_ANY: &[u8] = b"?????\0";

/// MS-CIFS 2.2.4.55.1. Share-level passwords are not supported, so the
/// password field is a single null byte.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1TreeConnectRequest {
    pub path: String,
}

impl SMB1TreeConnectRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(8);
        push_andx(&mut words);
        put_u16(&mut words, 0); // Flags
        put_u16(&mut words, 1); // PasswordLength

        let mut data = vec![0u8]; // empty password
        if (SMB1_HEADER_SIZE + 1 + words.len() + 2 + data.len()) % 2 != 0 {
            data.push(0);
        }
        data.extend_from_slice(&to_utf16le(&self.path));
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(SERVICE_ANY);
        SMB1Body::new(words, data).encode()
    }
}

/// MS-CIFS 2.2.4.55.2. The granted TID arrives in the header; the body
/// names the connected service type.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1TreeConnectResponse {
    pub service: String,
}

impl SMB1TreeConnectResponse {
    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(input)?;
        if body.words.len() < 6 {
            return Err(SMBError::parse_error("Bad word count in tree connect response"));
        }
        let mut data = ByteReader::new(&body.data);
        let mut service = Vec::new();
        loop {
            match data.u8() {
                Ok(0) | Err(_) => break,
                Ok(byte) => service.push(byte),
            }
        }
        let service = String::from_utf8(service)
            .map_err(|_| SMBError::parse_error("Service name is not ASCII"))?;
        Ok(Self { service })
    }
}
