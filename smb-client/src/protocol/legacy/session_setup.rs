use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, to_utf16le, ByteReader};
use crate::protocol::header::SMB1_HEADER_SIZE;
use crate::protocol::legacy::{check_word_count, push_andx, SMB1Body};

const SETUP_GUEST: u16 = 0x0001;

const MAX_BUFFER_SIZE: u16 = 0xFFFF;
const MAX_MPX_COUNT: u16 = 1;

fn unicode_pad(out: &mut Vec<u8>, prefix: usize) {
    // Unicode strings must start 2-aligned relative to the header.
    if (SMB1_HEADER_SIZE + prefix) % 2 != 0 {
        out.push(0);
    }
}

fn push_native_strings(data: &mut Vec<u8>) {
    // empty NativeOS and NativeLanMan
    data.extend_from_slice(&[0, 0, 0, 0]);
}

/// MS-SMB 2.2.4.6.1, the extended-security variant carrying a GSS blob.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1SessionSetupExtendedRequest {
    pub session_key: u32,
    pub capabilities: u32,
    pub security_blob: Vec<u8>,
}

impl SMB1SessionSetupExtendedRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(24);
        push_andx(&mut words);
        put_u16(&mut words, MAX_BUFFER_SIZE);
        put_u16(&mut words, MAX_MPX_COUNT);
        put_u16(&mut words, 0); // VcNumber
        put_u32(&mut words, self.session_key);
        put_u16(&mut words, self.security_blob.len() as u16);
        put_u32(&mut words, 0); // reserved
        put_u32(&mut words, self.capabilities);

        let mut data = self.security_blob.clone();
        let written = 1 + words.len() + 2 + data.len();
        unicode_pad(&mut data, written);
        push_native_strings(&mut data);
        SMB1Body::new(words, data).encode()
    }
}

/// MS-SMB 2.2.4.6.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1SessionSetupExtendedResponse {
    pub guest: bool,
    pub security_blob: Vec<u8>,
}

impl SMB1SessionSetupExtendedResponse {
    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(input)?;
        check_word_count(&body, 4, "session setup")?;
        let mut words = ByteReader::new(&body.words);
        words.skip(4)?; // AndX
        let action = words.u16()?;
        let blob_length = words.u16()? as usize;
        if blob_length > body.data.len() {
            return Err(SMBError::parse_error("Security blob extends past the data block"));
        }
        Ok(Self {
            guest: action & SETUP_GUEST != 0,
            security_blob: body.data[..blob_length].to_vec(),
        })
    }
}

/// MS-CIFS 2.2.4.53.1, the pre-extended variant carrying LM and NT
/// challenge responses directly.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1SessionSetupRequest {
    pub session_key: u32,
    pub capabilities: u32,
    pub case_insensitive_password: Vec<u8>,
    pub case_sensitive_password: Vec<u8>,
    pub account_name: String,
    pub domain_name: String,
}

impl SMB1SessionSetupRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(26);
        push_andx(&mut words);
        put_u16(&mut words, MAX_BUFFER_SIZE);
        put_u16(&mut words, MAX_MPX_COUNT);
        put_u16(&mut words, 0); // VcNumber
        put_u32(&mut words, self.session_key);
        put_u16(&mut words, self.case_insensitive_password.len() as u16);
        put_u16(&mut words, self.case_sensitive_password.len() as u16);
        put_u32(&mut words, 0); // reserved
        put_u32(&mut words, self.capabilities);

        let mut data = Vec::new();
        data.extend_from_slice(&self.case_insensitive_password);
        data.extend_from_slice(&self.case_sensitive_password);
        let written = 1 + words.len() + 2 + data.len();
        unicode_pad(&mut data, written);
        data.extend_from_slice(&to_utf16le(&self.account_name));
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(&to_utf16le(&self.domain_name));
        data.extend_from_slice(&[0, 0]);
        push_native_strings(&mut data);
        SMB1Body::new(words, data).encode()
    }
}

/// MS-CIFS 2.2.4.53.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1SessionSetupResponse {
    pub guest: bool,
}

impl SMB1SessionSetupResponse {
    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(input)?;
        check_word_count(&body, 3, "session setup")?;
        let mut words = ByteReader::new(&body.words);
        words.skip(4)?; // AndX
        let action = words.u16()?;
        Ok(Self {
            guest: action & SETUP_GUEST != 0,
        })
    }
}
