use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::ByteReader;
use crate::protocol::legacy::{check_word_count, SMB1Body};

pub const NT_LM_0_12: &str = "NT LM 0.12";

pub const CAP_UNICODE: u32 = 0x0000_0004;
pub const CAP_NT_SMBS: u32 = 0x0000_0010;
pub const CAP_RPC_REMOTE_APIS: u32 = 0x0000_0020;
pub const CAP_STATUS32: u32 = 0x0000_0040;
pub const CAP_EXTENDED_SECURITY: u32 = 0x8000_0000;

const SECURITY_MODE_USER_LEVEL: u8 = 0x01;
const SECURITY_MODE_ENCRYPT_PASSWORDS: u8 = 0x02;

/// MS-CIFS 2.2.4.52. Only the NT LM 0.12 dialect is ever offered.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1NegotiateRequest;

impl SMB1NegotiateRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(NT_LM_0_12.len() + 2);
        data.push(0x02); // dialect buffer format
        data.extend_from_slice(NT_LM_0_12.as_bytes());
        data.push(0);
        SMB1Body::new(Vec::new(), data).encode()
    }
}

/// MS-CIFS 2.2.4.52 response, extended per MS-SMB 2.2.4.5.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1NegotiateResponse {
    pub dialect_index: u16,
    pub user_level_security: bool,
    pub challenge_response_required: bool,
    pub max_buffer_size: u32,
    pub session_key: u32,
    pub capabilities: u32,
    /// 8-byte server challenge, absent under extended security.
    pub challenge: Option<[u8; 8]>,
    /// GSS blob, present only under extended security.
    pub security_blob: Vec<u8>,
}

impl SMB1NegotiateResponse {
    pub fn extended_security(&self) -> bool {
        self.capabilities & CAP_EXTENDED_SECURITY != 0
    }

    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(input)?;
        check_word_count(&body, 17, "negotiate")?;
        let mut words = ByteReader::new(&body.words);
        let dialect_index = words.u16()?;
        if dialect_index == 0xFFFF {
            return Err(SMBError::connection("Server rejected every offered dialect"));
        }
        let security_mode = words.u8()?;
        words.skip(4)?; // MaxMpxCount + MaxNumberVcs
        let max_buffer_size = words.u32()?;
        words.skip(4)?; // MaxRawSize
        let session_key = words.u32()?;
        let capabilities = words.u32()?;
        words.skip(10)?; // SystemTime + ServerTimeZone
        let challenge_length = words.u8()? as usize;

        let mut data = ByteReader::new(&body.data);
        let (challenge, security_blob) = if capabilities & CAP_EXTENDED_SECURITY != 0 {
            data.skip(16)?; // server GUID
            (None, data.bytes(data.remaining())?.to_vec())
        } else {
            if challenge_length != 8 {
                return Err(SMBError::parse_error("Bad challenge length"));
            }
            (Some(data.array::<8>()?), Vec::new())
        };
        Ok(Self {
            dialect_index,
            user_level_security: security_mode & SECURITY_MODE_USER_LEVEL != 0,
            challenge_response_required: security_mode & SECURITY_MODE_ENCRYPT_PASSWORDS != 0,
            max_buffer_size,
            session_key,
            capabilities,
            challenge,
            security_blob,
        })
    }
}
