use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, to_utf16le, ByteReader};

pub const NTLMSSP_SIGNATURE: [u8; 8] = *b"NTLMSSP\0";

const MESSAGE_TYPE_NEGOTIATE: u32 = 1;
const MESSAGE_TYPE_CHALLENGE: u32 = 2;
const MESSAGE_TYPE_AUTHENTICATE: u32 = 3;

/// MsvAvTimestamp AV pair id.
const AV_TIMESTAMP: u16 = 0x0007;
const AV_EOL: u16 = 0x0000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct NegotiateFlags: u32 {
        const UNICODE = 0x0000_0001;
        const OEM = 0x0000_0002;
        const REQUEST_TARGET = 0x0000_0004;
        const SIGN = 0x0000_0010;
        const SEAL = 0x0000_0020;
        const NTLM = 0x0000_0200;
        const ALWAYS_SIGN = 0x0000_8000;
        const EXTENDED_SESSION_SECURITY = 0x0008_0000;
        const TARGET_INFO = 0x0080_0000;
        const VERSION = 0x0200_0000;
        const KEY_128 = 0x2000_0000;
        const KEY_EXCH = 0x4000_0000;
        const KEY_56 = 0x8000_0000;
    }
}

fn push_field(out: &mut Vec<u8>, payload: &mut Vec<u8>, payload_base: usize, data: &[u8]) {
    put_u16(out, data.len() as u16);
    put_u16(out, data.len() as u16);
    put_u32(out, (payload_base + payload.len()) as u32);
    payload.extend_from_slice(data);
}

fn read_field<'a>(reader: &mut ByteReader, message: &'a [u8]) -> SMBResult<&'a [u8]> {
    let length = reader.u16()? as usize;
    reader.skip(2)?; // MaximumLength
    let offset = reader.u32()? as usize;
    if offset + length > message.len() {
        return Err(SMBError::parse_error("NTLM field extends past the message"));
    }
    Ok(&message[offset..offset + length])
}

fn check_prologue(reader: &mut ByteReader, expected_type: u32) -> SMBResult<()> {
    if reader.array::<8>()? != NTLMSSP_SIGNATURE {
        return Err(SMBError::parse_error("Missing NTLMSSP signature"));
    }
    if reader.u32()? != expected_type {
        return Err(SMBError::parse_error("Unexpected NTLM message type"));
    }
    Ok(())
}

/// MS-NLMP 2.2.1.1. Domain and workstation are never supplied here.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NtlmNegotiateMessage {
    pub flags: NegotiateFlags,
}

impl NtlmNegotiateMessage {
    pub fn new() -> Self {
        Self {
            flags: NegotiateFlags::UNICODE
                | NegotiateFlags::REQUEST_TARGET
                | NegotiateFlags::NTLM
                | NegotiateFlags::ALWAYS_SIGN
                | NegotiateFlags::EXTENDED_SESSION_SECURITY
                | NegotiateFlags::TARGET_INFO
                | NegotiateFlags::KEY_128
                | NegotiateFlags::KEY_EXCH
                | NegotiateFlags::KEY_56,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        out.extend_from_slice(&NTLMSSP_SIGNATURE);
        put_u32(&mut out, MESSAGE_TYPE_NEGOTIATE);
        put_u32(&mut out, self.flags.bits());
        out.extend_from_slice(&[0u8; 16]); // empty domain + workstation fields
        out
    }
}

impl Default for NtlmNegotiateMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// MS-NLMP 2.2.1.2, as received from the server.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NtlmChallengeMessage {
    pub flags: NegotiateFlags,
    pub server_challenge: [u8; 8],
    pub target_info: Vec<u8>,
}

impl NtlmChallengeMessage {
    pub fn parse(message: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(message);
        check_prologue(&mut reader, MESSAGE_TYPE_CHALLENGE)?;
        reader.skip(8)?; // TargetName field
        let flags = NegotiateFlags::from_bits_truncate(reader.u32()?);
        let server_challenge = reader.array::<8>()?;
        reader.skip(8)?; // reserved
        let target_info = read_field(&mut reader, message)?.to_vec();
        Ok(Self {
            flags,
            server_challenge,
            target_info,
        })
    }

    /// The MsvAvTimestamp pair when the server supplies one; responses
    /// must echo it instead of the local clock.
    pub fn timestamp(&self) -> Option<u64> {
        let mut reader = ByteReader::new(&self.target_info);
        loop {
            let id = reader.u16().ok()?;
            let length = reader.u16().ok()? as usize;
            if id == AV_EOL {
                return None;
            }
            let value = reader.bytes(length).ok()?;
            if id == AV_TIMESTAMP && length == 8 {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(value);
                return Some(u64::from_le_bytes(raw));
            }
        }
    }
}

/// MS-NLMP 2.2.1.3.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NtlmAuthenticateMessage {
    pub flags: NegotiateFlags,
    pub lm_response: Vec<u8>,
    pub nt_response: Vec<u8>,
    pub domain: String,
    pub user: String,
    pub workstation: String,
    pub encrypted_session_key: Vec<u8>,
}

impl NtlmAuthenticateMessage {
    pub fn encode(&self) -> Vec<u8> {
        const FIXED: usize = 64;
        let mut out = Vec::with_capacity(FIXED);
        let mut payload = Vec::new();
        out.extend_from_slice(&NTLMSSP_SIGNATURE);
        put_u32(&mut out, MESSAGE_TYPE_AUTHENTICATE);
        push_field(&mut out, &mut payload, FIXED, &self.lm_response);
        push_field(&mut out, &mut payload, FIXED, &self.nt_response);
        push_field(&mut out, &mut payload, FIXED, &to_utf16le(&self.domain));
        push_field(&mut out, &mut payload, FIXED, &to_utf16le(&self.user));
        push_field(&mut out, &mut payload, FIXED, &to_utf16le(&self.workstation));
        push_field(&mut out, &mut payload, FIXED, &self.encrypted_session_key);
        put_u32(&mut out, self.flags.bits());
        out.extend_from_slice(&payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_challenge(target_info: &[u8]) -> Vec<u8> {
        let mut message = vec![0u8; 48];
        message[..8].copy_from_slice(&NTLMSSP_SIGNATURE);
        message[8..12].copy_from_slice(&MESSAGE_TYPE_CHALLENGE.to_le_bytes());
        message[20..24]
            .copy_from_slice(&(NegotiateFlags::UNICODE | NegotiateFlags::KEY_EXCH).bits().to_le_bytes());
        message[24..32].copy_from_slice(&[0x11; 8]);
        message[40..42].copy_from_slice(&(target_info.len() as u16).to_le_bytes());
        message[42..44].copy_from_slice(&(target_info.len() as u16).to_le_bytes());
        message[44..48].copy_from_slice(&48u32.to_le_bytes());
        message.extend_from_slice(target_info);
        message
    }

    #[test]
    fn negotiate_message_is_32_bytes() {
        let bytes = NtlmNegotiateMessage::new().encode();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[..8], &NTLMSSP_SIGNATURE);
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 1);
    }

    #[test]
    fn challenge_parse_extracts_challenge_and_flags() {
        let parsed = NtlmChallengeMessage::parse(&sample_challenge(&[])).unwrap();
        assert_eq!(parsed.server_challenge, [0x11; 8]);
        assert!(parsed.flags.contains(NegotiateFlags::KEY_EXCH));
        assert_eq!(parsed.timestamp(), None);
    }

    #[test]
    fn challenge_timestamp_av_pair() {
        let mut target_info = Vec::new();
        target_info.extend_from_slice(&AV_TIMESTAMP.to_le_bytes());
        target_info.extend_from_slice(&8u16.to_le_bytes());
        target_info.extend_from_slice(&0x0102030405060708u64.to_le_bytes());
        target_info.extend_from_slice(&[0u8; 4]); // MsvAvEOL
        let parsed = NtlmChallengeMessage::parse(&sample_challenge(&target_info)).unwrap();
        assert_eq!(parsed.timestamp(), Some(0x0102030405060708));
    }

    #[test]
    fn wrong_message_type_is_rejected() {
        let mut message = sample_challenge(&[]);
        message[8] = 3;
        assert!(NtlmChallengeMessage::parse(&message).is_err());
    }

    #[test]
    fn authenticate_fields_point_into_payload() {
        let message = NtlmAuthenticateMessage {
            flags: NegotiateFlags::UNICODE,
            lm_response: vec![1; 24],
            nt_response: vec![2; 48],
            domain: "D".to_string(),
            user: "u".to_string(),
            workstation: String::new(),
            encrypted_session_key: vec![3; 16],
        }
        .encode();
        let lm_offset = u32::from_le_bytes(message[16..20].try_into().unwrap()) as usize;
        let nt_offset = u32::from_le_bytes(message[24..28].try_into().unwrap()) as usize;
        assert_eq!(lm_offset, 64);
        assert_eq!(&message[lm_offset..lm_offset + 24], &[1u8; 24]);
        assert_eq!(&message[nt_offset..nt_offset + 48], &[2u8; 48]);
    }
}
