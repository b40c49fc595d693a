use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, ByteReader};
use crate::protocol::body::{Capabilities, FileTime, SMBDialect};
use crate::protocol::header::SMB2_HEADER_SIZE;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct NegotiateSecurityMode: u16 {
        const NEGOTIATE_SIGNING_ENABLED = 0x01;
        const NEGOTIATE_SIGNING_REQUIRED = 0x02;
    }
}

#[repr(u16)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum EncryptionCipher {
    AES128CCM = 0x0001,
    AES128GCM = 0x0002,
}

pub const PREAUTH_INTEGRITY_SHA512: u16 = 0x0001;

const CONTEXT_PREAUTH_INTEGRITY: u16 = 0x0001;
const CONTEXT_ENCRYPTION: u16 = 0x0002;

/// MS-SMB2 2.2.3. The 3.1.1 negotiate contexts are appended only when
/// 3.1.1 is among the offered dialects.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBNegotiateRequest {
    pub security_mode: NegotiateSecurityMode,
    pub capabilities: Capabilities,
    pub client_guid: Uuid,
    pub dialects: Vec<SMBDialect>,
}

impl SMBNegotiateRequest {
    pub fn new(dialects: Vec<SMBDialect>, client_guid: Uuid) -> Self {
        Self {
            security_mode: NegotiateSecurityMode::NEGOTIATE_SIGNING_ENABLED,
            capabilities: Capabilities::ENCRYPTION | Capabilities::LARGE_MTU,
            client_guid,
            dialects,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let wants_contexts = self.dialects.contains(&SMBDialect::V3_1_1);
        let mut out = Vec::new();
        put_u16(&mut out, 36); // StructureSize
        put_u16(&mut out, self.dialects.len() as u16);
        put_u16(&mut out, self.security_mode.bits());
        put_u16(&mut out, 0); // reserved
        put_u32(&mut out, self.capabilities.bits());
        out.extend_from_slice(self.client_guid.as_bytes());
        let context_offset_field = out.len();
        put_u64(&mut out, 0); // NegotiateContextOffset/Count or ClientStartTime
        for dialect in &self.dialects {
            put_u16(&mut out, *dialect as u16);
        }
        if wants_contexts {
            while (SMB2_HEADER_SIZE + out.len()) % 8 != 0 {
                out.push(0);
            }
            let context_offset = (SMB2_HEADER_SIZE + out.len()) as u32;
            encode_context(&mut out, CONTEXT_PREAUTH_INTEGRITY, &preauth_context_data());
            while (SMB2_HEADER_SIZE + out.len()) % 8 != 0 {
                out.push(0);
            }
            encode_context(&mut out, CONTEXT_ENCRYPTION, &encryption_context_data());
            out[context_offset_field..context_offset_field + 4]
                .copy_from_slice(&context_offset.to_le_bytes());
            out[context_offset_field + 4..context_offset_field + 6]
                .copy_from_slice(&2u16.to_le_bytes());
        }
        out
    }
}

fn encode_context(out: &mut Vec<u8>, context_type: u16, data: &[u8]) {
    put_u16(out, context_type);
    put_u16(out, data.len() as u16);
    put_u32(out, 0); // reserved
    out.extend_from_slice(data);
}

fn preauth_context_data() -> Vec<u8> {
    let mut salt = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut data = Vec::with_capacity(38);
    put_u16(&mut data, 1); // HashAlgorithmCount
    put_u16(&mut data, salt.len() as u16);
    put_u16(&mut data, PREAUTH_INTEGRITY_SHA512);
    data.extend_from_slice(&salt);
    data
}

fn encode_encryption_context(ciphers: &[EncryptionCipher]) -> Vec<u8> {
    let mut data = Vec::with_capacity(2 + ciphers.len() * 2);
    put_u16(&mut data, ciphers.len() as u16);
    for cipher in ciphers {
        put_u16(&mut data, *cipher as u16);
    }
    data
}

fn encryption_context_data() -> Vec<u8> {
    encode_encryption_context(&[EncryptionCipher::AES128GCM, EncryptionCipher::AES128CCM])
}

/// MS-SMB2 2.2.4.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBNegotiateResponse {
    pub security_mode: NegotiateSecurityMode,
    pub dialect: SMBDialect,
    pub server_guid: Uuid,
    pub capabilities: Capabilities,
    pub max_transact_size: u32,
    pub max_read_size: u32,
    pub max_write_size: u32,
    pub system_time: FileTime,
    pub security_buffer: Vec<u8>,
    pub cipher: Option<EncryptionCipher>,
}

impl SMBNegotiateResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        let structure_size = reader.u16()?;
        if structure_size != 65 {
            return Err(SMBError::parse_error("Bad negotiate response structure size"));
        }
        let security_mode = NegotiateSecurityMode::from_bits_truncate(reader.u16()?);
        let dialect = SMBDialect::try_from_primitive(reader.u16()?)
            .map_err(|_| SMBError::parse_error("Server selected an unknown dialect"))?;
        let context_count = reader.u16()?;
        let server_guid = Uuid::from_bytes(reader.array::<16>()?);
        let capabilities = Capabilities::from_bits_truncate(reader.u32()?);
        let max_transact_size = reader.u32()?;
        let max_read_size = reader.u32()?;
        let max_write_size = reader.u32()?;
        let system_time = FileTime(reader.u64()?);
        let _server_start_time = reader.u64()?;
        let buffer_offset = reader.u16()? as usize;
        let buffer_length = reader.u16()? as usize;
        let context_offset = reader.u32()? as usize;

        let security_buffer = if buffer_length > 0 {
            slice_from_header_offset(body, buffer_offset, buffer_length)?.to_vec()
        } else {
            Vec::new()
        };
        let cipher = if dialect == SMBDialect::V3_1_1 && context_count > 0 {
            parse_contexts(body, context_offset, context_count)?
        } else {
            None
        };
        Ok(Self {
            security_mode,
            dialect,
            server_guid,
            capabilities,
            max_transact_size,
            max_read_size,
            max_write_size,
            system_time,
            security_buffer,
            cipher,
        })
    }
}

/// Offset fields count from the packet header; `body` starts 64 bytes in.
fn slice_from_header_offset(body: &[u8], offset: usize, length: usize) -> SMBResult<&[u8]> {
    let start = offset
        .checked_sub(SMB2_HEADER_SIZE)
        .ok_or_else(|| SMBError::parse_error("Buffer offset inside the header"))?;
    if start + length > body.len() {
        return Err(SMBError::parse_error("Buffer extends past the message"));
    }
    Ok(&body[start..start + length])
}

fn parse_contexts(
    body: &[u8],
    context_offset: usize,
    count: u16,
) -> SMBResult<Option<EncryptionCipher>> {
    let mut pos = context_offset
        .checked_sub(SMB2_HEADER_SIZE)
        .ok_or_else(|| SMBError::parse_error("Context offset inside the header"))?;
    let mut cipher = None;
    for _ in 0..count {
        pos = (pos + 7) & !7;
        let mut reader = ByteReader::new(body.get(pos..).unwrap_or(&[]));
        let context_type = reader.u16()?;
        let data_length = reader.u16()? as usize;
        reader.skip(4)?;
        let data = reader.bytes(data_length)?;
        match context_type {
            CONTEXT_PREAUTH_INTEGRITY => {
                let mut inner = ByteReader::new(data);
                let algorithm_count = inner.u16()?;
                inner.skip(2)?; // SaltLength
                if algorithm_count != 1 || inner.u16()? != PREAUTH_INTEGRITY_SHA512 {
                    return Err(SMBError::parse_error(
                        "Server selected an unsupported preauth hash",
                    ));
                }
            }
            CONTEXT_ENCRYPTION => {
                let mut inner = ByteReader::new(data);
                let cipher_count = inner.u16()?;
                if cipher_count == 1 {
                    let value = inner.u16()?;
                    if value != 0 {
                        cipher = Some(EncryptionCipher::try_from_primitive(value).map_err(
                            |_| SMBError::parse_error("Server selected an unknown cipher"),
                        )?);
                    }
                }
            }
            _ => {}
        }
        pos += 8 + data_length;
    }
    Ok(cipher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_without_311_has_no_contexts() {
        let request = SMBNegotiateRequest::new(
            vec![SMBDialect::V2_0_2, SMBDialect::V2_1_0],
            Uuid::new_v4(),
        );
        let bytes = request.encode();
        assert_eq!(u16::from_le_bytes([bytes[0], bytes[1]]), 36);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 2);
        // ClientStartTime stays zero when no contexts follow
        assert_eq!(&bytes[28..36], &[0u8; 8]);
        assert_eq!(bytes.len(), 36 + 2 * 2);
    }

    #[test]
    fn request_with_311_appends_aligned_contexts() {
        let request = SMBNegotiateRequest::new(SMBDialect::all().to_vec(), Uuid::new_v4());
        let bytes = request.encode();
        let context_offset = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);
        let context_count = u16::from_le_bytes([bytes[32], bytes[33]]);
        assert_eq!(context_count, 2);
        assert_eq!(context_offset % 8, 0);
        let first = (context_offset as usize) - SMB2_HEADER_SIZE;
        assert_eq!(
            u16::from_le_bytes([bytes[first], bytes[first + 1]]),
            CONTEXT_PREAUTH_INTEGRITY
        );
    }

    #[test]
    fn response_round_trip_with_buffer() {
        // Hand-build a minimal 2.1 response with a 4-byte security buffer.
        let mut body = vec![0u8; 64];
        body[0..2].copy_from_slice(&65u16.to_le_bytes());
        body[2..4].copy_from_slice(&1u16.to_le_bytes()); // signing enabled
        body[4..6].copy_from_slice(&0x0210u16.to_le_bytes());
        body[36..40].copy_from_slice(&65536u32.to_le_bytes()); // max write
        body[56..58].copy_from_slice(&((SMB2_HEADER_SIZE + 64) as u16).to_le_bytes());
        body[58..60].copy_from_slice(&4u16.to_le_bytes());
        body.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let parsed = SMBNegotiateResponse::parse(&body).unwrap();
        assert_eq!(parsed.dialect, SMBDialect::V2_1_0);
        assert_eq!(parsed.max_write_size, 65536);
        assert_eq!(parsed.security_buffer, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(parsed.cipher, None);
    }

    #[test]
    fn response_rejects_bad_structure_size() {
        let mut body = vec![0u8; 64];
        body[0..2].copy_from_slice(&64u16.to_le_bytes());
        assert!(SMBNegotiateResponse::parse(&body).is_err());
    }
}
