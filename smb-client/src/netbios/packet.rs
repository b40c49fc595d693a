use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

/// NetBIOS name suffix of the file server service.
pub const SMB_SERVER_SUFFIX: u8 = 0x20;

/// Suffix of a workstation, used as the calling name.
pub const WORKSTATION_SUFFIX: u8 = 0x00;

/// Wildcard called name accepted by most servers on port 139.
pub const SMBSERVER_NAME: &str = "*SMBSERVER";

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SessionPacketType {
    Message = 0x00,
    Request = 0x81,
    PositiveResponse = 0x82,
    NegativeResponse = 0x83,
    RetargetResponse = 0x84,
    Keepalive = 0x85,
}

/// One session-service frame: a type byte, a 3-byte big-endian length
/// and the payload. Direct TCP on 445 uses the same frame with type
/// Message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SessionPacket {
    pub packet_type: SessionPacketType,
    pub payload: Vec<u8>,
}

impl SessionPacket {
    pub fn message(payload: Vec<u8>) -> Self {
        Self {
            packet_type: SessionPacketType::Message,
            payload,
        }
    }

    /// RFC 1002 session request naming this node and the server.
    pub fn session_request(called: &str, calling: &str) -> Self {
        let mut payload = Vec::with_capacity(68);
        payload.extend_from_slice(&encode_name(called, SMB_SERVER_SUFFIX));
        payload.extend_from_slice(&encode_name(calling, WORKSTATION_SUFFIX));
        Self {
            packet_type: SessionPacketType::Request,
            payload,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.payload.len());
        out.push(self.packet_type as u8);
        let length = self.payload.len() as u32;
        out.push((length >> 16) as u8);
        out.push((length >> 8) as u8);
        out.push(length as u8);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// RFC 1001 first-level encoding: the 15-character padded name plus the
/// suffix byte, each nibble mapped onto 'A'..'P', wrapped as a single
/// DNS label.
pub fn encode_name(name: &str, suffix: u8) -> [u8; 34] {
    let upper = name.to_uppercase();
    let mut raw = [b' '; 16];
    for (i, byte) in upper.bytes().take(15).enumerate() {
        raw[i] = byte;
    }
    raw[15] = suffix;
    let mut out = [0u8; 34];
    out[0] = 32; // label length
    for (i, byte) in raw.iter().enumerate() {
        out[1 + i * 2] = b'A' + (byte >> 4);
        out[2 + i * 2] = b'A' + (byte & 0x0F);
    }
    out[33] = 0; // root label
    out
}

pub fn parse_packet_type(byte: u8) -> SMBResult<SessionPacketType> {
    SessionPacketType::try_from_primitive(byte)
        .map_err(|_| SMBError::parse_error("Unknown session packet type"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_frame_has_big_endian_length() {
        let bytes = SessionPacket::message(vec![0u8; 0x1_0203]).encode();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(&bytes[1..4], &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn encoded_name_is_one_padded_label() {
        let encoded = encode_name("fileserver", SMB_SERVER_SUFFIX);
        assert_eq!(encoded[0], 32);
        assert_eq!(encoded[33], 0);
        // 'F' = 0x46 -> 'E', 'G'
        assert_eq!(&encoded[1..3], &[b'E', b'G']);
        // trailing space 0x20 -> 'C', 'A'
        assert_eq!(&encoded[29..31], &[b'C', b'A']);
    }

    #[test]
    fn session_request_carries_both_names() {
        let packet = SessionPacket::session_request(SMBSERVER_NAME, "CLIENT");
        assert_eq!(packet.packet_type, SessionPacketType::Request);
        assert_eq!(packet.payload.len(), 68);
    }
}
