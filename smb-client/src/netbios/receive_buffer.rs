use bytes::{Buf, BytesMut};

use smb_client_core::SMBResult;

use crate::netbios::packet::{parse_packet_type, SessionPacket};

/// Reassembles session-service frames from a TCP byte stream. TCP
/// reads may split or merge frames arbitrarily; bytes are appended as
/// they arrive and complete packets popped off the front.
#[derive(Debug, Default)]
pub struct SessionReceiveBuffer {
    buffer: BytesMut,
}

impl SessionReceiveBuffer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pops the next complete frame, or None until more bytes arrive.
    pub fn next_packet(&mut self) -> SMBResult<Option<SessionPacket>> {
        if self.buffer.len() < 4 {
            return Ok(None);
        }
        let packet_type = parse_packet_type(self.buffer[0])?;
        let length = ((self.buffer[1] as usize) << 16)
            | ((self.buffer[2] as usize) << 8)
            | self.buffer[3] as usize;
        if self.buffer.len() < 4 + length {
            return Ok(None);
        }
        self.buffer.advance(4);
        let payload = self.buffer.split_to(length).to_vec();
        Ok(Some(SessionPacket {
            packet_type,
            payload,
        }))
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netbios::packet::SessionPacketType;

    #[test]
    fn split_frame_waits_for_remainder() {
        let frame = SessionPacket::message(vec![1, 2, 3, 4]).encode();
        let mut buffer = SessionReceiveBuffer::new();
        buffer.append(&frame[..5]);
        assert!(buffer.next_packet().unwrap().is_none());
        buffer.append(&frame[5..]);
        let packet = buffer.next_packet().unwrap().unwrap();
        assert_eq!(packet.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn merged_frames_pop_in_order() {
        let mut stream = SessionPacket::message(vec![1]).encode();
        stream.extend_from_slice(
            &SessionPacket {
                packet_type: SessionPacketType::Keepalive,
                payload: Vec::new(),
            }
            .encode(),
        );
        stream.extend_from_slice(&SessionPacket::message(vec![2]).encode());
        let mut buffer = SessionReceiveBuffer::new();
        buffer.append(&stream);
        assert_eq!(buffer.next_packet().unwrap().unwrap().payload, vec![1]);
        assert_eq!(
            buffer.next_packet().unwrap().unwrap().packet_type,
            SessionPacketType::Keepalive
        );
        assert_eq!(buffer.next_packet().unwrap().unwrap().payload, vec![2]);
        assert!(buffer.next_packet().unwrap().is_none());
    }

    #[test]
    fn unknown_type_byte_is_an_error() {
        let mut buffer = SessionReceiveBuffer::new();
        buffer.append(&[0x77, 0, 0, 0]);
        assert!(buffer.next_packet().is_err());
    }
}
