use num_enum::TryFromPrimitive;

use smb_client_core::error::SMBError;
use smb_client_core::nt_status::NTStatus;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, ByteReader};
use crate::protocol::header::{SMB2Command, SMB2Flags};

pub const SMB2_PROTOCOL_ID: [u8; 4] = [0xFE, b'S', b'M', b'B'];
pub const SMB2_HEADER_SIZE: usize = 64;

/// [MS-SMB2] 3.2.5.1.2: a response carrying this message id is not a
/// reply to any request and must never settle the pending slot.
pub const UNSOLICITED_MESSAGE_ID: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// SMB2 sync header. The client never issues async commands, so the
/// async-id form is not modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMB2Header {
    pub credit_charge: u16,
    /// Raw status dword; decode through [`SMB2Header::status`] so unknown
    /// codes do not fail header parsing.
    pub status: u32,
    pub command: SMB2Command,
    /// Credits requested (client→server) or granted (server→client).
    pub credits: u16,
    pub flags: SMB2Flags,
    pub next_command: u32,
    pub message_id: u64,
    pub tree_id: u32,
    pub session_id: u64,
    pub signature: [u8; 16],
}

impl SMB2Header {
    pub fn new_request(command: SMB2Command) -> Self {
        Self {
            credit_charge: 0,
            status: 0,
            command,
            credits: 0,
            flags: SMB2Flags::empty(),
            next_command: 0,
            message_id: 0,
            tree_id: 0,
            session_id: 0,
            signature: [0; 16],
        }
    }

    pub fn status(&self) -> NTStatus {
        NTStatus::from_raw(self.status)
    }

    pub fn is_response(&self) -> bool {
        self.flags.contains(SMB2Flags::SERVER_TO_REDIR)
    }

    pub fn is_async(&self) -> bool {
        self.flags.contains(SMB2Flags::ASYNC_COMMAND)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SMB2_HEADER_SIZE);
        out.extend_from_slice(&SMB2_PROTOCOL_ID);
        put_u16(&mut out, SMB2_HEADER_SIZE as u16);
        put_u16(&mut out, self.credit_charge);
        put_u32(&mut out, self.status);
        put_u16(&mut out, self.command as u16);
        put_u16(&mut out, self.credits);
        put_u32(&mut out, self.flags.bits());
        put_u32(&mut out, self.next_command);
        put_u64(&mut out, self.message_id);
        put_u32(&mut out, 0); // reserved (process id)
        put_u32(&mut out, self.tree_id);
        put_u64(&mut out, self.session_id);
        out.extend_from_slice(&self.signature);
        out
    }

    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(input);
        let protocol_id = reader.array::<4>()?;
        if protocol_id != SMB2_PROTOCOL_ID {
            return Err(SMBError::parse_error("Missing SMB2 protocol id"));
        }
        let structure_size = reader.u16()?;
        if structure_size as usize != SMB2_HEADER_SIZE {
            return Err(SMBError::parse_error("Invalid SMB2 header structure size"));
        }
        let credit_charge = reader.u16()?;
        let status = reader.u32()?;
        let command = SMB2Command::try_from_primitive(reader.u16()?)
            .map_err(|_| SMBError::parse_error("Unknown SMB2 command code"))?;
        let credits = reader.u16()?;
        let flags = SMB2Flags::from_bits_truncate(reader.u32()?);
        let next_command = reader.u32()?;
        let message_id = reader.u64()?;
        reader.skip(4)?; // reserved
        let tree_id = reader.u32()?;
        let session_id = reader.u64()?;
        let signature = reader.array::<16>()?;
        Ok(Self {
            credit_charge,
            status,
            command,
            credits,
            flags,
            next_command,
            message_id,
            tree_id,
            session_id,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut header = SMB2Header::new_request(SMB2Command::TreeConnect);
        header.credit_charge = 1;
        header.credits = 16;
        header.message_id = 42;
        header.session_id = 0x1122_3344_5566_7788;
        header.tree_id = 7;
        header.flags = SMB2Flags::SIGNED;
        let bytes = header.encode();
        assert_eq!(bytes.len(), SMB2_HEADER_SIZE);
        assert_eq!(SMB2Header::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn rejects_wrong_protocol_id() {
        let mut bytes = SMB2Header::new_request(SMB2Command::Echo).encode();
        bytes[0] = 0xFF;
        assert!(SMB2Header::parse(&bytes).is_err());
    }

    #[test]
    fn unknown_status_still_parses() {
        let mut header = SMB2Header::new_request(SMB2Command::Echo);
        header.status = 0xDEAD_BEEF;
        let parsed = SMB2Header::parse(&header.encode()).unwrap();
        assert_eq!(parsed.status(), NTStatus::UnknownError);
        assert_eq!(parsed.status, 0xDEAD_BEEF);
    }
}
