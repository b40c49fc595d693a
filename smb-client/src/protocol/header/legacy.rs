use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::nt_status::NTStatus;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, ByteReader};

pub const SMB1_PROTOCOL_ID: [u8; 4] = [0xFF, b'S', b'M', b'B'];
pub const SMB1_HEADER_SIZE: usize = 32;

/// [MS-CIFS] 3.2.5.1: MID 0xFFFF marks a server-initiated oplock break.
pub const LEGACY_OPLOCK_BREAK_MID: u16 = 0xFFFF;

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum SMB1Command {
    Close = 0x04,
    ReadAndX = 0x2E,
    WriteAndX = 0x2F,
    TreeDisconnect = 0x71,
    Negotiate = 0x72,
    SessionSetupAndX = 0x73,
    LogoffAndX = 0x74,
    TreeConnectAndX = 0x75,
    NtCreateAndX = 0xA2,
    LockingAndX = 0x24,
    Echo = 0x2B,
    Transaction2 = 0x32,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub struct SMB1Flags2: u16 {
        const LONG_NAMES_ALLOWED = 0x0001;
        const EXTENDED_ATTRIBUTES = 0x0002;
        const SECURITY_SIGNATURE = 0x0004;
        const LONG_NAME_USED = 0x0040;
        const EXTENDED_SECURITY = 0x0800;
        const DFS = 0x1000;
        const PAGING_IO = 0x2000;
        const NT_STATUS_CODE = 0x4000;
        const UNICODE = 0x8000;
    }
}

/// Legacy 32-byte SMB header. Flags byte 0x08 (case insensitive) and
/// 0x80 (reply) are the only first-flags bits the client touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SMB1Header {
    pub command: SMB1Command,
    pub status: u32,
    pub flags: u8,
    pub flags2: SMB1Flags2,
    pub tid: u16,
    pub pid: u32,
    pub uid: u16,
    pub mid: u16,
}

impl SMB1Header {
    pub fn new_request(command: SMB1Command, flags2: SMB1Flags2) -> Self {
        Self {
            command,
            status: 0,
            flags: 0x08,
            flags2,
            tid: 0,
            pid: 0,
            uid: 0,
            mid: 0,
        }
    }

    pub fn status(&self) -> NTStatus {
        NTStatus::from_raw(self.status)
    }

    pub fn is_response(&self) -> bool {
        self.flags & 0x80 != 0
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SMB1_HEADER_SIZE);
        out.extend_from_slice(&SMB1_PROTOCOL_ID);
        out.push(self.command as u8);
        put_u32(&mut out, self.status);
        out.push(self.flags);
        put_u16(&mut out, self.flags2.bits());
        put_u16(&mut out, (self.pid >> 16) as u16); // PIDHigh
        out.extend_from_slice(&[0u8; 8]); // SecurityFeatures
        put_u16(&mut out, 0); // reserved
        put_u16(&mut out, self.tid);
        put_u16(&mut out, self.pid as u16); // PIDLow
        put_u16(&mut out, self.uid);
        put_u16(&mut out, self.mid);
        out
    }

    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(input);
        let protocol_id = reader.array::<4>()?;
        if protocol_id != SMB1_PROTOCOL_ID {
            return Err(SMBError::parse_error("Missing SMB1 protocol id"));
        }
        let command = SMB1Command::try_from_primitive(reader.u8()?)
            .map_err(|_| SMBError::parse_error("Unknown SMB1 command code"))?;
        let status = reader.u32()?;
        let flags = reader.u8()?;
        let flags2 = SMB1Flags2::from_bits_truncate(reader.u16()?);
        let pid_high = reader.u16()?;
        reader.skip(8)?; // SecurityFeatures
        reader.skip(2)?; // reserved
        let tid = reader.u16()?;
        let pid_low = reader.u16()?;
        let uid = reader.u16()?;
        let mid = reader.u16()?;
        Ok(Self {
            command,
            status,
            flags,
            flags2,
            tid,
            pid: ((pid_high as u32) << 16) | pid_low as u32,
            uid,
            mid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut header = SMB1Header::new_request(
            SMB1Command::SessionSetupAndX,
            SMB1Flags2::UNICODE | SMB1Flags2::NT_STATUS_CODE,
        );
        header.tid = 3;
        header.pid = 0x0001_0002;
        header.uid = 9;
        header.mid = 77;
        let bytes = header.encode();
        assert_eq!(bytes.len(), SMB1_HEADER_SIZE);
        assert_eq!(SMB1Header::parse(&bytes).unwrap(), header);
    }
}
