use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, to_utf16le, ByteReader};
use crate::protocol::body::FileTime;
use crate::protocol::header::SMB2_HEADER_SIZE;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct FileAttributes: u32 {
        const READONLY = 0x0001;
        const HIDDEN = 0x0002;
        const SYSTEM = 0x0004;
        const DIRECTORY = 0x0010;
        const ARCHIVE = 0x0020;
        const NORMAL = 0x0080;
        const TEMPORARY = 0x0100;
        const SPARSE_FILE = 0x0200;
        const REPARSE_POINT = 0x0400;
        const COMPRESSED = 0x0800;
        const OFFLINE = 0x1000;
        const NOT_CONTENT_INDEXED = 0x2000;
        const ENCRYPTED = 0x4000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct ShareAccess: u32 {
        const READ = 0x01;
        const WRITE = 0x02;
        const DELETE = 0x04;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Default)]
    pub struct CreateOptions: u32 {
        const DIRECTORY_FILE = 0x0001;
        const WRITE_THROUGH = 0x0002;
        const SEQUENTIAL_ONLY = 0x0004;
        const NO_INTERMEDIATE_BUFFERING = 0x0008;
        const SYNCHRONOUS_IO_NONALERT = 0x0020;
        const NON_DIRECTORY_FILE = 0x0040;
        const NO_EA_KNOWLEDGE = 0x0200;
        const RANDOM_ACCESS = 0x0800;
        const DELETE_ON_CLOSE = 0x1000;
        const OPEN_REPARSE_POINT = 0x0020_0000;
    }
}

#[repr(u32)]
#[derive(Debug, Eq, PartialEq, Serialize, Deserialize, Copy, Clone)]
pub enum CreateDisposition {
    Supersede = 0x00,
    Open = 0x01,
    Create = 0x02,
    OpenIf = 0x03,
    Overwrite = 0x04,
    OverwriteIf = 0x05,
}

/// MS-SMB2 2.2.13. Oplocks are never requested and create contexts
/// are never attached.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBCreateRequest {
    pub desired_access: u32,
    pub file_attributes: FileAttributes,
    pub share_access: ShareAccess,
    pub create_disposition: CreateDisposition,
    pub create_options: CreateOptions,
    pub path: String,
}

impl SMBCreateRequest {
    pub fn encode(&self) -> Vec<u8> {
        let name = to_utf16le(&self.path);
        let mut out = Vec::with_capacity(56 + name.len().max(1));
        put_u16(&mut out, 57); // StructureSize
        out.push(0); // SecurityFlags
        out.push(0); // RequestedOplockLevel
        put_u32(&mut out, 2); // ImpersonationLevel: Impersonation
        put_u64(&mut out, 0); // SmbCreateFlags
        put_u64(&mut out, 0); // reserved
        put_u32(&mut out, self.desired_access);
        put_u32(&mut out, self.file_attributes.bits());
        put_u32(&mut out, self.share_access.bits());
        put_u32(&mut out, self.create_disposition as u32);
        put_u32(&mut out, self.create_options.bits());
        put_u16(&mut out, (SMB2_HEADER_SIZE + 56) as u16);
        put_u16(&mut out, name.len() as u16);
        put_u64(&mut out, 0); // CreateContextsOffset/Length
        if name.is_empty() {
            // the buffer field must still occupy one byte
            out.push(0);
        } else {
            out.extend_from_slice(&name);
        }
        out
    }
}

/// MS-SMB2 2.2.14.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMBCreateResponse {
    pub create_action: u32,
    pub creation_time: FileTime,
    pub last_write_time: FileTime,
    pub end_of_file: u64,
    pub file_attributes: FileAttributes,
    pub file_id: [u8; 16],
}

impl SMBCreateResponse {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(body);
        if reader.u16()? != 89 {
            return Err(SMBError::parse_error("Bad create response structure size"));
        }
        reader.skip(2)?; // OplockLevel + Flags
        let create_action = reader.u32()?;
        let creation_time = FileTime(reader.u64()?);
        reader.skip(8)?; // LastAccessTime
        let last_write_time = FileTime(reader.u64()?);
        reader.skip(8)?; // ChangeTime
        reader.skip(8)?; // AllocationSize
        let end_of_file = reader.u64()?;
        let file_attributes = FileAttributes::from_bits_truncate(reader.u32()?);
        reader.skip(4)?; // reserved
        let file_id = reader.array::<16>()?;
        Ok(Self {
            create_action,
            creation_time,
            last_write_time,
            end_of_file,
            file_attributes,
            file_id,
        })
    }
}
