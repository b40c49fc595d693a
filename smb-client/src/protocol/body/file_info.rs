use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{from_utf16le, put_u32, put_u64, to_utf16le, ByteReader};
use crate::protocol::body::{FileAttributes, FileTime};

#[repr(u8)]
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, Serialize, Deserialize, Copy, Clone)]
pub enum FileInformationClass {
    DirectoryInformation = 1,
    BasicInformation = 4,
    StandardInformation = 5,
    RenameInformation = 10,
    DispositionInformation = 13,
    AllInformation = 18,
    EndOfFileInformation = 20,
}

/// MS-FSCC 2.4.7, 40 bytes.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct FileBasicInformation {
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub file_attributes: FileAttributes,
}

impl FileBasicInformation {
    pub fn parse(data: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(data);
        let creation_time = FileTime(reader.u64()?);
        let last_access_time = FileTime(reader.u64()?);
        let last_write_time = FileTime(reader.u64()?);
        let change_time = FileTime(reader.u64()?);
        let file_attributes = FileAttributes::from_bits_truncate(reader.u32()?);
        Ok(Self {
            creation_time,
            last_access_time,
            last_write_time,
            change_time,
            file_attributes,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(40);
        put_u64(&mut out, self.creation_time.0);
        put_u64(&mut out, self.last_access_time.0);
        put_u64(&mut out, self.last_write_time.0);
        put_u64(&mut out, self.change_time.0);
        put_u32(&mut out, self.file_attributes.bits());
        put_u32(&mut out, 0); // reserved
        out
    }
}

/// MS-FSCC 2.4.41, 24 bytes.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct FileStandardInformation {
    pub allocation_size: u64,
    pub end_of_file: u64,
    pub number_of_links: u32,
    pub delete_pending: bool,
    pub directory: bool,
}

impl FileStandardInformation {
    pub fn parse(data: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(data);
        let allocation_size = reader.u64()?;
        let end_of_file = reader.u64()?;
        let number_of_links = reader.u32()?;
        let delete_pending = reader.u8()? != 0;
        let directory = reader.u8()? != 0;
        Ok(Self {
            allocation_size,
            end_of_file,
            number_of_links,
            delete_pending,
            directory,
        })
    }
}

/// One entry of an MS-FSCC 2.4.10 listing; 64 fixed bytes plus name.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FileDirectoryInformation {
    pub creation_time: FileTime,
    pub last_write_time: FileTime,
    pub end_of_file: u64,
    pub file_attributes: FileAttributes,
    pub file_name: String,
}

impl FileDirectoryInformation {
    pub fn is_directory(&self) -> bool {
        self.file_attributes.contains(FileAttributes::DIRECTORY)
    }

    /// Walks the NextEntryOffset chain of a query directory payload.
    pub fn parse_listing(data: &[u8]) -> SMBResult<Vec<Self>> {
        let mut entries = Vec::new();
        let mut pos = 0usize;
        loop {
            let slice = data
                .get(pos..)
                .ok_or_else(|| SMBError::parse_error("Listing entry offset out of range"))?;
            let mut reader = ByteReader::new(slice);
            let next_entry_offset = reader.u32()? as usize;
            reader.skip(4)?; // FileIndex
            let creation_time = FileTime(reader.u64()?);
            reader.skip(8)?; // LastAccessTime
            let last_write_time = FileTime(reader.u64()?);
            reader.skip(8)?; // ChangeTime
            let end_of_file = reader.u64()?;
            reader.skip(8)?; // AllocationSize
            let file_attributes = FileAttributes::from_bits_truncate(reader.u32()?);
            let file_name_length = reader.u32()? as usize;
            let file_name = from_utf16le(reader.bytes(file_name_length)?)?;
            entries.push(Self {
                creation_time,
                last_write_time,
                end_of_file,
                file_attributes,
                file_name,
            });
            if next_entry_offset == 0 {
                break;
            }
            pos += next_entry_offset;
        }
        Ok(entries)
    }
}

/// MS-FSCC 2.4.34.2 (SMB2 variant).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FileRenameInformation {
    pub replace_if_exists: bool,
    pub file_name: String,
}

impl FileRenameInformation {
    pub fn encode(&self) -> Vec<u8> {
        let name = to_utf16le(&self.file_name);
        let mut out = Vec::with_capacity(20 + name.len());
        out.push(self.replace_if_exists as u8);
        out.extend_from_slice(&[0u8; 7]); // reserved
        put_u64(&mut out, 0); // RootDirectory
        put_u32(&mut out, name.len() as u32);
        out.extend_from_slice(&name);
        out
    }
}

/// MS-FSCC 2.4.11.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FileDispositionInformation {
    pub delete_pending: bool,
}

impl FileDispositionInformation {
    pub fn encode(&self) -> Vec<u8> {
        vec![self.delete_pending as u8]
    }
}

/// MS-FSCC 2.4.13.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FileEndOfFileInformation {
    pub end_of_file: u64,
}

impl FileEndOfFileInformation {
    pub fn encode(&self) -> Vec<u8> {
        self.end_of_file.to_le_bytes().to_vec()
    }
}
