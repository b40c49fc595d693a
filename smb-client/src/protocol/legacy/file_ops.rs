use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, put_u64, to_utf16le, ByteReader};
use crate::protocol::body::FileAttributes;
use crate::protocol::header::SMB1_HEADER_SIZE;
use crate::protocol::legacy::{check_word_count, push_andx, SMB1Body};

/// MS-CIFS 2.2.4.64.1.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1NtCreateRequest {
    pub desired_access: u32,
    pub file_attributes: u32,
    pub share_access: u32,
    pub create_disposition: u32,
    pub create_options: u32,
    pub path: String,
}

impl SMB1NtCreateRequest {
    pub fn encode(&self) -> Vec<u8> {
        let name = to_utf16le(&self.path);
        let mut words = Vec::with_capacity(48);
        push_andx(&mut words);
        words.push(0); // reserved
        put_u16(&mut words, name.len() as u16);
        put_u32(&mut words, 0); // Flags
        put_u32(&mut words, 0); // RootDirectoryFID
        put_u32(&mut words, self.desired_access);
        put_u64(&mut words, 0); // AllocationSize
        put_u32(&mut words, self.file_attributes);
        put_u32(&mut words, self.share_access);
        put_u32(&mut words, self.create_disposition);
        put_u32(&mut words, self.create_options);
        put_u32(&mut words, 2); // ImpersonationLevel: Impersonation
        words.push(0); // SecurityFlags

        let mut data = Vec::with_capacity(name.len() + 3);
        if (SMB1_HEADER_SIZE + 1 + words.len() + 2) % 2 != 0 {
            data.push(0);
        }
        data.extend_from_slice(&name);
        data.extend_from_slice(&[0, 0]);
        SMB1Body::new(words, data).encode()
    }
}

/// MS-CIFS 2.2.4.64.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1NtCreateResponse {
    pub fid: u16,
    pub create_action: u32,
    pub end_of_file: u64,
    pub file_attributes: FileAttributes,
    pub directory: bool,
}

impl SMB1NtCreateResponse {
    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(input)?;
        check_word_count(&body, 34, "NT create")?;
        let mut words = ByteReader::new(&body.words);
        words.skip(4)?; // AndX
        words.skip(1)?; // OplockLevel
        let fid = words.u16()?;
        let create_action = words.u32()?;
        words.skip(32)?; // four FILETIMEs
        let file_attributes = FileAttributes::from_bits_truncate(words.u32()?);
        words.skip(8)?; // AllocationSize
        let end_of_file = words.u64()?;
        words.skip(4)?; // ResourceType + NMPipeStatus
        let directory = words.u8()? != 0;
        Ok(Self {
            fid,
            create_action,
            end_of_file,
            file_attributes,
            directory,
        })
    }
}

/// MS-CIFS 2.2.4.42.1, the 64-bit-offset form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1ReadRequest {
    pub fid: u16,
    pub offset: u64,
    pub max_count: u16,
}

impl SMB1ReadRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(24);
        push_andx(&mut words);
        put_u16(&mut words, self.fid);
        put_u32(&mut words, self.offset as u32);
        put_u16(&mut words, self.max_count);
        put_u16(&mut words, self.max_count); // MinCount
        put_u32(&mut words, 0); // Timeout
        put_u16(&mut words, 0); // Remaining
        put_u32(&mut words, (self.offset >> 32) as u32);
        SMB1Body::new(words, Vec::new()).encode()
    }
}

/// MS-CIFS 2.2.4.42.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1ReadResponse {
    pub data: Vec<u8>,
}

impl SMB1ReadResponse {
    /// `message` is the whole frame after the header; data offsets
    /// count from the header start.
    pub fn parse(message: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(message)?;
        check_word_count(&body, 12, "read")?;
        let mut words = ByteReader::new(&body.words);
        words.skip(4)?; // AndX
        words.skip(6)?; // Available + DataCompactionMode + Reserved1
        let data_length = words.u16()? as usize;
        let data_offset = words.u16()? as usize;
        let start = data_offset
            .checked_sub(SMB1_HEADER_SIZE)
            .ok_or_else(|| SMBError::parse_error("Data offset inside the header"))?;
        if start + data_length > message.len() {
            return Err(SMBError::parse_error("Read data extends past the message"));
        }
        Ok(Self {
            data: message[start..start + data_length].to_vec(),
        })
    }
}

/// MS-CIFS 2.2.4.43.1, the 64-bit-offset form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1WriteRequest {
    pub fid: u16,
    pub offset: u64,
    pub data: Vec<u8>,
}

impl SMB1WriteRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(28);
        push_andx(&mut words);
        put_u16(&mut words, self.fid);
        put_u32(&mut words, self.offset as u32);
        put_u32(&mut words, 0); // Timeout
        put_u16(&mut words, 0); // WriteMode
        put_u16(&mut words, 0); // Remaining
        put_u16(&mut words, 0); // DataLengthHigh
        put_u16(&mut words, self.data.len() as u16);
        // pad byte + header(32) + word count(1) + words(28) + byte count(2)
        put_u16(&mut words, (SMB1_HEADER_SIZE + 1 + 28 + 2 + 1) as u16);
        put_u32(&mut words, (self.offset >> 32) as u32);

        let mut data = Vec::with_capacity(1 + self.data.len());
        data.push(0); // pad
        data.extend_from_slice(&self.data);
        SMB1Body::new(words, data).encode()
    }
}

/// MS-CIFS 2.2.4.43.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1WriteResponse {
    pub count: u32,
}

impl SMB1WriteResponse {
    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let body = SMB1Body::parse(input)?;
        check_word_count(&body, 6, "write")?;
        let mut words = ByteReader::new(&body.words);
        words.skip(4)?; // AndX
        let count = words.u16()? as u32;
        Ok(Self { count })
    }
}

/// MS-CIFS 2.2.4.5.1. The response carries no parameters.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1CloseRequest {
    pub fid: u16,
}

impl SMB1CloseRequest {
    pub fn encode(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(6);
        put_u16(&mut words, self.fid);
        put_u32(&mut words, 0xFFFF_FFFF); // LastTimeModified: unspecified
        SMB1Body::new(words, Vec::new()).encode()
    }
}
