//! Transaction2 envelope and the FindFirst2/FindNext2 subcommands
//! backing directory listing on the legacy dialect (MS-CIFS 2.2.4.46,
//! 2.2.6.2, 2.2.6.3).

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, put_u32, to_utf16le, ByteReader};
use crate::protocol::header::SMB1_HEADER_SIZE;
use crate::protocol::legacy::SMB1Body;

pub const TRANS2_FIND_FIRST2: u16 = 0x0001;
pub const TRANS2_FIND_NEXT2: u16 = 0x0002;

/// SMB_FIND_FILE_DIRECTORY_INFO, the same entry layout query directory
/// uses on the modern dialect.
pub const FIND_FILE_DIRECTORY_INFO: u16 = 0x0101;

// hidden + system + directory, so listings include every entry kind
const SEARCH_ATTRIBUTES: u16 = 0x0016;
const SEARCH_COUNT: u16 = 64;
const FIND_CLOSE_AT_EOS: u16 = 0x0002;
const FIND_CONTINUE_FROM_LAST: u16 = 0x0008;

const MAX_PARAMETER_COUNT: u16 = 256;
const MAX_DATA_COUNT: u16 = 16384;

fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

/// One-fragment Transaction2 request: a subcommand with its parameter
/// and data blocks.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1Transaction2Request {
    pub subcommand: u16,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl SMB1Transaction2Request {
    pub fn encode(&self) -> Vec<u8> {
        // the name byte sits first in the byte block; offsets count
        // from the start of the 32-byte header
        let block_start = SMB1_HEADER_SIZE + 1 + 30 + 2;
        let parameter_offset = align4(block_start + 1);
        let data_offset = align4(parameter_offset + self.parameters.len());

        let mut words = Vec::with_capacity(30);
        put_u16(&mut words, self.parameters.len() as u16);
        put_u16(&mut words, self.data.len() as u16);
        put_u16(&mut words, MAX_PARAMETER_COUNT);
        put_u16(&mut words, MAX_DATA_COUNT);
        words.push(0); // MaxSetupCount
        words.push(0); // reserved
        put_u16(&mut words, 0); // Flags
        put_u32(&mut words, 0); // Timeout
        put_u16(&mut words, 0); // reserved
        put_u16(&mut words, self.parameters.len() as u16);
        put_u16(&mut words, parameter_offset as u16);
        put_u16(&mut words, self.data.len() as u16);
        put_u16(&mut words, data_offset as u16);
        words.push(1); // SetupCount
        words.push(0); // reserved
        put_u16(&mut words, self.subcommand);

        let mut bytes = vec![0u8]; // transaction name
        bytes.resize(parameter_offset - block_start, 0);
        bytes.extend_from_slice(&self.parameters);
        bytes.resize(data_offset - block_start, 0);
        bytes.extend_from_slice(&self.data);
        SMB1Body::new(words, bytes).encode()
    }
}

/// Parameter and data blocks of a Transaction2 response. `body` is the
/// message after the header; block offsets count from the header, so
/// they are shifted before slicing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1Transaction2Response {
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl SMB1Transaction2Response {
    pub fn parse(body: &[u8]) -> SMBResult<Self> {
        let parsed = SMB1Body::parse(body)?;
        let mut words = ByteReader::new(&parsed.words);
        let total_parameter_count = words.u16()?;
        let total_data_count = words.u16()?;
        words.skip(2)?; // reserved
        let parameter_count = words.u16()?;
        let parameter_offset = words.u16()? as usize;
        words.skip(2)?; // ParameterDisplacement
        let data_count = words.u16()?;
        let data_offset = words.u16()? as usize;
        if parameter_count < total_parameter_count || data_count < total_data_count {
            return Err(SMBError::parse_error("Fragmented transaction response"));
        }
        Ok(Self {
            parameters: block(body, parameter_offset, parameter_count as usize)?,
            data: block(body, data_offset, data_count as usize)?,
        })
    }
}

fn block(body: &[u8], offset: usize, length: usize) -> SMBResult<Vec<u8>> {
    if length == 0 {
        return Ok(Vec::new());
    }
    let start = offset
        .checked_sub(SMB1_HEADER_SIZE)
        .ok_or_else(|| SMBError::parse_error("Transaction block offset inside the header"))?;
    body.get(start..start + length)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| SMBError::parse_error("Transaction block extends past the message"))
}

/// MS-CIFS 2.2.6.2.1.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1FindFirst2Request {
    pub pattern: String,
}

impl SMB1FindFirst2Request {
    /// The FindFirst2 parameter block; wrap it in a
    /// [`SMB1Transaction2Request`] with [`TRANS2_FIND_FIRST2`].
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u16(&mut out, SEARCH_ATTRIBUTES);
        put_u16(&mut out, SEARCH_COUNT);
        put_u16(&mut out, FIND_CLOSE_AT_EOS);
        put_u16(&mut out, FIND_FILE_DIRECTORY_INFO);
        put_u32(&mut out, 0); // SearchStorageType
        out.extend_from_slice(&to_utf16le(&self.pattern));
        out.extend_from_slice(&[0, 0]);
        out
    }
}

/// MS-CIFS 2.2.6.2.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1FindFirst2Response {
    pub sid: u16,
    pub search_count: u16,
    pub end_of_search: bool,
}

impl SMB1FindFirst2Response {
    pub fn parse(parameters: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(parameters);
        let sid = reader.u16()?;
        let search_count = reader.u16()?;
        let end_of_search = reader.u16()? != 0;
        Ok(Self { sid, search_count, end_of_search })
    }
}

/// MS-CIFS 2.2.6.3.1.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1FindNext2Request {
    pub sid: u16,
}

impl SMB1FindNext2Request {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u16(&mut out, self.sid);
        put_u16(&mut out, SEARCH_COUNT);
        put_u16(&mut out, FIND_FILE_DIRECTORY_INFO);
        put_u32(&mut out, 0); // ResumeKey
        put_u16(&mut out, FIND_CLOSE_AT_EOS | FIND_CONTINUE_FROM_LAST);
        out.extend_from_slice(&[0, 0]); // empty FileName
        out
    }
}

/// MS-CIFS 2.2.6.3.2.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SMB1FindNext2Response {
    pub search_count: u16,
    pub end_of_search: bool,
}

impl SMB1FindNext2Response {
    pub fn parse(parameters: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(parameters);
        let search_count = reader.u16()?;
        let end_of_search = reader.u16()? != 0;
        Ok(Self { search_count, end_of_search })
    }
}
