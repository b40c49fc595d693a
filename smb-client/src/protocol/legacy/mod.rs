//! SMB1 command bodies. Every legacy message after the 32-byte header
//! is a word-count-prefixed parameter block followed by a
//! byte-count-prefixed data block; `SMB1Body` owns that framing.

mod file_ops;
mod negotiate;
mod session_setup;
mod trans2;
mod tree_connect;

pub use file_ops::{
    SMB1CloseRequest, SMB1NtCreateRequest, SMB1NtCreateResponse, SMB1ReadRequest,
    SMB1ReadResponse, SMB1WriteRequest, SMB1WriteResponse,
};
pub use negotiate::{
    SMB1NegotiateRequest, SMB1NegotiateResponse, CAP_EXTENDED_SECURITY, CAP_NT_SMBS,
    CAP_RPC_REMOTE_APIS, CAP_STATUS32, CAP_UNICODE, NT_LM_0_12,
};
pub use session_setup::{
    SMB1SessionSetupExtendedRequest, SMB1SessionSetupExtendedResponse,
    SMB1SessionSetupRequest, SMB1SessionSetupResponse,
};
pub use trans2::{
    SMB1FindFirst2Request, SMB1FindFirst2Response, SMB1FindNext2Request, SMB1FindNext2Response,
    SMB1Transaction2Request, SMB1Transaction2Response, TRANS2_FIND_FIRST2, TRANS2_FIND_NEXT2,
};
pub use tree_connect::{SMB1TreeConnectRequest, SMB1TreeConnectResponse};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::{put_u16, ByteReader};

/// No chained AndX command.
pub const ANDX_NONE: u8 = 0xFF;

/// Parameter words plus data bytes of one legacy command.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SMB1Body {
    pub words: Vec<u8>,
    pub data: Vec<u8>,
}

impl SMB1Body {
    pub fn new(words: Vec<u8>, data: Vec<u8>) -> Self {
        Self { words, data }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(3 + self.words.len() + self.data.len());
        out.push((self.words.len() / 2) as u8);
        out.extend_from_slice(&self.words);
        put_u16(&mut out, self.data.len() as u16);
        out.extend_from_slice(&self.data);
        out
    }

    pub fn parse(input: &[u8]) -> SMBResult<Self> {
        let mut reader = ByteReader::new(input);
        let word_count = reader.u8()? as usize;
        let words = reader.bytes(word_count * 2)?.to_vec();
        let byte_count = reader.u16()? as usize;
        let data = reader.bytes(byte_count)?.to_vec();
        Ok(Self { words, data })
    }
}

/// AndX prologue shared by the chained commands. Chaining itself is
/// never used, so the follow-on command is always ANDX_NONE.
pub(crate) fn push_andx(words: &mut Vec<u8>) {
    words.push(ANDX_NONE);
    words.push(0); // AndXReserved
    put_u16(words, 0); // AndXOffset
}

pub(crate) fn check_word_count(body: &SMB1Body, expected: usize, what: &str) -> SMBResult<()> {
    if body.words.len() != expected * 2 {
        return Err(SMBError::parse_error(format!(
            "Bad word count in {} response",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_round_trip() {
        let body = SMB1Body::new(vec![1, 2, 3, 4], vec![9, 9]);
        let bytes = body.encode();
        assert_eq!(bytes[0], 2); // word count in 16-bit words
        assert_eq!(SMB1Body::parse(&bytes).unwrap(), body);
    }

    #[test]
    fn truncated_data_block_is_rejected() {
        let mut bytes = SMB1Body::new(vec![], vec![1, 2, 3]).encode();
        bytes.truncate(bytes.len() - 1);
        assert!(SMB1Body::parse(&bytes).is_err());
    }
}
