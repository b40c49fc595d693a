use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// NT status codes a client observes in SMB response headers.
#[repr(u32)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TryFromPrimitive, Copy)]
pub enum NTStatus {
    StatusSuccess = 0x0,
    StatusPending = 0x00000103,
    SecIContinueNeeded = 0x00090312,
    BufferOverflow = 0x80000005,
    NoMoreFiles = 0x80000006,
    SecEInvalidToken = 0x80090308,
    MoreProcessingRequired = 0xC0000016,
    InvalidParameter = 0xC000000D,
    InvalidSMB = 0x00010002,
    EndOfFile = 0xC0000011,
    AccessDenied = 0xC0000022,
    ObjectNameNotFound = 0xC0000034,
    ObjectNameCollision = 0xC0000035,
    ObjectPathNotFound = 0xC000003A,
    SharingViolation = 0xC0000043,
    DeletePending = 0xC0000056,
    StatusLogonFailure = 0xC000006D,
    InsufficientResources = 0xC000009A,
    PipeNotAvailable = 0xC00000AC,
    StatusNotSupported = 0xC00000BB,
    BadNetworkName = 0xC00000CC,
    RequestNotAccepted = 0xC00000D0,
    DirectoryNotEmpty = 0xC0000101,
    NotADirectory = 0xC0000103,
    Cancelled = 0xC0000120,
    FileClosed = 0xC0000128,
    UserSessionDeleted = 0xC0000203,
    NetworkSessionExpired = 0xC000035C,
    FileIsADirectory = 0xC00000BA,
    NoSuchFile = 0xC000000F,
    UnknownError = 0xFFFFFFFF,
}

impl NTStatus {
    /// Severity bits 30-31: 0b11 marks an error-class status.
    pub fn is_error(&self) -> bool {
        (*self as u32) >> 30 == 0b11
    }

    pub fn is_success(&self) -> bool {
        *self == NTStatus::StatusSuccess
    }

    /// Decodes a raw status, folding codes this client never acts on into
    /// `UnknownError` rather than failing the whole header parse.
    pub fn from_raw(raw: u32) -> Self {
        Self::try_from_primitive(raw).unwrap_or(NTStatus::UnknownError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_classification() {
        assert!(!NTStatus::StatusSuccess.is_error());
        assert!(NTStatus::MoreProcessingRequired.is_error());
        assert!(NTStatus::AccessDenied.is_error());
        assert!(NTStatus::StatusLogonFailure.is_error());
        assert!(!NTStatus::BufferOverflow.is_error());
        assert!(!NTStatus::NoMoreFiles.is_error());
    }

    #[test]
    fn raw_round_trip_and_fallback() {
        assert_eq!(NTStatus::from_raw(0), NTStatus::StatusSuccess);
        assert_eq!(NTStatus::from_raw(0xC0000016), NTStatus::MoreProcessingRequired);
        assert_eq!(NTStatus::from_raw(0xDEADBEEF), NTStatus::UnknownError);
    }
}
