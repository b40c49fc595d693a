use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::time::Duration;

use crate::nt_status::NTStatus;

/// Client-side SMB error taxonomy.
///
/// Protocol-level failures are carried as values, never panics; the only
/// panicking paths in the workspace are programming errors in tests.
#[derive(Debug)]
pub enum SMBError {
    Connection(SMBConnectionError),
    Status(SMBStatusError),
    Timeout(SMBTimeoutError),
    Canceled(SMBCanceledError),
    InsufficientCredits(SMBInsufficientCreditsError),
    Authentication(SMBAuthenticationError),
    NotSupported(SMBNotSupportedError),
    Parse(SMBParseError),
    Crypto(SMBCryptoError),
    Io(SMBIoError),
}

impl SMBError {
    pub fn connection<T: Into<SMBConnectionError>>(error: T) -> Self {
        Self::Connection(error.into())
    }

    pub fn status(status: NTStatus) -> Self {
        Self::Status(SMBStatusError { status })
    }

    pub fn timeout(waited: Duration) -> Self {
        Self::Timeout(SMBTimeoutError { waited })
    }

    pub fn canceled() -> Self {
        Self::Canceled(SMBCanceledError)
    }

    pub fn insufficient_credits(charge: u16, available: u16) -> Self {
        Self::InsufficientCredits(SMBInsufficientCreditsError { charge, available })
    }

    pub fn authentication<T: Into<SMBAuthenticationError>>(error: T) -> Self {
        Self::Authentication(error.into())
    }

    pub fn not_supported<T: Into<SMBNotSupportedError>>(error: T) -> Self {
        Self::NotSupported(error.into())
    }

    pub fn parse_error<T: Into<SMBParseError>>(error: T) -> Self {
        Self::Parse(error.into())
    }

    pub fn crypto_error<T: Into<SMBCryptoError>>(error: T) -> Self {
        Self::Crypto(error.into())
    }

    pub fn io_error<T: Into<io::Error>>(error: T) -> Self {
        Self::Io(SMBIoError { error: error.into() })
    }

    /// The non-success status wrapped by this error, if it is a status error.
    pub fn as_status(&self) -> Option<NTStatus> {
        match self {
            Self::Status(x) => Some(x.status),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct SMBConnectionError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBConnectionError {
    fn from(value: T) -> Self {
        Self { message: value.into() }
    }
}

impl Display for SMBConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Connection failure: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBStatusError {
    status: NTStatus,
}

impl SMBStatusError {
    pub fn status(&self) -> NTStatus {
        self.status
    }
}

impl Display for SMBStatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Server returned non-success status: {:?}", self.status)
    }
}

#[derive(Debug)]
pub struct SMBTimeoutError {
    waited: Duration,
}

impl Display for SMBTimeoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "No response within {}ms", self.waited.as_millis())
    }
}

#[derive(Debug)]
pub struct SMBCanceledError;

impl Display for SMBCanceledError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation was canceled by the caller")
    }
}

#[derive(Debug)]
pub struct SMBInsufficientCreditsError {
    pub charge: u16,
    pub available: u16,
}

impl Display for SMBInsufficientCreditsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Request requires {} credits but only {} are available",
            self.charge, self.available
        )
    }
}

#[derive(Debug)]
pub struct SMBAuthenticationError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBAuthenticationError {
    fn from(value: T) -> Self {
        Self { message: value.into() }
    }
}

impl Display for SMBAuthenticationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authentication failed: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBNotSupportedError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBNotSupportedError {
    fn from(value: T) -> Self {
        Self { message: value.into() }
    }
}

impl Display for SMBNotSupportedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Not available in the negotiated dialect/session: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBParseError {
    error: Box<dyn Error + Send + Sync>,
}

impl<T: Into<Box<dyn Error + Send + Sync>>> From<T> for SMBParseError {
    fn from(value: T) -> Self {
        Self { error: value.into() }
    }
}

impl Display for SMBParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse failed with error: {}", self.error)
    }
}

#[derive(Debug)]
pub struct SMBCryptoError {
    message: String,
}

impl<T: Into<String>> From<T> for SMBCryptoError {
    fn from(value: T) -> Self {
        Self { message: value.into() }
    }
}

impl Display for SMBCryptoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Crypto operation failed with error: {}", self.message)
    }
}

#[derive(Debug)]
pub struct SMBIoError {
    error: io::Error,
}

impl Display for SMBIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SMB I/O operation failed with error: {}", self.error)
    }
}

impl Display for SMBError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(x) => write!(f, "{}", x),
            Self::Status(x) => write!(f, "{}", x),
            Self::Timeout(x) => write!(f, "{}", x),
            Self::Canceled(x) => write!(f, "{}", x),
            Self::InsufficientCredits(x) => write!(f, "{}", x),
            Self::Authentication(x) => write!(f, "{}", x),
            Self::NotSupported(x) => write!(f, "{}", x),
            Self::Parse(x) => write!(f, "{}", x),
            Self::Crypto(x) => write!(f, "{}", x),
            Self::Io(x) => write!(f, "{}", x),
        }
    }
}

impl Error for SMBError {}

impl From<io::Error> for SMBError {
    fn from(value: io::Error) -> Self {
        Self::io_error(value)
    }
}
