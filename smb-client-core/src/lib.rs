//! Support crate for the async SMB client: error taxonomy, NT status codes
//! and feature-gated logging macros. No I/O lives here.

use error::SMBError;

pub mod error;
pub mod logging;
pub mod nt_status;

pub type SMBResult<T, E = SMBError> = Result<T, E>;
