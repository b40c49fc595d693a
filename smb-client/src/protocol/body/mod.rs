mod capabilities;
mod close;
mod create;
mod dialect;
mod empty;
mod error;
mod file_info;
mod filetime;
mod flush;
mod ioctl;
mod negotiate;
mod query_directory;
mod query_info;
mod read;
mod security_mode;
mod session_setup;
mod set_info;
mod tree_connect;
mod write;

pub use capabilities::Capabilities;
pub use close::{SMBCloseRequest, SMBCloseResponse, CLOSE_FLAG_POSTQUERY_ATTRIB};
pub use create::{
    CreateDisposition, CreateOptions, FileAttributes, ShareAccess, SMBCreateRequest,
    SMBCreateResponse,
};
pub use dialect::SMBDialect;
pub use empty::SMBEmpty;
pub use error::SMBErrorResponse;
pub use file_info::{
    FileBasicInformation, FileDirectoryInformation, FileDispositionInformation,
    FileEndOfFileInformation, FileInformationClass, FileRenameInformation,
    FileStandardInformation,
};
pub use filetime::FileTime;
pub use flush::SMBFlushRequest;
pub use ioctl::{SMBIoctlRequest, SMBIoctlResponse};
pub use negotiate::{
    EncryptionCipher, NegotiateSecurityMode, SMBNegotiateRequest, SMBNegotiateResponse,
    PREAUTH_INTEGRITY_SHA512,
};
pub use query_directory::{QueryDirectoryFlags, SMBQueryDirectoryRequest, SMBQueryDirectoryResponse};
pub use query_info::{QueryInfoType, SMBQueryInfoRequest, SMBQueryInfoResponse};
pub use read::{SMBReadRequest, SMBReadResponse};
pub use security_mode::SessionSetupSecurityMode;
pub use session_setup::{SessionFlags, SMBSessionSetupRequest, SMBSessionSetupResponse};
pub use set_info::{SMBSetInfoRequest, SMBSetInfoResponse};
pub use tree_connect::{ShareFlags, ShareType, SMBTreeConnectRequest, SMBTreeConnectResponse};
pub use write::{SMBWriteRequest, SMBWriteResponse};
