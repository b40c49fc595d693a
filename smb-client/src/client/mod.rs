use std::net::IpAddr;
use std::time::Duration;

use derive_builder::Builder;
use tokio_util::sync::CancellationToken;

use smb_client_core::SMBResult;

use crate::protocol::body::SMBDialect;

pub mod connection;
pub mod credit;
pub mod directory;
pub mod file_store;
pub mod security;
pub mod smb1;
pub mod smb2;

pub use connection::{CorrelationKey, SMBConnection};
pub use file_store::{
    SMB1FileStore, SMB2FileStore, SMBClientFactory, SMBClientKind, SMBFileHandle, SMBFileStore,
    SMBGenericClient, SMBGenericFileStore,
};
pub use smb1::SMB1Client;
pub use smb2::SMB2Client;

/// Which transport carries the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SMBTransport {
    DirectTcp,
    NetBios,
}

impl SMBTransport {
    pub fn port(&self) -> u16 {
        match self {
            SMBTransport::DirectTcp => 445,
            SMBTransport::NetBios => 139,
        }
    }
}

/// How the legacy dialect authenticates when the server does not offer
/// extended security. Extended-security sessions always use the NTLM
/// token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    NtlmV1,
    NtlmV1ExtendedSessionSecurity,
    NtlmV2,
}

/// Caller-supplied settings. Nothing is read from files or the
/// environment.
#[derive(Debug, Clone, Builder)]
#[builder(name = "SMBClientConfigBuilder", pattern = "owned")]
pub struct SMBClientConfig {
    /// How long to wait for each response before settling the request
    /// with a timeout error.
    #[builder(default = "Duration::from_millis(5000)")]
    pub response_timeout: Duration,
    /// Dialects offered during negotiation, oldest first.
    #[builder(default = "SMBDialect::all().to_vec()")]
    pub dialects: Vec<SMBDialect>,
    /// Transports a connect call may use.
    #[builder(default = "vec![SMBTransport::DirectTcp, SMBTransport::NetBios]")]
    pub transports: Vec<SMBTransport>,
    /// Connect to this port instead of the transport's well-known one.
    #[builder(default)]
    pub port_override: Option<u16>,
    /// Refuse to fall back to the challenge/response handshake when the
    /// legacy server does not offer extended security.
    #[builder(default = "false")]
    pub force_extended_security: bool,
    #[builder(default = "AuthMethod::NtlmV2")]
    pub auth_method: AuthMethod,
    /// Calling name for the NetBIOS session request.
    #[builder(default = "String::from(\"SMBCLIENT\")")]
    pub client_name: String,
}

impl Default for SMBClientConfig {
    fn default() -> Self {
        match SMBClientConfigBuilder::default().build() {
            Ok(config) => config,
            // every field has a default, build cannot fail
            Err(_) => unreachable!(),
        }
    }
}

/// One dialect family's client strategy. Both implementations share the
/// connection, credit and security machinery underneath.
pub trait SMBClient {
    type FileStore: SMBFileStore;

    /// Opens the transport. Ok(false) means the server refused the
    /// connection (or the NetBIOS session), not that something broke.
    fn connect(
        &mut self,
        address: IpAddr,
        transport: SMBTransport,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<bool>> + Send;

    /// Negotiates (if not yet done) and runs the authentication rounds.
    fn login(
        &mut self,
        domain: &str,
        user: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<()>> + Send;

    fn logoff(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<()>> + Send;

    fn tree_connect(
        &mut self,
        share: &str,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<Self::FileStore>> + Send;

    fn disconnect(&mut self) -> impl std::future::Future<Output = ()> + Send;

    fn max_read_size(&self) -> u32;

    fn max_write_size(&self) -> u32;

    fn is_connected(&self) -> bool;
}
