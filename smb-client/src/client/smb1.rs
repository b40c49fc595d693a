use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio_util::sync::CancellationToken;

use smb_client_core::error::SMBError;
use smb_client_core::logging::debug;
use smb_client_core::nt_status::NTStatus;
use smb_client_core::SMBResult;

use crate::auth::NtlmClient;
use crate::client::connection::{CorrelationKey, SMBConnection};
use crate::client::file_store::SMB1FileStore;
use crate::client::{AuthMethod, SMBClient, SMBClientConfig, SMBTransport};
use crate::crypto::ntlm;
use crate::protocol::body::FileTime;
use crate::protocol::header::{SMB1Command, SMB1Flags2, SMB1Header, SMB1_HEADER_SIZE};
use crate::protocol::legacy::{
    push_andx, SMB1Body, SMB1NegotiateRequest, SMB1NegotiateResponse,
    SMB1SessionSetupExtendedRequest, SMB1SessionSetupExtendedResponse, SMB1SessionSetupRequest,
    SMB1SessionSetupResponse, SMB1TreeConnectRequest, SMB1TreeConnectResponse, CAP_EXTENDED_SECURITY,
    CAP_NT_SMBS, CAP_RPC_REMOTE_APIS, CAP_STATUS32, CAP_UNICODE,
};

/// Largest transfer the legacy read/write commands carry per request.
const LEGACY_MAX_TRANSFER_SIZE: u32 = 65535;

/// The legacy send path: header assembly, PID/MID correlation and the
/// response wait. Shared with the legacy file store.
#[derive(Clone)]
pub(crate) struct SMB1Channel {
    connection: Arc<SMBConnection>,
    timeout: Duration,
    pid: u32,
    pub uid: u16,
    pub extended_security: bool,
}

impl SMB1Channel {
    pub(crate) fn new(connection: Arc<SMBConnection>, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
            pid: std::process::id(),
            uid: 0,
            extended_security: false,
        }
    }

    fn request_flags2(&self) -> SMB1Flags2 {
        let mut flags2 =
            SMB1Flags2::LONG_NAMES_ALLOWED | SMB1Flags2::NT_STATUS_CODE | SMB1Flags2::UNICODE;
        if self.extended_security {
            flags2 |= SMB1Flags2::EXTENDED_SECURITY;
        }
        flags2
    }

    pub(crate) async fn transact(
        &self,
        command: SMB1Command,
        tid: u16,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> SMBResult<(SMB1Header, Vec<u8>)> {
        let pid = self.pid;
        let flags2 = self.request_flags2();
        let uid = self.uid;
        // the mid is reserved under the send permit so multiplex ids
        // hit the wire in send order; legacy sends always advance the
        // id by one, whatever the size
        let response = self
            .connection
            .exchange_with(
                |connection| {
                    let mid = connection.reserve_message_id(1) as u16;
                    let mut header = SMB1Header::new_request(command, flags2);
                    header.pid = pid;
                    header.uid = uid;
                    header.tid = tid;
                    header.mid = mid;
                    let mut frame = header.encode();
                    frame.extend_from_slice(body);
                    Ok((CorrelationKey::Legacy { pid, mid }, frame))
                },
                self.timeout,
                cancel,
            )
            .await?;
        let response_header = SMB1Header::parse(&response)?;
        let body = response[SMB1_HEADER_SIZE..].to_vec();
        Ok((response_header, body))
    }
}

fn accept(header: &SMB1Header) -> SMBResult<()> {
    let status = header.status();
    if status.is_error() {
        Err(SMBError::status(status))
    } else {
        Ok(())
    }
}

/// Legacy-dialect strategy client (NT LM 0.12 only).
pub struct SMB1Client {
    config: SMBClientConfig,
    connection: Arc<SMBConnection>,
    channel: Option<SMB1Channel>,
    server_name: Option<String>,
    negotiated: Option<SMB1NegotiateResponse>,
    logged_in: bool,
}

impl SMB1Client {
    pub fn new(config: SMBClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(SMBConnection::new()),
            channel: None,
            server_name: None,
            negotiated: None,
            logged_in: false,
        }
    }

    fn channel(&self) -> SMBResult<&SMB1Channel> {
        self.channel
            .as_ref()
            .ok_or_else(|| SMBError::connection("Not connected"))
    }

    fn client_capabilities() -> u32 {
        CAP_UNICODE | CAP_NT_SMBS | CAP_STATUS32
    }

    async fn negotiate(&mut self, cancel: &CancellationToken) -> SMBResult<()> {
        let channel = self.channel()?.clone();
        let (header, body) = channel
            .transact(SMB1Command::Negotiate, 0, &SMB1NegotiateRequest.encode(), cancel)
            .await?;
        accept(&header)?;
        let response = SMB1NegotiateResponse::parse(&body)?;
        let required = CAP_NT_SMBS | CAP_RPC_REMOTE_APIS | CAP_STATUS32;
        if response.capabilities & required != required {
            return Err(SMBError::not_supported(
                "Server lacks the NT SMB, RPC or 32-bit status capabilities",
            ));
        }
        let extended = response.extended_security();
        debug!(extended, "legacy dialect negotiated");
        if let Some(channel) = self.channel.as_mut() {
            channel.extended_security = extended;
        }
        self.negotiated = Some(response);
        Ok(())
    }

    async fn login_extended(
        &mut self,
        negotiated: &SMB1NegotiateResponse,
        domain: &str,
        user: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<()> {
        let ntlm = NtlmClient::new(user.to_string(), domain.to_string(), password.to_string());
        let mut token = ntlm.negotiate_token();
        loop {
            let request = SMB1SessionSetupExtendedRequest {
                session_key: negotiated.session_key,
                capabilities: Self::client_capabilities() | CAP_EXTENDED_SECURITY,
                security_blob: token,
            };
            let channel = self.channel()?.clone();
            let (header, body) = channel
                .transact(SMB1Command::SessionSetupAndX, 0, &request.encode(), cancel)
                .await?;
            if let Some(channel) = self.channel.as_mut() {
                channel.uid = header.uid;
            }
            match header.status() {
                NTStatus::MoreProcessingRequired => {
                    let response = SMB1SessionSetupExtendedResponse::parse(&body)?;
                    let outcome = ntlm.authenticate_token(&response.security_blob)?;
                    token = outcome.token;
                }
                NTStatus::StatusSuccess => {
                    let response = SMB1SessionSetupExtendedResponse::parse(&body)?;
                    debug!(uid = header.uid, guest = response.guest, "session established");
                    return Ok(());
                }
                status => return Err(SMBError::status(status)),
            }
        }
    }

    async fn login_challenge_response(
        &mut self,
        negotiated: &SMB1NegotiateResponse,
        domain: &str,
        user: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<()> {
        let challenge = negotiated
            .challenge
            .ok_or_else(|| SMBError::authentication("Server sent no challenge"))?;
        let (lm_response, nt_response) = match self.config.auth_method {
            AuthMethod::NtlmV1 => {
                let (nt_response, _) = ntlm::compute_v1_response(password, &challenge)?;
                let lm_response = ntlm::compute_lm_v1_response(password, &challenge)?;
                (lm_response, nt_response)
            }
            AuthMethod::NtlmV1ExtendedSessionSecurity => {
                return Err(SMBError::not_supported(
                    "NTLMv1 session security requires extended security",
                ));
            }
            AuthMethod::NtlmV2 => {
                let mut client_challenge = [0u8; 8];
                rand::thread_rng().fill_bytes(&mut client_challenge);
                let v2 = ntlm::compute_v2_response(
                    password,
                    user,
                    domain,
                    &challenge,
                    &client_challenge,
                    FileTime::now().0,
                    &[],
                )?;
                (v2.lm_response, v2.nt_response)
            }
        };
        let request = SMB1SessionSetupRequest {
            session_key: negotiated.session_key,
            capabilities: Self::client_capabilities(),
            case_insensitive_password: lm_response,
            case_sensitive_password: nt_response,
            account_name: user.to_string(),
            domain_name: domain.to_string(),
        };
        let channel = self.channel()?.clone();
        let (header, body) = channel
            .transact(SMB1Command::SessionSetupAndX, 0, &request.encode(), cancel)
            .await?;
        accept(&header)?;
        let response = SMB1SessionSetupResponse::parse(&body)?;
        if let Some(channel) = self.channel.as_mut() {
            channel.uid = header.uid;
        }
        debug!(uid = header.uid, guest = response.guest, "session established");
        Ok(())
    }
}

impl SMBClient for SMB1Client {
    type FileStore = SMB1FileStore;

    async fn connect(
        &mut self,
        address: IpAddr,
        transport: SMBTransport,
        _cancel: &CancellationToken,
    ) -> SMBResult<bool> {
        if !self.config.transports.contains(&transport) {
            return Err(SMBError::not_supported("Transport not allowed by configuration"));
        }
        let port = self.config.port_override.unwrap_or_else(|| transport.port());
        let established = self
            .connection
            .establish(
                address,
                port,
                transport,
                &self.config.client_name,
                self.config.response_timeout,
            )
            .await?;
        if !established {
            return Ok(false);
        }
        self.server_name = Some(address.to_string());
        self.channel = Some(SMB1Channel::new(
            Arc::clone(&self.connection),
            self.config.response_timeout,
        ));
        Ok(true)
    }

    async fn login(
        &mut self,
        domain: &str,
        user: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<()> {
        if self.negotiated.is_none() {
            self.negotiate(cancel).await?;
        }
        let negotiated = self
            .negotiated
            .clone()
            .ok_or_else(|| SMBError::connection("Negotiation did not complete"))?;
        if negotiated.extended_security() {
            self.login_extended(&negotiated, domain, user, password, cancel)
                .await?;
        } else if self.config.force_extended_security {
            return Err(SMBError::not_supported("Server does not offer extended security"));
        } else {
            self.login_challenge_response(&negotiated, domain, user, password, cancel)
                .await?;
        }
        self.logged_in = true;
        Ok(())
    }

    async fn logoff(&mut self, cancel: &CancellationToken) -> SMBResult<()> {
        let channel = self.channel()?.clone();
        if !self.logged_in {
            return Err(SMBError::connection("No session to log off"));
        }
        let mut words = Vec::with_capacity(4);
        push_andx(&mut words);
        let body = SMB1Body::new(words, Vec::new()).encode();
        let (header, _) = channel
            .transact(SMB1Command::LogoffAndX, 0, &body, cancel)
            .await?;
        accept(&header)?;
        self.logged_in = false;
        if let Some(channel) = self.channel.as_mut() {
            channel.uid = 0;
        }
        Ok(())
    }

    async fn tree_connect(
        &mut self,
        share: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<Self::FileStore> {
        if !self.logged_in {
            return Err(SMBError::connection("Not logged in"));
        }
        let server = self
            .server_name
            .clone()
            .ok_or_else(|| SMBError::connection("Not connected"))?;
        let path = format!(r"\\{}\{}", server, share);
        let request = SMB1TreeConnectRequest::new(path);
        let channel = self.channel()?.clone();
        let (header, body) = channel
            .transact(SMB1Command::TreeConnectAndX, 0, &request.encode(), cancel)
            .await?;
        accept(&header)?;
        let _response = SMB1TreeConnectResponse::parse(&body)?;
        debug!(tid = header.tid, "tree connected");
        Ok(SMB1FileStore::new(channel, header.tid))
    }

    async fn disconnect(&mut self) {
        self.connection.disconnect().await;
        self.channel = None;
        self.server_name = None;
        self.negotiated = None;
        self.logged_in = false;
    }

    fn max_read_size(&self) -> u32 {
        LEGACY_MAX_TRANSFER_SIZE
    }

    fn max_write_size(&self) -> u32 {
        LEGACY_MAX_TRANSFER_SIZE
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}
