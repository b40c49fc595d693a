use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use smb_client_core::error::SMBError;
use smb_client_core::logging::{debug, trace};
use smb_client_core::nt_status::NTStatus;
use smb_client_core::SMBResult;

use crate::auth::NtlmClient;
use crate::client::connection::{CorrelationKey, SMBConnection};
use crate::client::file_store::SMB2FileStore;
use crate::client::{SMBClient, SMBClientConfig, SMBTransport};
use crate::protocol::body::{
    Capabilities, EncryptionCipher, NegotiateSecurityMode, SMBDialect, SMBEmpty,
    SMBNegotiateRequest, SMBNegotiateResponse, SMBSessionSetupRequest, SMBSessionSetupResponse,
    SMBTreeConnectRequest, SMBTreeConnectResponse, SessionFlags, SessionSetupSecurityMode,
    ShareFlags,
};
use crate::protocol::header::{SMB2Command, SMB2Header, SMB2_HEADER_SIZE};

/// Client-side ceiling on the negotiated transfer sizes.
const CLIENT_MAX_TRANSFER_SIZE: u32 = 1_048_576;

/// The send path shared by the client and its file stores: credit
/// charging, header assembly, signing/sealing and the response wait.
#[derive(Clone)]
pub(crate) struct SMB2Channel {
    connection: Arc<SMBConnection>,
    transport: SMBTransport,
    timeout: Duration,
    pub dialect: Option<SMBDialect>,
    pub session_id: u64,
}

impl SMB2Channel {
    fn new(connection: Arc<SMBConnection>, transport: SMBTransport, timeout: Duration) -> Self {
        Self {
            connection,
            transport,
            timeout,
            dialect: None,
            session_id: 0,
        }
    }

    /// Sends one command and awaits its response. `credit_bytes` is the
    /// transfer size the request reserves credits for; zero for
    /// commands that move no bulk data.
    pub(crate) async fn transact(
        &self,
        command: SMB2Command,
        tree_id: u32,
        payload: &[u8],
        credit_bytes: usize,
        cancel: &CancellationToken,
    ) -> SMBResult<(SMB2Header, Vec<u8>)> {
        let single = self.dialect == Some(SMBDialect::V2_0_2)
            || self.transport == SMBTransport::NetBios;
        let handshake = matches!(command, SMB2Command::Negotiate | SMB2Command::SessionSetup);
        let session_id = self.session_id;
        // charging and id reservation run under the send permit so
        // message ids hit the wire in strictly increasing order
        let response = self
            .connection
            .exchange_with(
                |connection| {
                    let charge = if single {
                        connection.charge_single_credit()?
                    } else {
                        connection.charge_credits(credit_bytes)?
                    };
                    let advance = if charge.charge == 0 { 1 } else { charge.charge as u64 };
                    let message_id = connection.reserve_message_id(advance);

                    let mut header = SMB2Header::new_request(command);
                    header.credit_charge = charge.charge;
                    header.credits = charge.request;
                    header.message_id = message_id;
                    header.session_id = session_id;
                    header.tree_id = tree_id;
                    let mut frame = header.encode();
                    frame.extend_from_slice(payload);
                    let frame = connection
                        .with_security(|security| security.protect(frame, &header))?;
                    if handshake {
                        connection.with_security(|security| security.update_preauth(&frame));
                    }
                    trace!(?command, message_id, "sending request");
                    Ok((CorrelationKey::Modern(message_id), frame))
                },
                self.timeout,
                cancel,
            )
            .await?;
        let response_header = SMB2Header::parse(&response)?;
        // the transcript covers the negotiate response and every
        // session-setup round before the final one
        let hash_response = command == SMB2Command::Negotiate
            || (command == SMB2Command::SessionSetup
                && response_header.status() == NTStatus::MoreProcessingRequired);
        if hash_response {
            self.connection
                .with_security(|security| security.update_preauth(&response));
        }
        let body = response[SMB2_HEADER_SIZE..].to_vec();
        Ok((response_header, body))
    }

    pub(crate) fn connection(&self) -> &SMBConnection {
        &self.connection
    }
}

fn accept(header: &SMB2Header) -> SMBResult<()> {
    let status = header.status();
    if status.is_error() {
        Err(SMBError::status(status))
    } else {
        Ok(())
    }
}

/// Modern-dialect strategy client (2.0.2 through 3.1.1).
pub struct SMB2Client {
    config: SMBClientConfig,
    connection: Arc<SMBConnection>,
    client_guid: Uuid,
    channel: Option<SMB2Channel>,
    server_name: Option<String>,
    signing_required: bool,
    logged_in: bool,
    max_transact_size: u32,
    max_read_size: u32,
    max_write_size: u32,
}

impl SMB2Client {
    pub fn new(config: SMBClientConfig) -> Self {
        Self {
            config,
            connection: Arc::new(SMBConnection::new()),
            client_guid: Uuid::new_v4(),
            channel: None,
            server_name: None,
            signing_required: false,
            logged_in: false,
            max_transact_size: 0,
            max_read_size: 0,
            max_write_size: 0,
        }
    }

    pub fn dialect(&self) -> Option<SMBDialect> {
        self.channel.as_ref().and_then(|channel| channel.dialect)
    }

    fn channel(&self) -> SMBResult<&SMB2Channel> {
        self.channel
            .as_ref()
            .ok_or_else(|| SMBError::connection("Not connected"))
    }

    async fn negotiate(&mut self, cancel: &CancellationToken) -> SMBResult<()> {
        self.connection.with_security(|security| {
            security.reset();
            security.start_preauth();
        });
        let request = SMBNegotiateRequest::new(self.config.dialects.clone(), self.client_guid);
        let payload = request.encode();
        let channel = self.channel()?.clone();
        let (header, body) = channel
            .transact(SMB2Command::Negotiate, 0, &payload, 0, cancel)
            .await?;
        accept(&header)?;
        let response = SMBNegotiateResponse::parse(&body)?;
        if !self.config.dialects.contains(&response.dialect) {
            return Err(SMBError::connection("Server chose a dialect that was not offered"));
        }
        let dialect = response.dialect;
        debug!(?dialect, "dialect negotiated");
        self.signing_required = response
            .security_mode
            .contains(NegotiateSecurityMode::NEGOTIATE_SIGNING_REQUIRED);
        self.max_transact_size = response.max_transact_size.min(CLIENT_MAX_TRANSFER_SIZE);
        self.max_read_size = response.max_read_size.min(CLIENT_MAX_TRANSFER_SIZE);
        self.max_write_size = response.max_write_size.min(CLIENT_MAX_TRANSFER_SIZE);

        // 3.1.1 negotiates its cipher through contexts; 3.0.x implies
        // AES-128-CCM when both sides support encryption
        let cipher = match dialect {
            SMBDialect::V3_1_1 => response.cipher,
            SMBDialect::V3_0_0 | SMBDialect::V3_0_2
                if response.capabilities.contains(Capabilities::ENCRYPTION) =>
            {
                Some(EncryptionCipher::AES128CCM)
            }
            _ => None,
        };
        self.connection.with_security(|security| {
            security.dialect = Some(dialect);
            security.cipher = cipher;
            if dialect != SMBDialect::V3_1_1 {
                security.preauth_hash = None;
            }
        });
        if let Some(channel) = self.channel.as_mut() {
            channel.dialect = Some(dialect);
        }
        Ok(())
    }
}

impl SMBClient for SMB2Client {
    type FileStore = SMB2FileStore;

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
        self.channel = Some(SMB2Channel::new(
            Arc::clone(&self.connection),
            transport,
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
        if self.dialect().is_none() {
            self.negotiate(cancel).await?;
        }
        let ntlm = NtlmClient::new(user.to_string(), domain.to_string(), password.to_string());
        let mut token = ntlm.negotiate_token();
        let mut session_key = None;
        loop {
            let request =
                SMBSessionSetupRequest::new(SessionSetupSecurityMode::SIGNING_ENABLED, token);
            let payload = request.encode();
            let channel = self.channel()?.clone();
            let (header, body) = channel
                .transact(SMB2Command::SessionSetup, 0, &payload, 0, cancel)
                .await?;
            // the session id is assigned on the first round and must be
            // echoed on every following one
            if let Some(channel) = self.channel.as_mut() {
                channel.session_id = header.session_id;
            }
            match header.status() {
                NTStatus::MoreProcessingRequired => {
                    let response = SMBSessionSetupResponse::parse(&body)?;
                    let outcome = ntlm.authenticate_token(&response.security_buffer)?;
                    session_key = Some(outcome.session_key);
                    token = outcome.token;
                }
                NTStatus::StatusSuccess => {
                    let response = SMBSessionSetupResponse::parse(&body)?;
                    let anonymous = response
                        .session_flags
                        .intersects(SessionFlags::IS_GUEST | SessionFlags::IS_NULL);
                    let session_id = header.session_id;
                    let signing_required = self.signing_required;
                    self.connection.with_security(|security| {
                        security.session_id = session_id;
                        security.encrypt_session =
                            response.session_flags.contains(SessionFlags::ENCRYPT_DATA);
                        let key = if anonymous { None } else { session_key.as_ref() };
                        security.session_established(key, signing_required)
                    })?;
                    if anonymous {
                        self.signing_required = false;
                    }
                    self.logged_in = true;
                    debug!(session_id, guest = anonymous, "session established");
                    return Ok(());
                }
                status => return Err(SMBError::status(status)),
            }
        }
    }

    async fn logoff(&mut self, cancel: &CancellationToken) -> SMBResult<()> {
        let channel = self.channel()?.clone();
        if channel.session_id == 0 {
            return Err(SMBError::connection("No session to log off"));
        }
        let (header, _) = channel
            .transact(SMB2Command::Logoff, 0, &SMBEmpty.encode(), 0, cancel)
            .await?;
        accept(&header)?;
        self.logged_in = false;
        if let Some(channel) = self.channel.as_mut() {
            channel.session_id = 0;
        }
        let dialect = self.dialect();
        self.connection.with_security(|security| {
            let cipher = security.cipher;
            security.reset();
            security.dialect = dialect;
            security.cipher = cipher;
        });
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
        let request = SMBTreeConnectRequest::new(path);
        let payload = request.encode();
        let channel = self.channel()?.clone();
        let (header, body) = channel
            .transact(SMB2Command::TreeConnect, 0, &payload, 0, cancel)
            .await?;
        accept(&header)?;
        let response = SMBTreeConnectResponse::parse(&body)?;
        let tree_id = header.tree_id;
        if response.share_flags.contains(ShareFlags::ENCRYPT_DATA) {
            self.connection
                .with_security(|security| security.mark_tree_encrypted(tree_id));
        }
        debug!(tree_id, "tree connected");
        Ok(SMB2FileStore::new(
            channel,
            tree_id,
            self.max_read_size,
            self.max_write_size,
            self.max_transact_size,
        ))
    }

    async fn disconnect(&mut self) {
        self.connection.disconnect().await;
        self.channel = None;
        self.server_name = None;
        self.signing_required = false;
        self.logged_in = false;
        self.max_transact_size = 0;
        self.max_read_size = 0;
        self.max_write_size = 0;
    }

    fn max_read_size(&self) -> u32 {
        self.max_read_size
    }

    fn max_write_size(&self) -> u32 {
        self.max_write_size
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}
