use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use smb_client_core::error::SMBError;
use smb_client_core::logging::{debug, warn};
use smb_client_core::SMBResult;

use crate::client::credit::{CreditCharge, CreditPool};
use crate::client::security::SecurityContext;
use crate::client::SMBTransport;
use crate::netbios::packet::{SessionPacket, SessionPacketType, SMBSERVER_NAME};
use crate::netbios::{node_status_query, SessionReceiveBuffer};
use crate::protocol::header::{
    SMB1Command, SMB1Header, SMB2Header, LEGACY_OPLOCK_BREAK_MID, SMB1_PROTOCOL_ID,
    SMB2_PROTOCOL_ID, UNSOLICITED_MESSAGE_ID,
};

const STATUS_PENDING: u32 = 0x0000_0103;

/// Identifies which request a received frame answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationKey {
    /// SMB2 message id.
    Modern(u64),
    /// SMB1 process id and multiplex id pair.
    Legacy { pid: u32, mid: u16 },
}

struct PendingRequest {
    key: CorrelationKey,
    sender: oneshot::Sender<Vec<u8>>,
}

/// Locks that must never observe a poisoned state: a panicked holder
/// leaves plain data behind, which is safe to keep using.
fn relock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct ConnectionInner {
    connected: AtomicBool,
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Single-slot correlation table; settling takes the slot, so the
    /// first settler wins the race between response, cancel and
    /// timeout.
    pending: StdMutex<Option<PendingRequest>>,
    /// Serializes requests: the protocol allows one in flight.
    send_permit: Mutex<()>,
    credits: StdMutex<CreditPool>,
    next_message_id: StdMutex<u64>,
    security: StdMutex<SecurityContext>,
    /// Stops the receive loop of the current establishment; replaced on
    /// every establish() so a disconnected connection can be reused.
    shutdown: StdMutex<CancellationToken>,
}

/// One transport connection: socket halves, the receive loop and the
/// correlation state both dialect families share.
pub struct SMBConnection {
    inner: Arc<ConnectionInner>,
    receive_task: StdMutex<Option<JoinHandle<()>>>,
}

impl SMBConnection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                connected: AtomicBool::new(false),
                writer: Mutex::new(None),
                pending: StdMutex::new(None),
                send_permit: Mutex::new(()),
                credits: StdMutex::new(CreditPool::new()),
                next_message_id: StdMutex::new(0),
                security: StdMutex::new(SecurityContext::default()),
                shutdown: StdMutex::new(CancellationToken::new()),
            }),
            receive_task: StdMutex::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Opens the socket and, on port 139, performs the NetBIOS session
    /// handshake. Returns Ok(false) when the server refuses the
    /// connection or the session request.
    pub async fn establish(
        &self,
        address: IpAddr,
        port: u16,
        transport: SMBTransport,
        client_name: &str,
        timeout: Duration,
    ) -> SMBResult<bool> {
        if self.is_connected() {
            return Err(SMBError::connection("Already connected"));
        }
        let stream = match self.open_socket(address, port, transport, client_name, timeout).await? {
            Some(stream) => stream,
            None => return Ok(false),
        };
        let (reader, writer) = stream.into_split();
        *self.inner.writer.lock().await = Some(writer);
        self.inner.connected.store(true, Ordering::Release);
        let shutdown = CancellationToken::new();
        *relock(&self.inner.shutdown) = shutdown.clone();
        let inner = Arc::clone(&self.inner);
        *relock(&self.receive_task) = Some(tokio::spawn(async move {
            ConnectionInner::receive_loop(inner, reader, shutdown).await;
        }));
        Ok(true)
    }

    async fn open_socket(
        &self,
        address: IpAddr,
        port: u16,
        transport: SMBTransport,
        client_name: &str,
        timeout: Duration,
    ) -> SMBResult<Option<TcpStream>> {
        let Some(stream) = dial(address, port, timeout).await? else {
            return Ok(None);
        };
        if transport != SMBTransport::NetBios {
            return Ok(Some(stream));
        }
        let mut stream = stream;
        if session_request(&mut stream, SMBSERVER_NAME, client_name, timeout).await? {
            return Ok(Some(stream));
        }
        // the generic called name was refused; ask the name service
        // for the real one and retry on a fresh socket
        let called = node_status_query(address).await?;
        debug!("Session request refused, retrying with called name {}", called);
        let Some(mut retry) = dial(address, port, timeout).await? else {
            return Ok(None);
        };
        if session_request(&mut retry, &called, client_name, timeout).await? {
            Ok(Some(retry))
        } else {
            Ok(None)
        }
    }

    /// Sends one frame and waits for the response, the caller's cancel
    /// or the timeout, whichever settles first.
    pub async fn exchange(
        &self,
        key: CorrelationKey,
        frame: Vec<u8>,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        self.exchange_with(move |_| Ok((key, frame)), timeout, cancel).await
    }

    /// Like [`exchange`](Self::exchange), but `build` runs while the
    /// send permit is already held. Credit charges and message-id
    /// reservation inside the builder therefore happen in send order
    /// even with concurrent callers.
    pub async fn exchange_with<F>(
        &self,
        build: F,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>>
    where
        F: FnOnce(&SMBConnection) -> SMBResult<(CorrelationKey, Vec<u8>)>,
    {
        if !self.is_connected() {
            return Err(SMBError::connection("Not connected"));
        }
        let _permit = tokio::select! {
            guard = self.inner.send_permit.lock() => guard,
            _ = cancel.cancelled() => return Err(SMBError::canceled()),
        };
        let (key, frame) = build(self)?;
        let (sender, receiver) = oneshot::channel();
        *relock(&self.inner.pending) = Some(PendingRequest { key, sender });

        if let Err(error) = self.write_frame(frame).await {
            relock(&self.inner.pending).take();
            return Err(error);
        }

        tokio::select! {
            received = receiver => {
                received.map_err(|_| SMBError::connection("Connection closed while awaiting response"))
            }
            _ = cancel.cancelled() => {
                relock(&self.inner.pending).take();
                Err(SMBError::canceled())
            }
            _ = tokio::time::sleep(timeout) => {
                relock(&self.inner.pending).take();
                Err(SMBError::timeout(timeout))
            }
        }
    }

    async fn write_frame(&self, frame: Vec<u8>) -> SMBResult<()> {
        let mut writer = self.inner.writer.lock().await;
        let writer = writer
            .as_mut()
            .ok_or_else(|| SMBError::connection("Not connected"))?;
        writer
            .write_all(&SessionPacket::message(frame).encode())
            .await
            .map_err(SMBError::io_error)
    }

    /// Drops the socket and resets every piece of per-connection
    /// state, leaving the object ready for a fresh establish().
    pub async fn disconnect(&self) {
        relock(&self.inner.shutdown).cancel();
        if let Some(task) = relock(&self.receive_task).take() {
            task.abort();
        }
        if let Some(mut writer) = self.inner.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        self.inner.connected.store(false, Ordering::Release);
        relock(&self.inner.pending).take();
        relock(&self.inner.credits).reset();
        *relock(&self.inner.next_message_id) = 0;
        relock(&self.inner.security).reset();
    }

    /// Reserves `count` consecutive message ids, returning the first.
    pub fn reserve_message_id(&self, count: u64) -> u64 {
        let mut next = relock(&self.inner.next_message_id);
        let id = *next;
        *next += count;
        id
    }

    pub fn charge_single_credit(&self) -> SMBResult<CreditCharge> {
        relock(&self.inner.credits).charge_single()
    }

    pub fn charge_credits(&self, payload_bytes: usize) -> SMBResult<CreditCharge> {
        relock(&self.inner.credits).charge(payload_bytes)
    }

    pub fn available_credits(&self) -> u16 {
        relock(&self.inner.credits).available()
    }

    pub fn with_security<R>(&self, f: impl FnOnce(&mut SecurityContext) -> R) -> R {
        f(&mut relock(&self.inner.security))
    }
}

impl Default for SMBConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionInner {
    async fn receive_loop(
        inner: Arc<ConnectionInner>,
        mut reader: OwnedReadHalf,
        shutdown: CancellationToken,
    ) {
        let mut buffer = SessionReceiveBuffer::new();
        let mut chunk = vec![0u8; 65536];
        loop {
            let read = tokio::select! {
                read = reader.read(&mut chunk) => read,
                _ = shutdown.cancelled() => break,
            };
            match read {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.append(&chunk[..n]),
            }
            loop {
                match buffer.next_packet() {
                    Ok(Some(packet)) => inner.process_packet(packet),
                    Ok(None) => break,
                    Err(error) => {
                        warn!("Dropping undecodable session frame: {}", error);
                        inner.connected.store(false, Ordering::Release);
                        relock(&inner.pending).take();
                        return;
                    }
                }
            }
        }
        // connection gone; dropping the pending sender wakes the waiter
        inner.connected.store(false, Ordering::Release);
        relock(&inner.pending).take();
    }

    fn process_packet(&self, packet: SessionPacket) {
        match packet.packet_type {
            SessionPacketType::Message => self.process_message(packet.payload),
            // post-handshake session-service frames carry no payload
            _ => {}
        }
    }

    fn process_message(&self, payload: Vec<u8>) {
        let payload = match relock(&self.security).open(payload) {
            Ok(payload) => payload,
            Err(error) => {
                warn!("Discarding frame that failed to unseal: {}", error);
                return;
            }
        };
        if payload.starts_with(&SMB2_PROTOCOL_ID) {
            self.process_modern(payload);
        } else if payload.starts_with(&SMB1_PROTOCOL_ID) {
            self.process_legacy(payload);
        } else {
            warn!("Discarding frame with unknown protocol id");
        }
    }

    fn process_modern(&self, payload: Vec<u8>) {
        let header = match SMB2Header::parse(&payload) {
            Ok(header) => header,
            Err(error) => {
                warn!("Discarding unparsable SMB2 frame: {}", error);
                return;
            }
        };
        // every received frame may carry a credit grant
        relock(&self.credits).grant(header.credits);
        if header.message_id == UNSOLICITED_MESSAGE_ID {
            return;
        }
        // an interim async response; the real one follows later
        if header.status == STATUS_PENDING && header.is_async() {
            return;
        }
        self.settle(CorrelationKey::Modern(header.message_id), payload);
    }

    fn process_legacy(&self, payload: Vec<u8>) {
        let header = match SMB1Header::parse(&payload) {
            Ok(header) => header,
            Err(error) => {
                warn!("Discarding unparsable SMB1 frame: {}", error);
                return;
            }
        };
        // server-initiated oplock break, not a response
        if header.mid == LEGACY_OPLOCK_BREAK_MID && header.command == SMB1Command::LockingAndX {
            return;
        }
        self.settle(
            CorrelationKey::Legacy {
                pid: header.pid,
                mid: header.mid,
            },
            payload,
        );
    }

    fn settle(&self, key: CorrelationKey, payload: Vec<u8>) {
        let mut pending = relock(&self.pending);
        match pending.as_ref() {
            Some(request) if request.key == key => {
                if let Some(request) = pending.take() {
                    // the waiter may already have timed out or been
                    // canceled; a dead receiver is fine
                    let _ = request.sender.send(payload);
                }
            }
            _ => debug!("Discarding response no request is waiting for"),
        }
    }
}

async fn dial(address: IpAddr, port: u16, timeout: Duration) -> SMBResult<Option<TcpStream>> {
    match tokio::time::timeout(timeout, TcpStream::connect((address, port))).await {
        Ok(Ok(stream)) => Ok(Some(stream)),
        Ok(Err(_)) => Ok(None),
        Err(_) => Err(SMBError::timeout(timeout)),
    }
}

/// One RFC 1002 session request/response round trip. Returns whether
/// the server accepted the session.
async fn session_request(
    stream: &mut TcpStream,
    called: &str,
    calling: &str,
    timeout: Duration,
) -> SMBResult<bool> {
    stream
        .write_all(&SessionPacket::session_request(called, calling).encode())
        .await
        .map_err(SMBError::io_error)?;
    let mut header = [0u8; 4];
    tokio::time::timeout(timeout, stream.read_exact(&mut header))
        .await
        .map_err(|_| SMBError::timeout(timeout))?
        .map_err(SMBError::io_error)?;
    let length = ((header[1] as usize) << 16) | ((header[2] as usize) << 8) | header[3] as usize;
    let mut body = vec![0u8; length];
    if length > 0 {
        tokio::time::timeout(timeout, stream.read_exact(&mut body))
            .await
            .map_err(|_| SMBError::timeout(timeout))?
            .map_err(SMBError::io_error)?;
    }
    match header[0] {
        x if x == SessionPacketType::PositiveResponse as u8 => Ok(true),
        x if x == SessionPacketType::NegativeResponse as u8 => Ok(false),
        _ => Err(SMBError::parse_error("Unexpected session handshake frame")),
    }
}
