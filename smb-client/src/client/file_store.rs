use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex as StdMutex;

use tokio_util::sync::CancellationToken;

use smb_client_core::error::SMBError;
use smb_client_core::nt_status::NTStatus;
use smb_client_core::SMBResult;

use crate::client::smb1::{SMB1Channel, SMB1Client};
use crate::client::smb2::{SMB2Channel, SMB2Client};
use crate::client::{SMBClient, SMBClientConfig, SMBTransport};
use crate::protocol::body::{
    CreateDisposition, CreateOptions, FileAttributes, FileDirectoryInformation,
    FileInformationClass, QueryDirectoryFlags, SMBCloseRequest, SMBCreateRequest,
    SMBCreateResponse, SMBEmpty, SMBFlushRequest, SMBIoctlRequest, SMBIoctlResponse,
    SMBQueryDirectoryRequest, SMBQueryDirectoryResponse, SMBQueryInfoRequest,
    SMBQueryInfoResponse, SMBReadRequest, SMBReadResponse, SMBSetInfoRequest,
    SMBSetInfoResponse, SMBWriteRequest, SMBWriteResponse, ShareAccess,
};
use crate::protocol::header::{SMB1Command, SMB1Header, SMB2Command, SMB2Header};
use crate::protocol::legacy::{
    SMB1CloseRequest, SMB1FindFirst2Request, SMB1FindFirst2Response, SMB1FindNext2Request,
    SMB1FindNext2Response, SMB1NtCreateRequest, SMB1NtCreateResponse, SMB1ReadRequest,
    SMB1ReadResponse, SMB1Transaction2Request, SMB1Transaction2Response, SMB1WriteRequest,
    SMB1WriteResponse, TRANS2_FIND_FIRST2, TRANS2_FIND_NEXT2,
};

/// An open file on some share, valid only for the store that opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SMBFileHandle {
    Modern([u8; 16]),
    Legacy(u16),
}

/// One connected share. Operations never panic for protocol failures;
/// the server's verdict always comes back as a result.
pub trait SMBFileStore {
    fn create(
        &self,
        path: &str,
        desired_access: u32,
        attributes: FileAttributes,
        share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<SMBFileHandle>> + Send;

    fn read(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        length: u32,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<Vec<u8>>> + Send;

    fn write(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<u32>> + Send;

    fn flush(
        &self,
        handle: &SMBFileHandle,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<()>> + Send;

    fn close(
        &self,
        handle: &SMBFileHandle,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<()>> + Send;

    fn query_directory(
        &self,
        handle: &SMBFileHandle,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<Vec<FileDirectoryInformation>>> + Send;

    fn get_info(
        &self,
        handle: &SMBFileHandle,
        class: FileInformationClass,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<Vec<u8>>> + Send;

    fn set_info(
        &self,
        handle: &SMBFileHandle,
        class: FileInformationClass,
        data: Vec<u8>,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<()>> + Send;

    fn ioctl(
        &self,
        handle: &SMBFileHandle,
        ctl_code: u32,
        input: Vec<u8>,
        max_output: u32,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<Vec<u8>>> + Send;

    /// Tree disconnect. The store is unusable afterwards.
    fn disconnect(
        &self,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = SMBResult<()>> + Send;
}

fn accept_modern(header: &SMB2Header) -> SMBResult<()> {
    let status = header.status();
    if status.is_error() {
        Err(SMBError::status(status))
    } else {
        Ok(())
    }
}

fn accept_legacy(header: &SMB1Header) -> SMBResult<()> {
    let status = header.status();
    if status.is_error() {
        Err(SMBError::status(status))
    } else {
        Ok(())
    }
}

fn modern_id(handle: &SMBFileHandle) -> SMBResult<[u8; 16]> {
    match handle {
        SMBFileHandle::Modern(id) => Ok(*id),
        SMBFileHandle::Legacy(_) => {
            Err(SMBError::not_supported("Legacy handle used on a modern share"))
        }
    }
}

fn legacy_id(handle: &SMBFileHandle) -> SMBResult<u16> {
    match handle {
        SMBFileHandle::Legacy(fid) => Ok(*fid),
        SMBFileHandle::Modern(_) => {
            Err(SMBError::not_supported("Modern handle used on a legacy share"))
        }
    }
}

/// A search round with no entries carries an empty data block.
fn parse_entries(data: &[u8]) -> SMBResult<Vec<FileDirectoryInformation>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    FileDirectoryInformation::parse_listing(data)
}

/// File store over an SMB2/3 tree connect.
pub struct SMB2FileStore {
    channel: SMB2Channel,
    tree_id: u32,
    max_read_size: u32,
    max_write_size: u32,
    max_transact_size: u32,
}

impl SMB2FileStore {
    pub(crate) fn new(
        channel: SMB2Channel,
        tree_id: u32,
        max_read_size: u32,
        max_write_size: u32,
        max_transact_size: u32,
    ) -> Self {
        Self {
            channel,
            tree_id,
            max_read_size,
            max_write_size,
            max_transact_size,
        }
    }

    pub fn max_read_size(&self) -> u32 {
        self.max_read_size
    }

    pub fn max_write_size(&self) -> u32 {
        self.max_write_size
    }

    async fn transact(
        &self,
        command: SMB2Command,
        payload: &[u8],
        credit_bytes: usize,
        cancel: &CancellationToken,
    ) -> SMBResult<(SMB2Header, Vec<u8>)> {
        self.channel
            .transact(command, self.tree_id, payload, credit_bytes, cancel)
            .await
    }
}

impl SMBFileStore for SMB2FileStore {
    async fn create(
        &self,
        path: &str,
        desired_access: u32,
        attributes: FileAttributes,
        share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
        cancel: &CancellationToken,
    ) -> SMBResult<SMBFileHandle> {
        let request = SMBCreateRequest {
            desired_access,
            file_attributes: attributes,
            share_access,
            create_disposition: disposition,
            create_options: options,
            path: path.to_string(),
        };
        let (header, body) = self
            .transact(SMB2Command::Create, &request.encode(), 0, cancel)
            .await?;
        accept_modern(&header)?;
        let response = SMBCreateResponse::parse(&body)?;
        Ok(SMBFileHandle::Modern(response.file_id))
    }

    async fn read(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        length: u32,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        let length = length.min(self.max_read_size);
        let request = SMBReadRequest {
            length,
            offset,
            file_id: modern_id(handle)?,
        };
        let (header, body) = self
            .transact(SMB2Command::Read, &request.encode(), length as usize, cancel)
            .await?;
        if header.status() == NTStatus::EndOfFile {
            return Ok(Vec::new());
        }
        accept_modern(&header)?;
        Ok(SMBReadResponse::parse(&body)?.data)
    }

    async fn write(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> SMBResult<u32> {
        let chunk = &data[..data.len().min(self.max_write_size as usize)];
        let request = SMBWriteRequest {
            offset,
            file_id: modern_id(handle)?,
            data: chunk.to_vec(),
        };
        let (header, body) = self
            .transact(SMB2Command::Write, &request.encode(), chunk.len(), cancel)
            .await?;
        accept_modern(&header)?;
        Ok(SMBWriteResponse::parse(&body)?.count)
    }

    async fn flush(&self, handle: &SMBFileHandle, cancel: &CancellationToken) -> SMBResult<()> {
        let request = SMBFlushRequest::new(modern_id(handle)?);
        let (header, body) = self
            .transact(SMB2Command::Flush, &request.encode(), 0, cancel)
            .await?;
        accept_modern(&header)?;
        SMBEmpty::parse(&body)?;
        Ok(())
    }

    async fn close(&self, handle: &SMBFileHandle, cancel: &CancellationToken) -> SMBResult<()> {
        let request = SMBCloseRequest::new(modern_id(handle)?);
        let (header, _) = self
            .transact(SMB2Command::Close, &request.encode(), 0, cancel)
            .await?;
        accept_modern(&header)
    }

    async fn query_directory(
        &self,
        handle: &SMBFileHandle,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<FileDirectoryInformation>> {
        let file_id = modern_id(handle)?;
        let mut entries = Vec::new();
        let mut flags = QueryDirectoryFlags::RESTART_SCANS;
        loop {
            let request = SMBQueryDirectoryRequest {
                information_class: FileInformationClass::DirectoryInformation,
                flags,
                file_id,
                pattern: pattern.to_string(),
                output_buffer_length: self.max_transact_size,
            };
            let (header, body) = self
                .transact(
                    SMB2Command::QueryDirectory,
                    &request.encode(),
                    self.max_transact_size as usize,
                    cancel,
                )
                .await?;
            if header.status() == NTStatus::NoMoreFiles {
                return Ok(entries);
            }
            accept_modern(&header)?;
            let response = SMBQueryDirectoryResponse::parse(&body)?;
            entries.extend(FileDirectoryInformation::parse_listing(&response.data)?);
            flags = QueryDirectoryFlags::empty();
        }
    }

    async fn get_info(
        &self,
        handle: &SMBFileHandle,
        class: FileInformationClass,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        let request = SMBQueryInfoRequest {
            information_class: class,
            output_buffer_length: self.max_transact_size,
            file_id: modern_id(handle)?,
        };
        let (header, body) = self
            .transact(SMB2Command::QueryInfo, &request.encode(), 0, cancel)
            .await?;
        accept_modern(&header)?;
        Ok(SMBQueryInfoResponse::parse(&body)?.data)
    }

    async fn set_info(
        &self,
        handle: &SMBFileHandle,
        class: FileInformationClass,
        data: Vec<u8>,
        cancel: &CancellationToken,
    ) -> SMBResult<()> {
        let request = SMBSetInfoRequest {
            information_class: class,
            file_id: modern_id(handle)?,
            data,
        };
        let (header, body) = self
            .transact(SMB2Command::SetInfo, &request.encode(), 0, cancel)
            .await?;
        accept_modern(&header)?;
        SMBSetInfoResponse::parse(&body)?;
        Ok(())
    }

    async fn ioctl(
        &self,
        handle: &SMBFileHandle,
        ctl_code: u32,
        input: Vec<u8>,
        max_output: u32,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        let credit_bytes = input.len().max(max_output as usize);
        let request = SMBIoctlRequest {
            ctl_code,
            file_id: modern_id(handle)?,
            input,
            max_output_response: max_output,
        };
        let (header, body) = self
            .transact(SMB2Command::Ioctl, &request.encode(), credit_bytes, cancel)
            .await?;
        accept_modern(&header)?;
        Ok(SMBIoctlResponse::parse(&body)?.output)
    }

    async fn disconnect(&self, cancel: &CancellationToken) -> SMBResult<()> {
        let (header, _) = self
            .transact(SMB2Command::TreeDisconnect, &SMBEmpty.encode(), 0, cancel)
            .await?;
        accept_modern(&header)?;
        let tree_id = self.tree_id;
        self.channel
            .connection()
            .with_security(|security| security.forget_tree(tree_id));
        Ok(())
    }
}

/// File store over a legacy tree connect. Directory listing rides the
/// Trans2 FindFirst2/FindNext2 subcommands; the info/ioctl family is
/// not carried on this dialect.
pub struct SMB1FileStore {
    channel: SMB1Channel,
    tid: u16,
    /// Paths by fid. Trans2 searches are path-based, so the store
    /// remembers what each handle opened.
    opened: StdMutex<HashMap<u16, String>>,
}

impl SMB1FileStore {
    pub(crate) fn new(channel: SMB1Channel, tid: u16) -> Self {
        Self {
            channel,
            tid,
            opened: StdMutex::new(HashMap::new()),
        }
    }

    async fn transact(
        &self,
        command: SMB1Command,
        body: &[u8],
        cancel: &CancellationToken,
    ) -> SMBResult<(SMB1Header, Vec<u8>)> {
        self.channel.transact(command, self.tid, body, cancel).await
    }

    fn opened_path(&self, fid: u16) -> SMBResult<String> {
        self.opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&fid)
            .cloned()
            .ok_or_else(|| SMBError::connection("Unknown file handle"))
    }

    fn remember_path(&self, fid: u16, path: &str) {
        self.opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(fid, path.to_string());
    }

    fn forget_path(&self, fid: u16) {
        self.opened
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&fid);
    }

    async fn transaction2(
        &self,
        subcommand: u16,
        parameters: Vec<u8>,
        cancel: &CancellationToken,
    ) -> SMBResult<SMB1Transaction2Response> {
        let request = SMB1Transaction2Request {
            subcommand,
            parameters,
            data: Vec::new(),
        };
        let (header, body) = self
            .transact(SMB1Command::Transaction2, &request.encode(), cancel)
            .await?;
        accept_legacy(&header)?;
        SMB1Transaction2Response::parse(&body)
    }
}

impl SMBFileStore for SMB1FileStore {
    async fn create(
        &self,
        path: &str,
        desired_access: u32,
        attributes: FileAttributes,
        share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
        cancel: &CancellationToken,
    ) -> SMBResult<SMBFileHandle> {
        let request = SMB1NtCreateRequest {
            desired_access,
            file_attributes: attributes.bits(),
            share_access: share_access.bits(),
            create_disposition: disposition as u32,
            create_options: options.bits(),
            path: path.to_string(),
        };
        let (header, body) = self
            .transact(SMB1Command::NtCreateAndX, &request.encode(), cancel)
            .await?;
        accept_legacy(&header)?;
        let response = SMB1NtCreateResponse::parse(&body)?;
        self.remember_path(response.fid, path);
        Ok(SMBFileHandle::Legacy(response.fid))
    }

    async fn read(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        length: u32,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        let request = SMB1ReadRequest {
            fid: legacy_id(handle)?,
            offset,
            max_count: length.min(u16::MAX as u32) as u16,
        };
        let (header, body) = self
            .transact(SMB1Command::ReadAndX, &request.encode(), cancel)
            .await?;
        if header.status() == NTStatus::EndOfFile {
            return Ok(Vec::new());
        }
        accept_legacy(&header)?;
        Ok(SMB1ReadResponse::parse(&body)?.data)
    }

    async fn write(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> SMBResult<u32> {
        let chunk = &data[..data.len().min(u16::MAX as usize)];
        let request = SMB1WriteRequest {
            fid: legacy_id(handle)?,
            offset,
            data: chunk.to_vec(),
        };
        let (header, body) = self
            .transact(SMB1Command::WriteAndX, &request.encode(), cancel)
            .await?;
        accept_legacy(&header)?;
        Ok(SMB1WriteResponse::parse(&body)?.count)
    }

    async fn flush(&self, _handle: &SMBFileHandle, _cancel: &CancellationToken) -> SMBResult<()> {
        Err(SMBError::not_supported("Flush is not carried on the legacy dialect"))
    }

    async fn close(&self, handle: &SMBFileHandle, cancel: &CancellationToken) -> SMBResult<()> {
        let fid = legacy_id(handle)?;
        let request = SMB1CloseRequest { fid };
        let (header, _) = self
            .transact(SMB1Command::Close, &request.encode(), cancel)
            .await?;
        accept_legacy(&header)?;
        self.forget_path(fid);
        Ok(())
    }

    async fn query_directory(
        &self,
        handle: &SMBFileHandle,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<FileDirectoryInformation>> {
        let directory = self.opened_path(legacy_id(handle)?)?;
        let search = if directory.is_empty() {
            pattern.to_string()
        } else {
            format!("{}\\{}", directory.trim_end_matches('\\'), pattern)
        };

        let first = SMB1FindFirst2Request { pattern: search };
        let response = self
            .transaction2(TRANS2_FIND_FIRST2, first.encode(), cancel)
            .await?;
        let state = SMB1FindFirst2Response::parse(&response.parameters)?;
        let mut entries = parse_entries(&response.data)?;
        let mut end_of_search = state.end_of_search || state.search_count == 0;

        while !end_of_search {
            let next = SMB1FindNext2Request { sid: state.sid };
            let response = self
                .transaction2(TRANS2_FIND_NEXT2, next.encode(), cancel)
                .await?;
            let round = SMB1FindNext2Response::parse(&response.parameters)?;
            entries.extend(parse_entries(&response.data)?);
            end_of_search = round.end_of_search || round.search_count == 0;
        }
        Ok(entries)
    }

    async fn get_info(
        &self,
        _handle: &SMBFileHandle,
        _class: FileInformationClass,
        _cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        Err(SMBError::not_supported("Info queries require Trans2"))
    }

    async fn set_info(
        &self,
        _handle: &SMBFileHandle,
        _class: FileInformationClass,
        _data: Vec<u8>,
        _cancel: &CancellationToken,
    ) -> SMBResult<()> {
        Err(SMBError::not_supported("Info queries require Trans2"))
    }

    async fn ioctl(
        &self,
        _handle: &SMBFileHandle,
        _ctl_code: u32,
        _input: Vec<u8>,
        _max_output: u32,
        _cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        Err(SMBError::not_supported("Ioctl requires the NT Trans subprotocol"))
    }

    async fn disconnect(&self, cancel: &CancellationToken) -> SMBResult<()> {
        let (header, _) = self
            .transact(SMB1Command::TreeDisconnect, &SMBEmpty.encode(), cancel)
            .await?;
        accept_legacy(&header)
    }
}

/// Which strategy client to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SMBClientKind {
    Legacy,
    Modern,
}

/// Uniform client over both dialect families. Each method delegates to
/// the selected strategy.
pub enum SMBGenericClient {
    Legacy(SMB1Client),
    Modern(SMB2Client),
}

/// Uniform file store matching [`SMBGenericClient`].
pub enum SMBGenericFileStore {
    Legacy(SMB1FileStore),
    Modern(SMB2FileStore),
}

/// Builds the strategy client for a dialect family.
pub struct SMBClientFactory;

impl SMBClientFactory {
    pub fn create(kind: SMBClientKind, config: SMBClientConfig) -> SMBGenericClient {
        match kind {
            SMBClientKind::Legacy => SMBGenericClient::Legacy(SMB1Client::new(config)),
            SMBClientKind::Modern => SMBGenericClient::Modern(SMB2Client::new(config)),
        }
    }
}

impl SMBClient for SMBGenericClient {
    type FileStore = SMBGenericFileStore;

    async fn connect(
        &mut self,
        address: IpAddr,
        transport: SMBTransport,
        cancel: &CancellationToken,
    ) -> SMBResult<bool> {
        match self {
            SMBGenericClient::Legacy(client) => client.connect(address, transport, cancel).await,
            SMBGenericClient::Modern(client) => client.connect(address, transport, cancel).await,
        }
    }

    async fn login(
        &mut self,
        domain: &str,
        user: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<()> {
        match self {
            SMBGenericClient::Legacy(client) => client.login(domain, user, password, cancel).await,
            SMBGenericClient::Modern(client) => client.login(domain, user, password, cancel).await,
        }
    }

    async fn logoff(&mut self, cancel: &CancellationToken) -> SMBResult<()> {
        match self {
            SMBGenericClient::Legacy(client) => client.logoff(cancel).await,
            SMBGenericClient::Modern(client) => client.logoff(cancel).await,
        }
    }

    async fn tree_connect(
        &mut self,
        share: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<Self::FileStore> {
        match self {
            SMBGenericClient::Legacy(client) => Ok(SMBGenericFileStore::Legacy(
                client.tree_connect(share, cancel).await?,
            )),
            SMBGenericClient::Modern(client) => Ok(SMBGenericFileStore::Modern(
                client.tree_connect(share, cancel).await?,
            )),
        }
    }

    async fn disconnect(&mut self) {
        match self {
            SMBGenericClient::Legacy(client) => client.disconnect().await,
            SMBGenericClient::Modern(client) => client.disconnect().await,
        }
    }

    fn max_read_size(&self) -> u32 {
        match self {
            SMBGenericClient::Legacy(client) => client.max_read_size(),
            SMBGenericClient::Modern(client) => client.max_read_size(),
        }
    }

    fn max_write_size(&self) -> u32 {
        match self {
            SMBGenericClient::Legacy(client) => client.max_write_size(),
            SMBGenericClient::Modern(client) => client.max_write_size(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            SMBGenericClient::Legacy(client) => client.is_connected(),
            SMBGenericClient::Modern(client) => client.is_connected(),
        }
    }
}

impl SMBFileStore for SMBGenericFileStore {
    async fn create(
        &self,
        path: &str,
        desired_access: u32,
        attributes: FileAttributes,
        share_access: ShareAccess,
        disposition: CreateDisposition,
        options: CreateOptions,
        cancel: &CancellationToken,
    ) -> SMBResult<SMBFileHandle> {
        match self {
            SMBGenericFileStore::Legacy(store) => {
                store
                    .create(path, desired_access, attributes, share_access, disposition, options, cancel)
                    .await
            }
            SMBGenericFileStore::Modern(store) => {
                store
                    .create(path, desired_access, attributes, share_access, disposition, options, cancel)
                    .await
            }
        }
    }

    async fn read(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        length: u32,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.read(handle, offset, length, cancel).await,
            SMBGenericFileStore::Modern(store) => store.read(handle, offset, length, cancel).await,
        }
    }

    async fn write(
        &self,
        handle: &SMBFileHandle,
        offset: u64,
        data: &[u8],
        cancel: &CancellationToken,
    ) -> SMBResult<u32> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.write(handle, offset, data, cancel).await,
            SMBGenericFileStore::Modern(store) => store.write(handle, offset, data, cancel).await,
        }
    }

    async fn flush(&self, handle: &SMBFileHandle, cancel: &CancellationToken) -> SMBResult<()> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.flush(handle, cancel).await,
            SMBGenericFileStore::Modern(store) => store.flush(handle, cancel).await,
        }
    }

    async fn close(&self, handle: &SMBFileHandle, cancel: &CancellationToken) -> SMBResult<()> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.close(handle, cancel).await,
            SMBGenericFileStore::Modern(store) => store.close(handle, cancel).await,
        }
    }

    async fn query_directory(
        &self,
        handle: &SMBFileHandle,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<FileDirectoryInformation>> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.query_directory(handle, pattern, cancel).await,
            SMBGenericFileStore::Modern(store) => store.query_directory(handle, pattern, cancel).await,
        }
    }

    async fn get_info(
        &self,
        handle: &SMBFileHandle,
        class: FileInformationClass,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.get_info(handle, class, cancel).await,
            SMBGenericFileStore::Modern(store) => store.get_info(handle, class, cancel).await,
        }
    }

    async fn set_info(
        &self,
        handle: &SMBFileHandle,
        class: FileInformationClass,
        data: Vec<u8>,
        cancel: &CancellationToken,
    ) -> SMBResult<()> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.set_info(handle, class, data, cancel).await,
            SMBGenericFileStore::Modern(store) => store.set_info(handle, class, data, cancel).await,
        }
    }

    async fn ioctl(
        &self,
        handle: &SMBFileHandle,
        ctl_code: u32,
        input: Vec<u8>,
        max_output: u32,
        cancel: &CancellationToken,
    ) -> SMBResult<Vec<u8>> {
        match self {
            SMBGenericFileStore::Legacy(store) => {
                store.ioctl(handle, ctl_code, input, max_output, cancel).await
            }
            SMBGenericFileStore::Modern(store) => {
                store.ioctl(handle, ctl_code, input, max_output, cancel).await
            }
        }
    }

    async fn disconnect(&self, cancel: &CancellationToken) -> SMBResult<()> {
        match self {
            SMBGenericFileStore::Legacy(store) => store.disconnect(cancel).await,
            SMBGenericFileStore::Modern(store) => store.disconnect(cancel).await,
        }
    }
}
