//! Full client flow against a scripted guest-session server:
//! connect, login, tree connect, create, write, read, close,
//! tree disconnect, disconnect.

use std::net::IpAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use smb_client::client::{
    SMB2Client, SMBClient, SMBClientConfigBuilder, SMBFileStore, SMBTransport,
};
use smb_client::netbios::SessionPacket;
use smb_client::protocol::body::{
    CreateDisposition, CreateOptions, FileAttributes, SMBDialect, ShareAccess,
};
use smb_client::protocol::header::{SMB2Command, SMB2Flags, SMB2Header, SMB2_HEADER_SIZE};

const SESSION_ID: u64 = 0x2200;
const TREE_ID: u32 = 5;
const FILE_ID: [u8; 16] = [0xAB; 16];
const FILE_PAYLOAD: &[u8] = b"hello over the wire";

fn localhost() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

async fn read_frame(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut header = [0u8; 4];
    if stream.read_exact(&mut header).await.is_err() {
        return None;
    }
    let length =
        ((header[1] as usize) << 16) | ((header[2] as usize) << 8) | header[3] as usize;
    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload).await.unwrap();
    Some(payload)
}

fn response_header(request: &SMB2Header, session_id: u64, tree_id: u32) -> Vec<u8> {
    let mut header = SMB2Header::new_request(request.command);
    header.flags = SMB2Flags::SERVER_TO_REDIR;
    header.credits = 16;
    header.message_id = request.message_id;
    header.session_id = session_id;
    header.tree_id = tree_id;
    header.encode()
}

fn negotiate_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&65u16.to_le_bytes()); // StructureSize
    body.extend_from_slice(&0x01u16.to_le_bytes()); // signing enabled, not required
    body.extend_from_slice(&(SMBDialect::V2_1_0 as u16).to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // NegotiateContextCount
    body.extend_from_slice(&[0x11; 16]); // ServerGuid
    body.extend_from_slice(&0u32.to_le_bytes()); // Capabilities
    body.extend_from_slice(&65536u32.to_le_bytes()); // MaxTransactSize
    body.extend_from_slice(&65536u32.to_le_bytes()); // MaxReadSize
    body.extend_from_slice(&65536u32.to_le_bytes()); // MaxWriteSize
    body.extend_from_slice(&0u64.to_le_bytes()); // SystemTime
    body.extend_from_slice(&0u64.to_le_bytes()); // ServerStartTime
    body.extend_from_slice(&0u16.to_le_bytes()); // SecurityBufferOffset
    body.extend_from_slice(&0u16.to_le_bytes()); // SecurityBufferLength
    body.extend_from_slice(&0u32.to_le_bytes()); // NegotiateContextOffset
    body
}

fn guest_session_setup_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&9u16.to_le_bytes()); // StructureSize
    body.extend_from_slice(&0x0001u16.to_le_bytes()); // SMB2_SESSION_FLAG_IS_GUEST
    body.extend_from_slice(&0u16.to_le_bytes()); // SecurityBufferOffset
    body.extend_from_slice(&0u16.to_le_bytes()); // SecurityBufferLength
    body
}

fn tree_connect_body() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&16u16.to_le_bytes()); // StructureSize
    body.push(1); // disk share
    body.push(0); // reserved
    body.extend_from_slice(&0u32.to_le_bytes()); // ShareFlags
    body.extend_from_slice(&0u32.to_le_bytes()); // Capabilities
    body.extend_from_slice(&0x001F_01FFu32.to_le_bytes()); // MaximalAccess
    body
}

fn create_body() -> Vec<u8> {
    let mut body = vec![0u8; 88];
    body[0..2].copy_from_slice(&89u16.to_le_bytes());
    body[4..8].copy_from_slice(&2u32.to_le_bytes()); // created
    body[56..60].copy_from_slice(&FileAttributes::NORMAL.bits().to_le_bytes());
    body[64..80].copy_from_slice(&FILE_ID);
    body
}

fn write_body(count: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&17u16.to_le_bytes()); // StructureSize
    body.extend_from_slice(&0u16.to_le_bytes()); // reserved
    body.extend_from_slice(&count.to_le_bytes());
    body.extend_from_slice(&0u16.to_le_bytes()); // remaining / channel info
    body.extend_from_slice(&0u16.to_le_bytes());
    body
}

fn read_body(data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&17u16.to_le_bytes()); // StructureSize
    body.push((SMB2_HEADER_SIZE + 16) as u8); // DataOffset
    body.push(0); // reserved
    body.extend_from_slice(&(data.len() as u32).to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes()); // DataRemaining
    body.extend_from_slice(&0u32.to_le_bytes()); // reserved2
    body.extend_from_slice(data);
    body
}

fn close_body() -> Vec<u8> {
    let mut body = vec![0u8; 60];
    body[0..2].copy_from_slice(&60u16.to_le_bytes());
    body
}

fn empty_body() -> Vec<u8> {
    vec![4, 0, 0, 0]
}

/// Replies STATUS_SUCCESS with matching correlation keys to the whole
/// scripted flow, storing what the client wrote.
async fn run_mock_server(listener: TcpListener) -> Vec<u8> {
    let (mut stream, _) = listener.accept().await.unwrap();
    let mut written = Vec::new();
    while let Some(frame) = read_frame(&mut stream).await {
        let request = SMB2Header::parse(&frame).unwrap();
        let (session_id, tree_id) = match request.command {
            SMB2Command::Negotiate => (0, 0),
            SMB2Command::SessionSetup => (SESSION_ID, 0),
            _ => (SESSION_ID, TREE_ID),
        };
        let mut response = response_header(&request, session_id, tree_id);
        match request.command {
            SMB2Command::Negotiate => response.extend(negotiate_body()),
            SMB2Command::SessionSetup => response.extend(guest_session_setup_body()),
            SMB2Command::TreeConnect => response.extend(tree_connect_body()),
            SMB2Command::Create => response.extend(create_body()),
            SMB2Command::Write => {
                // data sits at offset 112 of the request frame
                written = frame[112..].to_vec();
                response.extend(write_body(written.len() as u32));
            }
            SMB2Command::Read => response.extend(read_body(&written)),
            SMB2Command::Close => response.extend(close_body()),
            SMB2Command::TreeDisconnect => response.extend(empty_body()),
            other => panic!("unexpected command: {:?}", other),
        };
        let done = request.command == SMB2Command::TreeDisconnect;
        stream
            .write_all(&SessionPacket::message(response).encode())
            .await
            .unwrap();
        if done {
            break;
        }
    }
    written
}

#[tokio::test]
async fn guest_login_create_write_read_close_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(run_mock_server(listener));

    let cancel = CancellationToken::new();
    let config = SMBClientConfigBuilder::default()
        .port_override(Some(port))
        .response_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let mut client = SMB2Client::new(config);

    let accepted = client
        .connect(localhost(), SMBTransport::DirectTcp, &cancel)
        .await
        .unwrap();
    assert!(accepted);

    client.login("WORKGROUP", "guest", "", &cancel).await.unwrap();
    assert_eq!(client.dialect(), Some(SMBDialect::V2_1_0));
    assert_eq!(client.max_write_size(), 65536);

    let share = client.tree_connect("public", &cancel).await.unwrap();
    let handle = share
        .create(
            "t.txt",
            0x0012_019F, // generic read/write mask
            FileAttributes::NORMAL,
            ShareAccess::READ | ShareAccess::WRITE,
            CreateDisposition::OverwriteIf,
            CreateOptions::NON_DIRECTORY_FILE,
            &cancel,
        )
        .await
        .unwrap();

    let count = share.write(&handle, 0, FILE_PAYLOAD, &cancel).await.unwrap();
    assert_eq!(count as usize, FILE_PAYLOAD.len());

    let echoed = share.read(&handle, 0, 1024, &cancel).await.unwrap();
    assert_eq!(echoed, FILE_PAYLOAD);

    share.close(&handle, &cancel).await.unwrap();
    share.disconnect(&cancel).await.unwrap();
    client.disconnect().await;
    assert!(!client.is_connected());

    assert_eq!(server.await.unwrap(), FILE_PAYLOAD.to_vec());
}
