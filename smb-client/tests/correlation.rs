//! Correlation engine behavior against a scripted TCP peer: response
//! ordering, decoy immunity, timeout and cancellation races, and local
//! credit rejection.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use smb_client::client::{CorrelationKey, SMBConnection, SMBTransport};
use smb_client::netbios::SessionPacket;
use smb_client::protocol::header::{
    SMB2Command, SMB2Flags, SMB2Header, UNSOLICITED_MESSAGE_ID,
};
use smb_client_core::error::SMBError;

const TIMEOUT: Duration = Duration::from_secs(2);

fn localhost() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

async fn connect(port: u16) -> Arc<SMBConnection> {
    let connection = Arc::new(SMBConnection::new());
    let accepted = connection
        .establish(localhost(), port, SMBTransport::DirectTcp, "TESTCLIENT", TIMEOUT)
        .await
        .unwrap();
    assert!(accepted);
    connection
}

async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await.unwrap();
    let length =
        ((header[1] as usize) << 16) | ((header[2] as usize) << 8) | header[3] as usize;
    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload).await.unwrap();
    payload
}

async fn write_frame(stream: &mut TcpStream, payload: Vec<u8>) {
    stream
        .write_all(&SessionPacket::message(payload).encode())
        .await
        .unwrap();
}

fn request_frame(message_id: u64) -> Vec<u8> {
    let mut header = SMB2Header::new_request(SMB2Command::Echo);
    header.message_id = message_id;
    let mut frame = header.encode();
    frame.extend_from_slice(&[4, 0, 0, 0]);
    frame
}

fn response_frame(message_id: u64, credits: u16) -> Vec<u8> {
    let mut header = SMB2Header::new_request(SMB2Command::Echo);
    header.message_id = message_id;
    header.credits = credits;
    header.flags = SMB2Flags::SERVER_TO_REDIR;
    let mut frame = header.encode();
    frame.extend_from_slice(&[4, 0, 0, 0]);
    frame
}

#[tokio::test]
async fn concurrent_callers_get_their_own_responses_in_send_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        for _ in 0..3 {
            let request = read_frame(&mut stream).await;
            let header = SMB2Header::parse(&request).unwrap();
            write_frame(&mut stream, response_frame(header.message_id, 1)).await;
        }
    });

    let connection = connect(port).await;
    let mut workers = Vec::new();
    for _ in 0..3 {
        let connection = Arc::clone(&connection);
        workers.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            let message_id = connection.reserve_message_id(1);
            let response = connection
                .exchange(
                    CorrelationKey::Modern(message_id),
                    request_frame(message_id),
                    TIMEOUT,
                    &cancel,
                )
                .await
                .unwrap();
            (message_id, SMB2Header::parse(&response).unwrap().message_id)
        }));
    }
    for worker in workers {
        let (sent, received) = worker.await.unwrap();
        assert_eq!(sent, received);
    }
    server.await.unwrap();
}

#[tokio::test]
async fn decoy_and_unsolicited_frames_never_settle_the_request() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_frame(&mut stream).await;
        let header = SMB2Header::parse(&request).unwrap();
        // wrong id, then the never-a-reply id, then the real response
        write_frame(&mut stream, response_frame(header.message_id + 7, 2)).await;
        write_frame(&mut stream, response_frame(UNSOLICITED_MESSAGE_ID, 5)).await;
        write_frame(&mut stream, response_frame(header.message_id, 3)).await;
    });

    let connection = connect(port).await;
    let cancel = CancellationToken::new();
    let message_id = connection.reserve_message_id(1);
    let response = connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(SMB2Header::parse(&response).unwrap().message_id, message_id);
    // every frame's grant lands in the pool, decoys included
    assert_eq!(connection.available_credits(), 1 + 2 + 5 + 3);
    server.await.unwrap();
}

#[tokio::test]
async fn silence_settles_to_timeout_and_a_late_response_is_discarded() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_frame(&mut stream).await;
        let header = SMB2Header::parse(&request).unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        // arrives after the caller has already timed out
        write_frame(&mut stream, response_frame(header.message_id, 1)).await;

        let request = read_frame(&mut stream).await;
        let header = SMB2Header::parse(&request).unwrap();
        write_frame(&mut stream, response_frame(header.message_id, 1)).await;
    });

    let connection = connect(port).await;
    let cancel = CancellationToken::new();
    let message_id = connection.reserve_message_id(1);
    let error = connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            Duration::from_millis(50),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(error, SMBError::Timeout(_)));

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(connection.is_connected());

    let message_id = connection.reserve_message_id(1);
    let response = connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(SMB2Header::parse(&response).unwrap().message_id, message_id);
    server.await.unwrap();
}

#[tokio::test]
async fn cancellation_frees_the_connection_for_the_next_caller() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        // swallow the first request without answering
        let _ = read_frame(&mut stream).await;
        let request = read_frame(&mut stream).await;
        let header = SMB2Header::parse(&request).unwrap();
        write_frame(&mut stream, response_frame(header.message_id, 1)).await;
    });

    let connection = connect(port).await;
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });
    let message_id = connection.reserve_message_id(1);
    let error = connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(error, SMBError::Canceled(_)));

    let cancel = CancellationToken::new();
    let message_id = connection.reserve_message_id(1);
    let response = connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(SMB2Header::parse(&response).unwrap().message_id, message_id);
    server.await.unwrap();
}

#[tokio::test]
async fn oversized_charge_is_rejected_locally() {
    let connection = SMBConnection::new();
    // four credits needed, one available
    let error = connection.charge_credits(200_000).unwrap_err();
    match error {
        SMBError::InsufficientCredits(inner) => {
            assert_eq!(inner.charge, 4);
            assert_eq!(inner.available, 1);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // nothing was spent by the rejected charge
    assert_eq!(connection.available_credits(), 1);
}

#[tokio::test]
async fn reconnecting_after_disconnect_yields_a_live_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        // one echo per establishment
        for _ in 0..2 {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_frame(&mut stream).await;
            let header = SMB2Header::parse(&request).unwrap();
            write_frame(&mut stream, response_frame(header.message_id, 1)).await;
        }
    });

    let cancel = CancellationToken::new();
    let connection = connect(port).await;
    let message_id = connection.reserve_message_id(1);
    connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();

    connection.disconnect().await;
    assert!(!connection.is_connected());

    let accepted = connection
        .establish(localhost(), port, SMBTransport::DirectTcp, "TESTCLIENT", TIMEOUT)
        .await
        .unwrap();
    assert!(accepted);

    // the fresh receive loop must still be running and settle this
    let message_id = connection.reserve_message_id(1);
    let response = connection
        .exchange(
            CorrelationKey::Modern(message_id),
            request_frame(message_id),
            TIMEOUT,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(SMB2Header::parse(&response).unwrap().message_id, message_id);
    server.await.unwrap();
}

#[tokio::test]
async fn ids_reserved_in_the_builder_reach_the_wire_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        for expected in 0..8u64 {
            let request = read_frame(&mut stream).await;
            let header = SMB2Header::parse(&request).unwrap();
            // ids assigned under the send permit cannot arrive inverted
            assert_eq!(header.message_id, expected);
            write_frame(&mut stream, response_frame(header.message_id, 1)).await;
        }
    });

    let connection = connect(port).await;
    let mut workers = Vec::new();
    for _ in 0..8 {
        let connection = Arc::clone(&connection);
        workers.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            connection
                .exchange_with(
                    |connection| {
                        let message_id = connection.reserve_message_id(1);
                        Ok((CorrelationKey::Modern(message_id), request_frame(message_id)))
                    },
                    TIMEOUT,
                    &cancel,
                )
                .await
                .unwrap();
        }));
    }
    for worker in workers {
        worker.await.unwrap();
    }
    server.await.unwrap();
}
