use std::net::IpAddr;
use std::time::Duration;

use rand::Rng;
use tokio::net::UdpSocket;

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::ByteReader;
use crate::netbios::packet::{encode_name, SMB_SERVER_SUFFIX};

const NAME_SERVICE_PORT: u16 = 137;
const NODE_STATUS_TYPE: u16 = 0x0021; // NBSTAT
const CLASS_IN: u16 = 0x0001;
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// RFC 1002 4.2.17 node status query. Returns the server's registered
/// file-service name, used to retry a refused session request with the
/// real called name.
pub async fn node_status_query(address: IpAddr) -> SMBResult<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.map_err(SMBError::io_error)?;
    socket
        .connect((address, NAME_SERVICE_PORT))
        .await
        .map_err(SMBError::io_error)?;

    let transaction_id: u16 = rand::thread_rng().gen();
    let request = encode_node_status_request(transaction_id);
    socket.send(&request).await.map_err(SMBError::io_error)?;

    let mut response = vec![0u8; 1024];
    let received = tokio::time::timeout(QUERY_TIMEOUT, socket.recv(&mut response))
        .await
        .map_err(|_| SMBError::timeout(QUERY_TIMEOUT))?
        .map_err(SMBError::io_error)?;
    parse_node_status_response(&response[..received], transaction_id)
}

fn encode_node_status_request(transaction_id: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(50);
    out.extend_from_slice(&transaction_id.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // flags
    out.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]); // AN/NS/AR counts
    out.extend_from_slice(&encode_name("*", 0x00));
    out.extend_from_slice(&NODE_STATUS_TYPE.to_be_bytes());
    out.extend_from_slice(&CLASS_IN.to_be_bytes());
    out
}

fn parse_node_status_response(response: &[u8], transaction_id: u16) -> SMBResult<String> {
    let mut reader = ByteReader::new(response);
    // the name-service header is big-endian
    let id = u16::from_be_bytes(reader.array()?);
    if id != transaction_id {
        return Err(SMBError::parse_error("Node status transaction id mismatch"));
    }
    reader.skip(2)?; // flags
    reader.skip(8)?; // counts
    reader.skip(34)?; // echoed question name
    reader.skip(8)?; // type + class + TTL
    reader.skip(2)?; // RDLENGTH
    let name_count = reader.u8()? as usize;
    for _ in 0..name_count {
        let entry = reader.bytes(18)?;
        let suffix = entry[15];
        let flags = u16::from_be_bytes([entry[16], entry[17]]);
        let group = flags & 0x8000 != 0;
        if suffix == SMB_SERVER_SUFFIX && !group {
            return Ok(String::from_utf8_lossy(&entry[..15]).trim_end().to_string());
        }
    }
    Err(SMBError::connection(
        "Server registers no file service name",
    ))
}
