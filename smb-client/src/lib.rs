//! # SMB Client
//!
//! An asynchronous client for the **Server Message Block (SMB) Protocol**,
//! covering the legacy NT LM 0.12 dialect ([\[MS-CIFS\]](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-cifs/d416ff7c-c536-406e-a951-4f04b2fd1d2b))
//! and versions 2.0.2 through 3.1.1
//! ([\[MS-SMB2\]](https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-smb2/5606ad47-5ee0-437a-817e-70c366052962)).
//!
//! This crate provides:
//! - **Protocol layer** ([`protocol`]): Wire-format types for SMB1/SMB2 headers,
//!   command bodies and the SMB3 transform envelope.
//! - **Client layer** ([`client`]): The connection/correlation engine, credit
//!   accounting, signing and sealing, the dialect strategy clients and the
//!   per-share file stores.
//! - **Transport** ([`netbios`]): NetBIOS session-service framing, name encoding
//!   and the node-status name query.
//! - **Authentication** ([`auth`]): The NTLM token exchange, with the underlying
//!   primitives in [`crypto`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use smb_client::client::{SMBClient, SMBClientConfig, SMB2Client, SMBTransport};
//! use smb_client::client::SMBFileStore;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> smb_client_core::SMBResult<()> {
//!     let cancel = CancellationToken::new();
//!     let mut client = SMB2Client::new(SMBClientConfig::default());
//!     if client.connect("192.168.1.10".parse().map_err(|_| smb_client_core::error::SMBError::connection("bad address"))?, SMBTransport::DirectTcp, &cancel).await? {
//!         client.login("WORKGROUP", "user", "pass", &cancel).await?;
//!         let share = client.tree_connect("public", &cancel).await?;
//!         share.disconnect(&cancel).await?;
//!         client.disconnect().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
mod byte_helper;
pub mod client;
pub mod crypto;
pub mod netbios;
pub mod protocol;
