use std::collections::HashSet;

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::crypto::smb2 as crypto;
use crate::protocol::body::{EncryptionCipher, SMBDialect};
use crate::protocol::header::{SMB2Command, SMB2Header};
use crate::protocol::transform::{SMBTransformHeader, TRANSFORM_HEADER_SIZE, TRANSFORM_PROTOCOL_ID};

/// Per-connection signing and sealing state, shared between the send
/// path and the receive loop.
#[derive(Debug, Default)]
pub struct SecurityContext {
    pub dialect: Option<SMBDialect>,
    pub session_id: u64,
    pub signing_required: bool,
    signing_key: Vec<u8>,
    encryption_key: Vec<u8>,
    decryption_key: Vec<u8>,
    pub cipher: Option<EncryptionCipher>,
    /// Session-wide encryption demanded by the server.
    pub encrypt_session: bool,
    /// Trees connected with the encrypt-data share flag.
    encrypted_trees: HashSet<u32>,
    /// SHA-512 transcript of the 3.1.1 handshake, None off 3.1.1.
    pub preauth_hash: Option<[u8; 64]>,
}

impl SecurityContext {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn start_preauth(&mut self) {
        self.preauth_hash = Some([0u8; 64]);
    }

    pub fn update_preauth(&mut self, message: &[u8]) {
        if let Some(hash) = self.preauth_hash.as_mut() {
            crypto::update_preauth_hash(hash, message);
        }
    }

    /// Derives the session keys once authentication completes. Guest
    /// and anonymous sessions have no key material; signing is
    /// disabled for them.
    pub fn session_established(
        &mut self,
        session_key: Option<&[u8; 16]>,
        signing_required: bool,
    ) -> SMBResult<()> {
        let dialect = self
            .dialect
            .ok_or_else(|| SMBError::connection("No negotiated dialect"))?;
        let Some(session_key) = session_key else {
            self.signing_required = false;
            return Ok(());
        };
        let preauth = self.preauth_hash.as_ref().map(|h| &h[..]).unwrap_or(&[]);
        self.signing_key = crypto::generate_signing_key(session_key, dialect, preauth)?;
        if dialect.is_smb3() {
            let keys = crypto::generate_encryption_keys(session_key, dialect, preauth)?;
            self.encryption_key = keys.encryption;
            self.decryption_key = keys.decryption;
        }
        self.signing_required = signing_required;
        Ok(())
    }

    pub fn mark_tree_encrypted(&mut self, tree_id: u32) {
        self.encrypted_trees.insert(tree_id);
    }

    pub fn forget_tree(&mut self, tree_id: u32) {
        self.encrypted_trees.remove(&tree_id);
    }

    fn can_encrypt(&self) -> bool {
        self.cipher.is_some() && !self.encryption_key.is_empty()
    }

    fn should_encrypt(&self, tree_id: u32) -> bool {
        self.can_encrypt() && (self.encrypt_session || self.encrypted_trees.contains(&tree_id))
    }

    /// Signing covers tree connects, anything addressed to a tree and,
    /// on 3.x, the logoff; session-level traffic outside a tree stays
    /// unsigned.
    fn should_sign(&self, command: SMB2Command, tree_id: u32) -> bool {
        if self.session_id == 0 || !self.signing_required || self.signing_key.is_empty() {
            return false;
        }
        command == SMB2Command::TreeConnect
            || tree_id != 0
            || (self.dialect.map_or(false, |d| d.is_smb3()) && command == SMB2Command::Logoff)
    }

    /// Signs or seals an outgoing frame as the session state demands.
    /// Encrypted frames are never also signed.
    pub fn protect(&self, mut frame: Vec<u8>, header: &SMB2Header) -> SMBResult<Vec<u8>> {
        if self.should_encrypt(header.tree_id) {
            let cipher = self
                .cipher
                .ok_or_else(|| SMBError::crypto_error("No negotiated cipher"))?;
            return crypto::encrypt_message(&self.encryption_key, cipher, self.session_id, &frame);
        }
        if self.should_sign(header.command, header.tree_id) {
            let dialect = self
                .dialect
                .ok_or_else(|| SMBError::connection("No negotiated dialect"))?;
            crypto::sign_message(&self.signing_key, dialect, &mut frame)?;
        }
        Ok(frame)
    }

    /// Unwraps a received frame if it arrived inside a transform
    /// envelope; plain frames pass through untouched.
    pub fn open(&self, payload: Vec<u8>) -> SMBResult<Vec<u8>> {
        if !payload.starts_with(&TRANSFORM_PROTOCOL_ID) {
            return Ok(payload);
        }
        if payload.len() < TRANSFORM_HEADER_SIZE {
            return Err(SMBError::parse_error("Truncated transform envelope"));
        }
        let cipher = self
            .cipher
            .ok_or_else(|| SMBError::crypto_error("Encrypted frame without a cipher"))?;
        let header = SMBTransformHeader::parse(&payload[..TRANSFORM_HEADER_SIZE])?;
        crypto::decrypt_message(
            &self.decryption_key,
            cipher,
            &header,
            &payload[TRANSFORM_HEADER_SIZE..],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::SMB2Flags;

    fn established_context(dialect: SMBDialect) -> SecurityContext {
        let mut context = SecurityContext {
            dialect: Some(dialect),
            session_id: 7,
            cipher: Some(EncryptionCipher::AES128GCM),
            ..Default::default()
        };
        context.session_established(Some(&[0x17u8; 16]), true).unwrap();
        context
    }

    fn frame_for(command: SMB2Command, tree_id: u32) -> (Vec<u8>, SMB2Header) {
        let mut header = SMB2Header::new_request(command);
        header.tree_id = tree_id;
        let mut frame = header.encode();
        frame.extend_from_slice(&[0u8; 8]);
        (frame, header)
    }

    #[test]
    fn signs_tree_scoped_commands() {
        let context = established_context(SMBDialect::V3_0_0);
        let (frame, header) = frame_for(SMB2Command::Create, 3);
        let protected = context.protect(frame, &header).unwrap();
        assert_eq!(protected[0], 0xFE);
        assert_ne!(&protected[48..64], &[0u8; 16]);
    }

    #[test]
    fn negotiate_is_never_signed() {
        let context = established_context(SMBDialect::V3_0_0);
        let (frame, header) = frame_for(SMB2Command::Negotiate, 0);
        let protected = context.protect(frame, &header).unwrap();
        assert_eq!(&protected[48..64], &[0u8; 16]);
    }

    #[test]
    fn tree_connect_is_signed_before_a_tree_exists() {
        let context = established_context(SMBDialect::V2_1_0);
        let (frame, header) = frame_for(SMB2Command::TreeConnect, 0);
        let protected = context.protect(frame, &header).unwrap();
        assert_ne!(&protected[48..64], &[0u8; 16]);
    }

    #[test]
    fn session_traffic_outside_a_tree_is_not_signed() {
        let context = established_context(SMBDialect::V2_1_0);
        for command in [SMB2Command::Echo, SMB2Command::Logoff] {
            let (frame, header) = frame_for(command, 0);
            let protected = context.protect(frame, &header).unwrap();
            assert_eq!(&protected[48..64], &[0u8; 16]);
        }
    }

    #[test]
    fn smb3_logoff_is_signed() {
        let mut context = established_context(SMBDialect::V3_0_0);
        // keep the signing path instead of the sealing path
        context.cipher = None;
        let (frame, header) = frame_for(SMB2Command::Logoff, 0);
        let protected = context.protect(frame, &header).unwrap();
        assert_ne!(&protected[48..64], &[0u8; 16]);
    }

    #[test]
    fn guest_session_disables_signing() {
        let mut context = SecurityContext {
            dialect: Some(SMBDialect::V3_0_0),
            session_id: 7,
            ..Default::default()
        };
        context.session_established(None, true).unwrap();
        assert!(!context.signing_required);
        let (frame, header) = frame_for(SMB2Command::Create, 3);
        let protected = context.protect(frame, &header).unwrap();
        assert_eq!(&protected[48..64], &[0u8; 16]);
    }

    #[test]
    fn encrypted_tree_frames_are_sealed_not_signed() {
        let mut context = established_context(SMBDialect::V3_0_0);
        context.mark_tree_encrypted(5);
        let (frame, header) = frame_for(SMB2Command::Create, 5);
        let protected = context.protect(frame, &header).unwrap();
        assert_eq!(&protected[..4], &TRANSFORM_PROTOCOL_ID);
    }

    #[test]
    fn open_unseals_a_server_sealed_frame() {
        let context = established_context(SMBDialect::V3_0_0);
        // seal with the server-to-client key the same derivation yields
        let keys =
            crate::crypto::smb2::generate_encryption_keys(&[0x17u8; 16], SMBDialect::V3_0_0, &[])
                .unwrap();
        let plain = b"\xFESMB server response".to_vec();
        let sealed =
            crate::crypto::smb2::encrypt_message(&keys.decryption, EncryptionCipher::AES128GCM, 7, &plain)
                .unwrap();
        assert_eq!(context.open(sealed).unwrap(), plain);
    }

    #[test]
    fn plain_frames_pass_open_unchanged() {
        let context = SecurityContext::default();
        let mut header = SMB2Header::new_request(SMB2Command::Echo);
        header.flags = SMB2Flags::SERVER_TO_REDIR;
        let frame = header.encode();
        assert_eq!(context.open(frame.clone()).unwrap(), frame);
    }

    #[test]
    fn preauth_transcript_tracks_messages() {
        let mut context = SecurityContext::default();
        context.start_preauth();
        let initial = context.preauth_hash.unwrap();
        context.update_preauth(b"negotiate request");
        assert_ne!(context.preauth_hash.unwrap(), initial);
    }
}
