use aes::Aes128;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes128Gcm;
use ccm::consts::{U11, U16};
use ccm::Ccm;
use cmac::Cmac;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::crypto::sp800_108;
use crate::protocol::body::{EncryptionCipher, SMBDialect};
use crate::protocol::transform::SMBTransformHeader;

type Aes128Ccm = Ccm<Aes128, U16, U11>;

pub const SIGNATURE_OFFSET: usize = 48;
pub const SIGNATURE_SIZE: usize = 16;

pub fn calculate_signature(
    signing_key: &[u8],
    dialect: SMBDialect,
    message: &[u8],
) -> SMBResult<[u8; SIGNATURE_SIZE]> {
    let digest = if dialect == SMBDialect::V2_0_2 || dialect == SMBDialect::V2_1_0 {
        new_hmac_sha256(signing_key)?
            .chain_update(message)
            .finalize()
            .into_bytes()
            .to_vec()
    } else {
        <Cmac<Aes128> as Mac>::new_from_slice(signing_key)
            .map_err(|_| SMBError::crypto_error("Invalid signing key length"))?
            .chain_update(message)
            .finalize()
            .into_bytes()
            .to_vec()
    };
    let mut signature = [0u8; SIGNATURE_SIZE];
    signature.copy_from_slice(&digest[..SIGNATURE_SIZE]);
    Ok(signature)
}

/// Zeroes the signature field, signs the whole frame and writes the
/// signature back in place.
pub fn sign_message(
    signing_key: &[u8],
    dialect: SMBDialect,
    message: &mut [u8],
) -> SMBResult<()> {
    if message.len() < SIGNATURE_OFFSET + SIGNATURE_SIZE {
        return Err(SMBError::crypto_error("Message too short to sign"));
    }
    message[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE].fill(0);
    let signature = calculate_signature(signing_key, dialect, message)?;
    message[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE_SIZE].copy_from_slice(&signature);
    Ok(())
}

pub fn generate_signing_key(
    session_key: &[u8],
    dialect: SMBDialect,
    preauth_hash: &[u8],
) -> SMBResult<Vec<u8>> {
    if dialect == SMBDialect::V2_0_2 || dialect == SMBDialect::V2_1_0 {
        return Ok(session_key.to_vec());
    }
    let (label, context): (&[u8], &[u8]) = if dialect == SMBDialect::V3_1_1 {
        if preauth_hash.is_empty() {
            return Err(SMBError::crypto_error("Missing preauth hash for 3.1.1"));
        }
        (b"SMBSigningKey\0", preauth_hash)
    } else {
        (b"SMB2AESCMAC\0", b"SmbSign\0")
    };
    let hmac = new_hmac_sha256(session_key)?;
    Ok(sp800_108::derive_key(hmac, label, context, 128))
}

/// Client-to-server and server-to-client AEAD keys.
pub struct EncryptionKeys {
    pub encryption: Vec<u8>,
    pub decryption: Vec<u8>,
}

pub fn generate_encryption_keys(
    session_key: &[u8],
    dialect: SMBDialect,
    preauth_hash: &[u8],
) -> SMBResult<EncryptionKeys> {
    let (enc_label, enc_context, dec_label, dec_context): (&[u8], &[u8], &[u8], &[u8]) =
        if dialect == SMBDialect::V3_1_1 {
            if preauth_hash.is_empty() {
                return Err(SMBError::crypto_error("Missing preauth hash for 3.1.1"));
            }
            (
                b"SMBC2SCipherKey\0",
                preauth_hash,
                b"SMBS2CCipherKey\0",
                preauth_hash,
            )
        } else {
            (
                b"SMB2AESCCM\0",
                b"ServerIn \0",
                b"SMB2AESCCM\0",
                b"ServerOut\0",
            )
        };
    Ok(EncryptionKeys {
        encryption: sp800_108::derive_key(new_hmac_sha256(session_key)?, enc_label, enc_context, 128),
        decryption: sp800_108::derive_key(new_hmac_sha256(session_key)?, dec_label, dec_context, 128),
    })
}

/// Wraps a plain frame in a transform envelope (MS-SMB2 3.1.4.3).
pub fn encrypt_message(
    key: &[u8],
    cipher: EncryptionCipher,
    session_id: u64,
    message: &[u8],
) -> SMBResult<Vec<u8>> {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce[..nonce_length(cipher)]);
    let mut header = SMBTransformHeader::new(nonce, message.len() as u32, session_id);
    let aad = header.associated_data();
    let payload = Payload {
        msg: message,
        aad: &aad,
    };
    let mut sealed = match cipher {
        EncryptionCipher::AES128GCM => Aes128Gcm::new_from_slice(key)
            .map_err(|_| SMBError::crypto_error("Invalid encryption key length"))?
            .encrypt(GenericArray::from_slice(&nonce[..12]), payload),
        EncryptionCipher::AES128CCM => Aes128Ccm::new_from_slice(key)
            .map_err(|_| SMBError::crypto_error("Invalid encryption key length"))?
            .encrypt(GenericArray::from_slice(&nonce[..11]), payload),
    }
    .map_err(|_| SMBError::crypto_error("Encryption failed"))?;
    // AEAD output is ciphertext followed by the 16-byte tag
    let tag_start = sealed.len() - SIGNATURE_SIZE;
    header.signature.copy_from_slice(&sealed[tag_start..]);
    sealed.truncate(tag_start);

    let mut out = header.encode();
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Unwraps and authenticates a transform envelope.
pub fn decrypt_message(
    key: &[u8],
    cipher: EncryptionCipher,
    header: &SMBTransformHeader,
    ciphertext: &[u8],
) -> SMBResult<Vec<u8>> {
    let mut sealed = Vec::with_capacity(ciphertext.len() + SIGNATURE_SIZE);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(&header.signature);
    let aad = header.associated_data();
    let payload = Payload {
        msg: &sealed,
        aad: &aad,
    };
    let plain = match cipher {
        EncryptionCipher::AES128GCM => Aes128Gcm::new_from_slice(key)
            .map_err(|_| SMBError::crypto_error("Invalid decryption key length"))?
            .decrypt(GenericArray::from_slice(&header.nonce[..12]), payload),
        EncryptionCipher::AES128CCM => Aes128Ccm::new_from_slice(key)
            .map_err(|_| SMBError::crypto_error("Invalid decryption key length"))?
            .decrypt(GenericArray::from_slice(&header.nonce[..11]), payload),
    }
    .map_err(|_| SMBError::crypto_error("Decryption failed"))?;
    if plain.len() != header.original_message_size as usize {
        return Err(SMBError::crypto_error("Decrypted size mismatch"));
    }
    Ok(plain)
}

/// Folds one handshake frame into the 3.1.1 preauth transcript
/// (MS-SMB2 3.2.5.2): H' = SHA-512(H || message).
pub fn update_preauth_hash(hash: &mut [u8; 64], message: &[u8]) {
    let digest = Sha512::new()
        .chain_update(&hash[..])
        .chain_update(message)
        .finalize();
    hash.copy_from_slice(&digest);
}

fn new_hmac_sha256(key: &[u8]) -> SMBResult<Hmac<Sha256>> {
    <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|_| SMBError::crypto_error("Invalid key length"))
}

fn nonce_length(cipher: EncryptionCipher) -> usize {
    match cipher {
        EncryptionCipher::AES128CCM => 11,
        EncryptionCipher::AES128GCM => 12,
    }
}
