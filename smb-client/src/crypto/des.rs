use des::cipher::BlockEncrypt;
use des::Des;
use digest::KeyInit;

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

/// DESL (MS-NLMP 6): pads the 16-byte hash to 21 bytes, splits it into
/// three 7-byte DES keys and concatenates the three encryptions of the
/// challenge.
pub fn des_long_encrypt(key: &[u8], challenge: &[u8]) -> SMBResult<Vec<u8>> {
    if key.len() != 16 || challenge.len() != 8 {
        return Err(SMBError::crypto_error("Invalid DESL input length"));
    }
    let mut padded = [0u8; 21];
    padded[..16].copy_from_slice(key);

    let mut out = Vec::with_capacity(24);
    for part in padded.chunks_exact(7) {
        out.extend_from_slice(&des_encrypt(&expand_des_key(part), challenge)?);
    }
    Ok(out)
}

/// LMOWFv1 (MS-NLMP 3.3.1): the uppercased password, padded to 14
/// bytes, keys two DES encryptions of a fixed constant.
pub fn lm_hash(password: &str) -> SMBResult<[u8; 16]> {
    const LM_CONSTANT: &[u8; 8] = b"KGS!@#$%";
    let mut padded = [0u8; 14];
    for (slot, byte) in padded.iter_mut().zip(password.to_uppercase().bytes()) {
        *slot = byte;
    }
    let mut hash = [0u8; 16];
    hash[..8].copy_from_slice(&des_encrypt(&expand_des_key(&padded[..7]), LM_CONSTANT)?);
    hash[8..].copy_from_slice(&des_encrypt(&expand_des_key(&padded[7..]), LM_CONSTANT)?);
    Ok(hash)
}

/// Spreads 7 key bytes over 8, leaving room for the DES parity bit.
fn expand_des_key(key: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[0] = key[0] >> 1;
    out[1] = ((key[0] & 0x01) << 6) | (key[1] >> 2);
    out[2] = ((key[1] & 0x03) << 5) | (key[2] >> 3);
    out[3] = ((key[2] & 0x07) << 4) | (key[3] >> 4);
    out[4] = ((key[3] & 0x0F) << 3) | (key[4] >> 5);
    out[5] = ((key[4] & 0x1F) << 2) | (key[5] >> 6);
    out[6] = ((key[5] & 0x3F) << 1) | (key[6] >> 7);
    out[7] = key[6] & 0x7F;
    for byte in &mut out {
        *byte <<= 1;
    }
    out
}

fn des_encrypt(key: &[u8; 8], block: &[u8]) -> SMBResult<Vec<u8>> {
    let des = Des::new_from_slice(key)
        .map_err(|_| SMBError::crypto_error("Invalid DES key length"))?;
    let mut out = vec![0u8; block.len()];
    des.encrypt_block_b2b(block.into(), (&mut *out).into());
    Ok(out)
}
