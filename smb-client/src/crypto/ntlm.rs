use digest::Digest;
use hmac::{Hmac, Mac};
use md4::Md4;
use md5::Md5;
use rc4::{consts::U16, KeyInit, Rc4, StreamCipher};

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::byte_helper::to_utf16le;
use crate::crypto::des::{des_long_encrypt, lm_hash};

/// NTOWFv1 (MS-NLMP 3.3.1): MD4 over the UTF-16 password.
pub fn ntowf_v1(password: &str) -> [u8; 16] {
    Md4::digest(to_utf16le(password)).into()
}

/// NTOWFv2 (MS-NLMP 3.3.2): HMAC-MD5 keyed with NTOWFv1 over the
/// uppercased user name concatenated with the domain.
pub fn ntowf_v2(password: &str, user: &str, domain: &str) -> SMBResult<[u8; 16]> {
    let identity = to_utf16le(&format!("{}{}", user.to_uppercase(), domain));
    let digest = new_hmac_md5(&ntowf_v1(password))?
        .chain_update(identity)
        .finalize()
        .into_bytes();
    Ok(digest.into())
}

/// NTLMv1 challenge response plus its session base key.
pub fn compute_v1_response(
    password: &str,
    server_challenge: &[u8; 8],
) -> SMBResult<(Vec<u8>, [u8; 16])> {
    let hash = ntowf_v1(password);
    let response = des_long_encrypt(&hash, server_challenge)?;
    let session_base_key = Md4::digest(hash).into();
    Ok((response, session_base_key))
}

/// LMv1 challenge response (MS-NLMP 3.3.1), carried in the
/// case-insensitive password field next to the NTLMv1 response.
pub fn compute_lm_v1_response(password: &str, server_challenge: &[u8; 8]) -> SMBResult<Vec<u8>> {
    des_long_encrypt(&lm_hash(password)?, server_challenge)
}

/// The NTLMv2 proof, blob and key material (MS-NLMP 3.3.2).
pub struct V2Response {
    pub nt_response: Vec<u8>,
    pub lm_response: Vec<u8>,
    pub session_base_key: [u8; 16],
}

/// `timestamp` is a FILETIME; `target_info` the server's AV pairs
/// echoed back verbatim.
pub fn compute_v2_response(
    password: &str,
    user: &str,
    domain: &str,
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
    timestamp: u64,
    target_info: &[u8],
) -> SMBResult<V2Response> {
    let key = ntowf_v2(password, user, domain)?;

    let mut temp = Vec::with_capacity(28 + target_info.len());
    temp.push(1); // Responserversion
    temp.push(1); // HiResponserversion
    temp.extend_from_slice(&[0u8; 6]);
    temp.extend_from_slice(&timestamp.to_le_bytes());
    temp.extend_from_slice(client_challenge);
    temp.extend_from_slice(&[0u8; 4]);
    temp.extend_from_slice(target_info);
    temp.extend_from_slice(&[0u8; 4]);

    let nt_proof: [u8; 16] = new_hmac_md5(&key)?
        .chain_update(server_challenge)
        .chain_update(&temp)
        .finalize()
        .into_bytes()
        .into();
    let mut nt_response = nt_proof.to_vec();
    nt_response.extend_from_slice(&temp);

    let mut lm_response = new_hmac_md5(&key)?
        .chain_update(server_challenge)
        .chain_update(client_challenge)
        .finalize()
        .into_bytes()
        .to_vec();
    lm_response.extend_from_slice(client_challenge);

    let session_base_key = new_hmac_md5(&key)?
        .chain_update(nt_proof)
        .finalize()
        .into_bytes()
        .into();
    Ok(V2Response {
        nt_response,
        lm_response,
        session_base_key,
    })
}

/// RC4 pass used for the KEY_EXCH exported session key; RC4 is its own
/// inverse.
pub fn rc4_transform(key: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let mut cipher = <Rc4<U16>>::new(key.into());
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    out
}

fn new_hmac_md5(key: &[u8]) -> SMBResult<Hmac<Md5>> {
    <Hmac<Md5> as Mac>::new_from_slice(key)
        .map_err(|_| SMBError::crypto_error("Invalid key length"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // MS-NLMP 4.2: user "User", domain "Domain", password "Password"
    const USER: &str = "User";
    const DOMAIN: &str = "Domain";
    const PASSWORD: &str = "Password";
    const SERVER_CHALLENGE: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF];
    const CLIENT_CHALLENGE: [u8; 8] = [0xAA; 8];

    #[test]
    fn ntowf_v1_matches_nlmp_vector() {
        assert_eq!(
            ntowf_v1(PASSWORD),
            [
                0xA4, 0xF4, 0x9C, 0x40, 0x65, 0x10, 0xBD, 0xCA, 0xB6, 0x82, 0x4E, 0xE7, 0xC3,
                0x0F, 0xD8, 0x52
            ]
        );
    }

    #[test]
    fn ntowf_v2_matches_nlmp_vector() {
        assert_eq!(
            ntowf_v2(PASSWORD, USER, DOMAIN).unwrap(),
            [
                0x0C, 0x86, 0x8A, 0x40, 0x3B, 0xFD, 0x7A, 0x93, 0xA3, 0x00, 0x1E, 0xF2, 0x2E,
                0xF0, 0x2E, 0x3F
            ]
        );
    }

    #[test]
    fn v1_response_matches_nlmp_vector() {
        let (response, _) = compute_v1_response(PASSWORD, &SERVER_CHALLENGE).unwrap();
        assert_eq!(
            response,
            vec![
                0x67, 0xC4, 0x30, 0x11, 0xF3, 0x02, 0x98, 0xA2, 0xAD, 0x35, 0xEC, 0xE6, 0x4F,
                0x16, 0x33, 0x1C, 0x44, 0xBD, 0xBE, 0xD9, 0x27, 0x84, 0x1F, 0x94
            ]
        );
    }

    #[test]
    fn lm_v1_response_matches_nlmp_vector() {
        let response = compute_lm_v1_response(PASSWORD, &SERVER_CHALLENGE).unwrap();
        assert_eq!(
            response,
            vec![
                0x98, 0xDE, 0xF7, 0xB8, 0x7F, 0x88, 0xAA, 0x5D, 0xAF, 0xE2, 0xDF, 0x77, 0x96,
                0x88, 0xA1, 0x72, 0xDE, 0xF1, 0x1C, 0x7D, 0x5C, 0xCD, 0xEF, 0x13
            ]
        );
    }

    #[test]
    fn v2_proof_matches_nlmp_vector() {
        // MS-NLMP 4.2.4 uses a zero timestamp and a fixed target info
        let target_info = [
            0x02, 0x00, 0x0C, 0x00, 0x44, 0x00, 0x6F, 0x00, 0x6D, 0x00, 0x61, 0x00, 0x69, 0x00,
            0x6E, 0x00, 0x01, 0x00, 0x0C, 0x00, 0x53, 0x00, 0x65, 0x00, 0x72, 0x00, 0x76, 0x00,
            0x65, 0x00, 0x72, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let result = compute_v2_response(
            PASSWORD,
            USER,
            DOMAIN,
            &SERVER_CHALLENGE,
            &CLIENT_CHALLENGE,
            0,
            &target_info,
        )
        .unwrap();
        assert_eq!(
            &result.nt_response[..16],
            &[
                0x68, 0xCD, 0x0A, 0xB8, 0x51, 0xE5, 0x1C, 0x96, 0xAA, 0xBC, 0x92, 0x7B, 0xEB,
                0xEF, 0x6A, 0x1C
            ]
        );
        assert_eq!(
            result.session_base_key,
            [
                0x8D, 0xE4, 0x0C, 0xCA, 0xDB, 0xC1, 0x4A, 0x82, 0xF1, 0x5C, 0xB0, 0xAD, 0x0D,
                0xE9, 0x5C, 0xA3
            ]
        );
        assert_eq!(
            &result.lm_response[..16],
            &[
                0x86, 0xC3, 0x50, 0x97, 0xAC, 0x9C, 0xEC, 0x10, 0x25, 0x54, 0x76, 0x4A, 0x57,
                0xCC, 0xCC, 0x19
            ]
        );
        assert_eq!(&result.lm_response[16..], &CLIENT_CHALLENGE);
    }

    #[test]
    fn rc4_is_symmetric() {
        let key = [0x55u8; 16];
        let sealed = rc4_transform(&key, b"random session key");
        assert_eq!(rc4_transform(&key, &sealed), b"random session key");
    }
}
