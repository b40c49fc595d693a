//! Client-side raw NTLMSSP exchange. Tokens travel in the security
//! buffers of session setup messages; no SPNEGO wrapping is applied.

pub mod ntlm_message;

use rand::RngCore;

use smb_client_core::error::SMBError;
use smb_client_core::SMBResult;

use crate::auth::ntlm_message::{
    NegotiateFlags, NtlmAuthenticateMessage, NtlmChallengeMessage, NtlmNegotiateMessage,
};
use crate::crypto::ntlm;
use crate::protocol::body::FileTime;

/// Produces the NEGOTIATE token, then turns the server's CHALLENGE
/// into an AUTHENTICATE token plus the session key.
#[derive(Debug, Clone)]
pub struct NtlmClient {
    pub user: String,
    pub domain: String,
    password: String,
    pub workstation: String,
}

pub struct NtlmAuthenticateOutcome {
    pub token: Vec<u8>,
    pub session_key: [u8; 16],
}

impl NtlmClient {
    pub fn new(user: String, domain: String, password: String) -> Self {
        Self {
            user,
            domain,
            password,
            workstation: String::new(),
        }
    }

    pub fn negotiate_token(&self) -> Vec<u8> {
        NtlmNegotiateMessage::new().encode()
    }

    pub fn authenticate_token(&self, challenge_token: &[u8]) -> SMBResult<NtlmAuthenticateOutcome> {
        let challenge = NtlmChallengeMessage::parse(challenge_token)?;
        if !challenge.flags.contains(NegotiateFlags::NTLM) {
            return Err(SMBError::authentication("Server refused NTLM"));
        }

        let mut client_challenge = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut client_challenge);
        let timestamp = challenge.timestamp().unwrap_or_else(|| FileTime::now().0);

        let response = ntlm::compute_v2_response(
            &self.password,
            &self.user,
            &self.domain,
            &challenge.server_challenge,
            &client_challenge,
            timestamp,
            &challenge.target_info,
        )?;

        // NTLMv2 key exchange key is the session base key
        let (session_key, encrypted_session_key) =
            if challenge.flags.contains(NegotiateFlags::KEY_EXCH) {
                let mut exported = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut exported);
                let sealed = ntlm::rc4_transform(&response.session_base_key, &exported);
                (exported, sealed)
            } else {
                (response.session_base_key, Vec::new())
            };

        let token = NtlmAuthenticateMessage {
            flags: challenge.flags,
            lm_response: response.lm_response,
            nt_response: response.nt_response,
            domain: self.domain.clone(),
            user: self.user.clone(),
            workstation: self.workstation.clone(),
            encrypted_session_key,
        }
        .encode();
        Ok(NtlmAuthenticateOutcome { token, session_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ntlm_message::NTLMSSP_SIGNATURE;

    fn challenge_token(flags: NegotiateFlags) -> Vec<u8> {
        let mut message = vec![0u8; 48];
        message[..8].copy_from_slice(&NTLMSSP_SIGNATURE);
        message[8] = 2;
        message[20..24].copy_from_slice(&flags.bits().to_le_bytes());
        message[24..32].copy_from_slice(&[0x42; 8]);
        message[44..48].copy_from_slice(&48u32.to_le_bytes());
        message
    }

    #[test]
    fn negotiate_token_starts_the_exchange() {
        let client = NtlmClient::new("u".into(), "D".into(), "p".into());
        assert_eq!(&client.negotiate_token()[..8], &NTLMSSP_SIGNATURE);
    }

    #[test]
    fn key_exch_seals_a_random_session_key() {
        let client = NtlmClient::new("User".into(), "Domain".into(), "Password".into());
        let outcome = client
            .authenticate_token(&challenge_token(
                NegotiateFlags::NTLM | NegotiateFlags::KEY_EXCH,
            ))
            .unwrap();
        let auth = outcome.token;
        let key_length = u16::from_le_bytes([auth[52], auth[53]]);
        assert_eq!(key_length, 16);
    }

    #[test]
    fn without_key_exch_session_key_is_the_base_key() {
        let client = NtlmClient::new("User".into(), "Domain".into(), "Password".into());
        let outcome = client
            .authenticate_token(&challenge_token(NegotiateFlags::NTLM))
            .unwrap();
        let auth = outcome.token;
        let key_length = u16::from_le_bytes([auth[52], auth[53]]);
        assert_eq!(key_length, 0);
        assert_ne!(outcome.session_key, [0u8; 16]);
    }

    #[test]
    fn refusing_ntlm_fails() {
        let client = NtlmClient::new("u".into(), "D".into(), "p".into());
        assert!(client
            .authenticate_token(&challenge_token(NegotiateFlags::UNICODE))
            .is_err());
    }
}
