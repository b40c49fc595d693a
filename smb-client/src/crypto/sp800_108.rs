use digest::Mac;

/// SP800-108 KDF in counter mode, the derivation SMB3 key generation
/// uses (MS-SMB2 3.1.4.2).
pub fn derive_key<T: Mac + Clone>(
    mac: T,
    label: &[u8],
    context: &[u8],
    key_len_bits: u32,
) -> Vec<u8> {
    let mut fixed = Vec::with_capacity(label.len() + 1 + context.len() + 4);
    fixed.extend_from_slice(label);
    fixed.push(0);
    fixed.extend_from_slice(context);
    fixed.extend_from_slice(&key_len_bits.to_be_bytes());

    let mut output = Vec::with_capacity((key_len_bits / 8) as usize);
    let mut counter: u32 = 1;
    while output.len() < (key_len_bits / 8) as usize {
        let block = mac
            .clone()
            .chain_update(counter.to_be_bytes())
            .chain_update(&fixed)
            .finalize()
            .into_bytes();
        let needed = (key_len_bits / 8) as usize - output.len();
        output.extend_from_slice(&block[..needed.min(block.len())]);
        counter += 1;
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    #[test]
    fn derives_requested_length() {
        let mac = <Hmac<Sha256>>::new_from_slice(&[0x0B; 16]).unwrap();
        let key = derive_key(mac, b"SMBSigningKey\0", &[0u8; 64], 128);
        assert_eq!(key.len(), 16);
    }

    #[test]
    fn matches_single_block_reference() {
        // One HMAC-SHA256 call over i || label || 0x00 || context || L
        let session_key = [0x42u8; 16];
        let label = b"SMB2AESCMAC\0";
        let context = b"SmbSign\0";
        let mac = <Hmac<Sha256>>::new_from_slice(&session_key).unwrap();
        let derived = derive_key(mac, label, context, 128);

        let mut input = Vec::new();
        input.extend_from_slice(&1u32.to_be_bytes());
        input.extend_from_slice(label);
        input.push(0);
        input.extend_from_slice(context);
        input.extend_from_slice(&128u32.to_be_bytes());
        let reference = <Hmac<Sha256>>::new_from_slice(&session_key)
            .unwrap()
            .chain_update(&input)
            .finalize()
            .into_bytes();
        assert_eq!(derived, reference[..16].to_vec());
    }
}
