// SPDX-License-Identifier: Apache-2.0

//! Opaque identifier generation for sessions, tasks and tokens.

use rand::Rng;

/// Generates a random lowercase-hex identifier of `bytes` random bytes.
///
/// Used for Redfish task ids, session tokens and IPMI managed-system randoms where the spec
/// requires an opaque value but not a specific format.
pub fn random_hex_id(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut buf = vec![0u8; bytes];
    rng.fill(buf.as_mut_slice());
    hex::encode(buf)
}

/// Generates 16 random bytes, as required for the IPMI RAKP "managed system random number".
pub fn random_16_bytes() -> [u8; 16] {
    let mut rng = rand::thread_rng();
    let mut buf = [0u8; 16];
    rng.fill(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_hex_id_has_expected_length() {
        let id = random_hex_id(8);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_not_trivially_repeated() {
        assert_ne!(random_hex_id(16), random_hex_id(16));
    }
}
