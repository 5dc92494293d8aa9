//! Session id generation.

use rand::Rng;

/// Number of digits in a session id.
pub const SESSION_ID_LEN: usize = 10;

const ID_MODULUS: u64 = 10_000_000_000;

/// Generate a fresh 10-digit session id.
///
/// Draws 48 bits from the thread-local CSPRNG, reduces them modulo 10^10 and
/// zero-pads the result.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 6];
    rand::rng().fill(&mut bytes);
    session_id_from_bytes(bytes)
}

/// Build a session id from 48 random bits (big-endian).
pub fn session_id_from_bytes(bytes: [u8; 6]) -> String {
    let value = bytes
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    format!("{:0width$}", value % ID_MODULUS, width = SESSION_ID_LEN)
}

/// Whether `id` looks like something [`generate_session_id`] produced.
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LEN && id.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_ten_digits() {
        for _ in 0..1000 {
            let id = generate_session_id();
            assert!(is_valid_session_id(&id), "bad id {id}");
        }
    }

    #[test]
    fn low_draw_is_zero_padded() {
        assert_eq!(session_id_from_bytes([0, 0, 0, 0, 0, 7]), "0000000007");
        assert_eq!(session_id_from_bytes([0; 6]), "0000000000");
    }

    #[test]
    fn high_draw_is_reduced() {
        // 2^48 - 1 = 281474976710655
        assert_eq!(session_id_from_bytes([0xff; 6]), "4976710655");
    }

    #[test]
    fn collisions_are_rare() {
        let ids: HashSet<_> = (0..10_000).map(|_| generate_session_id()).collect();
        // Expected collisions for 10^4 draws over 10^10 is ~0.005.
        assert!(ids.len() >= 9_998);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(!is_valid_session_id("123"));
        assert!(!is_valid_session_id("12345678901"));
        assert!(!is_valid_session_id("12345abcde"));
    }
}
