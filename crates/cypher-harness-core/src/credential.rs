use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Random bytes behind each API key (256 bits).
pub const API_KEY_BYTES: usize = 32;

/// Generate a fresh bearer credential: 32 CSPRNG bytes, base64url without
/// padding (43 characters of `[A-Za-z0-9_-]`).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_url_safe_and_full_length() {
        let key = generate_api_key();
        assert_eq!(key.len(), 43);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn ten_thousand_keys_do_not_collide() {
        let keys: HashSet<String> = (0..10_000).map(|_| generate_api_key()).collect();
        assert_eq!(keys.len(), 10_000);
    }
}
