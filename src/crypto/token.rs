use anyhow::{Result, anyhow};
use getrandom::fill;
use zeroize::Zeroizing;

/// Random bytes behind a setup token.
pub const TOKEN_BYTES: usize = 256;
/// Length of the hex encoded token.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Generates a setup token: 256 CSPRNG bytes as lowercase hex.
pub fn generate_token() -> Result<String> {
    let mut buf = Zeroizing::new([0u8; TOKEN_BYTES]);
    fill(&mut buf[..]).map_err(|_| anyhow!("OS random generator unavailable"))?;
    Ok(hex::encode(&buf[..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_is_lowercase_hex_of_fixed_length() {
        let token = generate_token().unwrap();

        assert_eq!(token.len(), TOKEN_LEN);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn tokens_do_not_collide() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_token().unwrap()));
        }
    }
}
