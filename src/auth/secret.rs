use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("Key cannot be empty")]
    Empty,
    #[error("Key should be at least {MIN_SECRET_LEN} characters long")]
    TooShort,
    #[error("Key contains invalid characters")]
    InvalidCharacters,
}

/// URL-safe base64 of `bytes` random bytes.
pub fn generate_key(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE.encode(buf)
}

/// `length` random ASCII letters and digits.
pub fn generate_readable_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Accepts URL-safe base64 or plain alphanumeric keys of sufficient length.
pub fn validate_key(key: &str) -> Result<(), SecretError> {
    if key.is_empty() {
        return Err(SecretError::Empty);
    }
    if key.len() < MIN_SECRET_LEN {
        return Err(SecretError::TooShort);
    }

    let decodes = URL_SAFE.decode(key).is_ok() || URL_SAFE_NO_PAD.decode(key).is_ok();
    if decodes || key.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(SecretError::InvalidCharacters)
    }
}
