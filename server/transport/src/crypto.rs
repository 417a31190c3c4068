use aes_kw::KekAes256;
use sha2::{Digest, Sha256};

use crate::error::{TransportError, TransportResult};

/// Derives the AES-256 key-wrap key from the configured preshared password.
#[derive(Clone)]
pub struct PresharedKey {
    kek: KekAes256,
}

impl PresharedKey {
    pub fn from_password(password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        Self {
            kek: KekAes256::new(&digest.into()),
        }
    }

    /// Wraps a datagram payload before it goes on the wire. The wrapped
    /// payload is always 8 bytes longer than the next multiple of 8 of the
    /// input length.
    pub fn wrap(&self, plaintext: &[u8]) -> TransportResult<Vec<u8>> {
        self.kek.wrap_with_padding_vec(plaintext).map_err(|_| TransportError::Crypto)
    }

    pub fn unwrap(&self, wrapped: &[u8]) -> TransportResult<Vec<u8>> {
        self.kek.unwrap_with_padding_vec(wrapped).map_err(|_| TransportError::Crypto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wrap() {
        let key = PresharedKey::from_password("hunter2");
        let wrapped = key.wrap(b"radio traffic payload").unwrap();
        let unwrapped = key.unwrap(&wrapped).unwrap();
        assert_eq!(unwrapped, b"radio traffic payload");
    }

    #[test]
    fn different_passwords_do_not_interoperate() {
        let a = PresharedKey::from_password("alpha");
        let b = PresharedKey::from_password("bravo");
        let wrapped = a.wrap(b"secret").unwrap();
        assert!(b.unwrap(&wrapped).is_err());
    }
}
