use rand::RngCore;
use sha2::{Digest, Sha256};

/// A random 32-bit salt issued to a peer in the `RPTL` `ACK`, challenging it
/// to prove knowledge of the shared password.
pub fn generate_salt() -> u32 {
    rand::thread_rng().next_u32()
}

/// `SHA-256(salt_be_bytes ++ password)`, matching the wire's salt-then-password
/// concatenation order.
pub fn challenge_hash(salt: u32, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.to_be_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Constant-time comparison of the peer-supplied hash against the expected
/// one, so a timing side-channel can't leak which prefix bytes matched.
pub fn verify_challenge(salt: u32, password: &str, supplied: &[u8]) -> bool {
    let expected = challenge_hash(salt, password);
    if supplied.len() != expected.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in expected.iter().zip(supplied.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_hash() {
        let salt = 0xDEAD_BEEF;
        let hash = challenge_hash(salt, "hunter2");
        assert!(verify_challenge(salt, "hunter2", &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let salt = 0xDEAD_BEEF;
        let hash = challenge_hash(salt, "hunter2");
        assert!(!verify_challenge(salt, "wrongpass", &hash));
    }

    #[test]
    fn verify_rejects_wrong_length() {
        assert!(!verify_challenge(1, "x", &[0u8; 4]));
    }
}
