// Salted password digests stored on account records.
//
// Format: `<salt>$<hex sha-256 of "salt$password">`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, expected)) => digest(salt, password) == expected,
        None => false,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod password_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn it_should_verify_the_original_password() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
    }

    #[rstest]
    fn it_should_reject_a_wrong_password() {
        let stored = hash_password("hunter2");
        assert!(!verify_password("hunter3", &stored));
    }

    #[rstest]
    fn it_should_reject_a_malformed_digest() {
        assert!(!verify_password("hunter2", "no-separator-here"));
    }

    #[rstest]
    fn it_should_salt_each_digest_independently() {
        let first = hash_password("hunter2");
        let second = hash_password("hunter2");
        assert_ne!(first, second);
        assert!(verify_password("hunter2", &first));
        assert!(verify_password("hunter2", &second));
    }
}
