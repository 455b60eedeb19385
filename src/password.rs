//! Salted PBKDF2-SHA256 password hashes.
//!
//! Stored as `pbkdf2:sha256:<rounds>$<salt>$<hex digest>`. The round count
//! is part of the stored value, so raising `PASSWORD_ROUNDS` later does not
//! invalidate existing hashes.

use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const METHOD: &str = "pbkdf2:sha256";
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

pub fn hash_password(password: &str, rounds: u32) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();
    let digest = derive(password, &salt, rounds);
    format!("{METHOD}:{rounds}${salt}${}", hex::encode(digest))
}

/// `false` for a wrong password and for any hash this module did not write.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(method), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let Some(rounds) = method
        .strip_prefix(METHOD)
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|r| r.parse::<u32>().ok())
    else {
        return false;
    };

    let Ok(expected) = hex::decode(expected) else {
        return false;
    };
    derive(password, salt, rounds).as_slice().ct_eq(&expected).into()
}

fn derive(password: &str, salt: &str, rounds: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), rounds, &mut out);
    out
}
