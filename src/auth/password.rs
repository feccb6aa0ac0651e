//! Account password hashing
//!
//! Account passwords are stored as Argon2id PHC strings. Logins go through
//! [`verify_login`], which runs a full verification even when the account
//! name is unknown so both failures cost the same.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::sync::OnceLock;
use tracing::error;

use crate::types::{Result, SurveyError};

/// Plaintext behind the decoy hash checked for unknown accounts
const DECOY_PASSWORD: &str = "mapsurvey-unknown-account";

/// Hash an account password
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SurveyError::Internal(format!("Failed to hash password: {e}")))
}

/// Check a password against a stored hash.
///
/// A stored hash that does not parse is a data problem, reported as
/// `Internal` rather than as a failed login.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| SurveyError::Internal(format!("Stored password hash is malformed: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Check login credentials. `stored_hash` is `None` when no account has the
/// requested name; the result is then always `false`.
pub fn verify_login(password: &str, stored_hash: Option<&str>) -> Result<bool> {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(decoy) = decoy_hash() {
                let _ = verify_password(password, decoy);
            }
            Ok(false)
        }
    }
}

fn decoy_hash() -> Option<&'static str> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();
    DECOY
        .get_or_init(|| match hash_password(DECOY_PASSWORD) {
            Ok(hash) => Some(hash),
            Err(e) => {
                error!(error = %e, "Could not prepare decoy password hash");
                None
            }
        })
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_password_round_trip() {
        let hash = hash_password("survey owner pass").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("survey owner pass", &hash).unwrap());
        assert!(!verify_password("survey owner pas", &hash).unwrap());
    }

    #[test]
    fn test_accounts_with_same_password_get_distinct_hashes() {
        let alice = hash_password("shared").unwrap();
        let bob = hash_password("shared").unwrap();
        assert_ne!(alice, bob);
        assert!(verify_password("shared", &alice).unwrap());
        assert!(verify_password("shared", &bob).unwrap());
    }

    #[test]
    fn test_login_for_unknown_account_never_succeeds() {
        assert!(!verify_login("anything", None).unwrap());
        assert!(!verify_login(DECOY_PASSWORD, None).unwrap());
    }

    #[test]
    fn test_login_against_stored_hash() {
        let hash = hash_password("pw").unwrap();
        assert!(verify_login("pw", Some(&hash)).unwrap());
        assert!(!verify_login("PW", Some(&hash)).unwrap());
    }

    #[test]
    fn test_malformed_stored_hash_is_internal() {
        let err = verify_login("pw", Some("plaintext-not-a-hash")).unwrap_err();
        assert!(matches!(err, SurveyError::Internal(_)), "{:?}", err);
    }
}
