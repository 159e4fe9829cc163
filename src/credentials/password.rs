use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{self, Rng};
use std::borrow::Cow;
use validator::ValidationError;

use super::registry::RegistryError;

/// Length of emailed activation and reset codes.
pub const CODE_LENGTH: usize = 32;

pub fn generate_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

pub fn hash_password(password: &str) -> Result<String, RegistryError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);
    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => {
            tracing::info!("Password hashed successfully");
            Ok(hash.to_string())
        }
        Err(err) => Err(RegistryError::PasswordHash(err.to_string())),
    }
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed_hash) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(err) => {
            tracing::error!("Can't parse password hash {}", err);
            false
        }
    }
}

fn contains(password: &str, class: fn(&char) -> bool) -> bool {
    password.chars().any(|c| class(&c))
}

fn is_special(c: &char) -> bool {
    !c.is_ascii_alphanumeric()
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::new("Password length")
            .with_message(Cow::from("Password must be at least 8 characters long")));
    }
    if !contains(password, char::is_ascii_uppercase) {
        return Err(
            ValidationError::new("Password missing UpperCase").with_message(Cow::from(
                "Password must contain at least one uppercase letter",
            )),
        );
    }
    if !contains(password, char::is_ascii_lowercase) {
        return Err(
            ValidationError::new("Password missing LowerCase").with_message(Cow::from(
                "Password must contain at least one lowercase letter",
            )),
        );
    }
    if !contains(password, char::is_ascii_digit) {
        return Err(ValidationError::new("Password missing Number")
            .with_message(Cow::from("Password must contain at least one number")));
    }
    if !contains(password, is_special) {
        return Err(
            ValidationError::new("Password missing Special Char").with_message(Cow::from(
                "Password must contain at least one special character",
            )),
        );
    }
    Ok(())
}
