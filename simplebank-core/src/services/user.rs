//! User service - registration and password checks

use std::sync::Arc;

use base64::Engine;
use rand::Rng;
use tracing::info;

use crate::adapters::duckdb::DuckDbStore;
use crate::domain::result::{Error, Result};
use crate::domain::{NewUser, User};
use crate::ports::LedgerStore;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_FIELD_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 200;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Argon2id cost: 19 MiB memory, 2 passes, 1 lane
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_TIME_COST: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

/// Fields a caller supplies to register
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

/// User service
pub struct UserService {
    store: Arc<DuckDbStore>,
}

impl UserService {
    pub fn new(store: Arc<DuckDbStore>) -> Self {
        Self { store }
    }

    /// Validate, hash the password and insert the user
    pub fn create_user(&self, req: &CreateUserRequest) -> Result<User> {
        validate_username(&req.username)?;
        validate_full_name(&req.full_name)?;
        validate_email(&req.email)?;

        let hashed_password = hash_password(&req.password)?;
        let user = self.store.create_user(&NewUser {
            username: req.username.clone(),
            hashed_password,
            full_name: req.full_name.trim().to_string(),
            email: req.email.trim().to_string(),
        })?;
        info!(username = %user.username, "user created");
        Ok(user)
    }

    pub fn get_user(&self, username: &str) -> Result<User> {
        self.store.get_user(username)
    }

    /// Look up a user and verify the password
    ///
    /// A wrong password is reported as `NotFound` so callers cannot tell
    /// which usernames exist.
    pub fn login(&self, username: &str, password: &str) -> Result<User> {
        let user = self.store.get_user(username)?;
        if !check_password(password, &user.hashed_password)? {
            return Err(Error::not_found(format!("user {}", username)));
        }
        Ok(user)
    }
}

fn argon2() -> Result<argon2::Argon2<'static>> {
    let params = argon2::Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(HASH_LEN),
    )
    .map_err(|e| Error::Config(format!("Failed to create argon2 params: {:?}", e)))?;

    Ok(argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

fn derive(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let mut hash = vec![0u8; HASH_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| Error::database(format!("Failed to hash password: {:?}", e)))?;
    Ok(hash)
}

/// Hash a password as `base64(salt)$base64(hash)`
pub fn hash_password(password: &str) -> Result<String> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_FIELD_LEN).contains(&len) {
        return Err(Error::invalid_argument(format!(
            "password must be {}-{} characters",
            MIN_PASSWORD_LEN, MAX_FIELD_LEN
        )));
    }

    let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
    let hash = derive(password, &salt)?;

    let b64 = base64::engine::general_purpose::STANDARD;
    Ok(format!("{}${}", b64.encode(salt), b64.encode(hash)))
}

/// Check a password against a value produced by [`hash_password`]
pub fn check_password(password: &str, hashed: &str) -> Result<bool> {
    let (salt_b64, hash_b64) = hashed
        .split_once('$')
        .ok_or_else(|| Error::database("malformed password hash"))?;

    let b64 = base64::engine::general_purpose::STANDARD;
    let salt = b64
        .decode(salt_b64)
        .map_err(|e| Error::database(format!("Invalid salt in password hash: {}", e)))?;
    let expected = b64
        .decode(hash_b64)
        .map_err(|e| Error::database(format!("Invalid password hash: {}", e)))?;

    let actual = derive(password, &salt)?;
    // Compare every byte regardless of where the first difference is
    let diff = actual
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    Ok(diff == 0 && actual.len() == expected.len())
}

fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(Error::invalid_argument(format!(
            "{} must contain from {} to {} characters",
            field, min, max
        )));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<()> {
    check_length("username", username, 3, MAX_FIELD_LEN)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(Error::invalid_argument(
            "username must contain only lowercase letters, digits, or underscore",
        ));
    }
    Ok(())
}

fn validate_full_name(full_name: &str) -> Result<()> {
    let trimmed = full_name.trim();
    check_length("full name", trimmed, 3, MAX_FIELD_LEN)?;
    if !trimmed.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(Error::invalid_argument(
            "full name must contain only letters or spaces",
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    check_length("email", trimmed, 3, MAX_EMAIL_LEN)?;
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !trimmed.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::invalid_argument(format!(
            "{} is not a valid email address",
            trimmed
        )));
    }
    Ok(())
}
