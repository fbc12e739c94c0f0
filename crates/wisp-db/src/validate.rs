//! Input shape checks shared by the stores.
//!
//! The server never decodes payloads beyond checking they are base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;

use crate::StoreError;

pub const MAX_NOTE_CHARS: usize = 20_000;
pub const MAX_MESSAGE_CHARS: usize = 8_000;
pub const MAX_IV_CHARS: usize = 64;
pub const MAX_SALT_CHARS: usize = 128;
pub const MAX_SENDER_ID_CHARS: usize = 64;
pub const MAX_ROOM_NAME_CHARS: usize = 50;
pub const ALLOWED_TTL_HOURS: [u32; 3] = [1, 24, 168];

pub fn ciphertext(value: &str, max_chars: usize) -> Result<(), StoreError> {
    if value.len() > max_chars {
        return Err(StoreError::TooLarge);
    }
    base64_field("ciphertext", value)
}

pub fn iv(value: &str) -> Result<(), StoreError> {
    bounded("iv", value, MAX_IV_CHARS)?;
    base64_field("iv", value)
}

pub fn salt(value: &str) -> Result<(), StoreError> {
    bounded("salt", value, MAX_SALT_CHARS)?;
    base64_field("salt", value)
}

pub fn ttl_hours(hours: u32) -> Result<(), StoreError> {
    if ALLOWED_TTL_HOURS.contains(&hours) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "expire_hours must be one of {ALLOWED_TTL_HOURS:?}"
        )))
    }
}

pub fn sender_id(value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::validation("sender_id must not be empty"));
    }
    bounded("sender_id", value, MAX_SENDER_ID_CHARS)
}

/// Returns the trimmed name.
pub fn room_name(value: &str) -> Result<&str, StoreError> {
    let name = value.trim();
    if name.is_empty() {
        return Err(StoreError::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_ROOM_NAME_CHARS {
        return Err(StoreError::validation(format!(
            "name must be at most {MAX_ROOM_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

fn bounded(field: &str, value: &str, max_chars: usize) -> Result<(), StoreError> {
    if value.len() > max_chars {
        Err(StoreError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )))
    } else {
        Ok(())
    }
}

fn base64_field(field: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::validation(format!("{field} must not be empty")));
    }
    B64.decode(value)
        .map(|_| ())
        .map_err(|_| StoreError::validation(format!("{field} must be base64")))
}
