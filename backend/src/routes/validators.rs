//! Custom field validators shared across the verification routes

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use validator::ValidationError;

/// E.164-ish: leading `+`, 8 to 15 digits, no leading zero
static PHONE_E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{7,14}$").expect("phone regex is valid"));

/// User ids are externally supplied UUIDs
///
/// # Errors
/// Returns a `ValidationError` when the value is not a UUID
pub fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    if uuid::Uuid::parse_str(user_id).is_err() {
        let mut error = ValidationError::new("invalid_user_id");
        error.message = Some(std::borrow::Cow::Borrowed("userId must be a UUID"));
        return Err(error);
    }
    Ok(())
}

/// Phone numbers must be E.164-ish
///
/// # Errors
/// Returns a `ValidationError` when the value does not match
pub fn validate_phone_number(phone_number: &str) -> Result<(), ValidationError> {
    if !PHONE_E164.is_match(phone_number) {
        let mut error = ValidationError::new("invalid_phone_number");
        error.message = Some(std::borrow::Cow::Borrowed(
            "phone number must be in E.164 format",
        ));
        return Err(error);
    }
    Ok(())
}

/// Document images arrive as non-empty standard base64
///
/// # Errors
/// Returns a `ValidationError` when the value is empty or not base64
pub fn validate_base64_image(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() || STANDARD.decode(image).is_err() {
        let mut error = ValidationError::new("invalid_image");
        error.message = Some(std::borrow::Cow::Borrowed(
            "image must be base64-encoded",
        ));
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_must_be_a_uuid() {
        assert!(validate_user_id("1f8373e1-6a17-4a28-a239-23a52e30f5f7").is_ok());
        assert!(validate_user_id("not-a-uuid").is_err());
        assert!(validate_user_id("").is_err());
    }

    #[test]
    fn phone_numbers_must_be_e164() {
        assert!(validate_phone_number("+15551234567").is_ok());
        assert!(validate_phone_number("+442071838750").is_ok());
        assert!(validate_phone_number("15551234567").is_err());
        assert!(validate_phone_number("+0123").is_err());
        assert!(validate_phone_number("+1555123456789012345").is_err());
        assert!(validate_phone_number("phone").is_err());
    }

    #[test]
    fn images_must_be_base64() {
        assert!(validate_base64_image(&STANDARD.encode(b"front image bytes")).is_ok());
        assert!(validate_base64_image("!!!not-base64!!!").is_err());
        assert!(validate_base64_image("").is_err());
    }
}
