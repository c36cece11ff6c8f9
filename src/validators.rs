/// Input validators for auth and product payloads

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_PRODUCT_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Required string fields must not be blank
pub fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    Ok(())
}

/// Validates a product name and price
pub fn is_valid_product(name: &str, price: Option<&str>) -> Result<(), ValidationError> {
    require("name", name)?;

    if name.trim().len() > MAX_PRODUCT_NAME_LENGTH {
        return Err(ValidationError::TooLong("name".to_string(), MAX_PRODUCT_NAME_LENGTH));
    }

    if let Some(price) = price {
        if price.is_empty() {
            return Err(ValidationError::TooShort("price".to_string(), 1));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
        assert_eq!(is_valid_email("  a@x.com ").unwrap(), "a@x.com");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());
        assert!(is_valid_email("").is_err());
    }

    #[test]
    fn test_require() {
        assert!(require("token", "abc").is_ok());
        assert_eq!(
            require("token", "   ").unwrap_err(),
            ValidationError::EmptyField("token".to_string())
        );
    }

    #[test]
    fn test_product_validation() {
        assert!(is_valid_product("Hammer", Some("10")).is_ok());
        assert!(is_valid_product("Hammer", None).is_ok());
        assert!(is_valid_product("  ", Some("10")).is_err());
        assert!(is_valid_product("Hammer", Some("")).is_err());
    }
}
