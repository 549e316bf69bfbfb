//! # Validation Module
//!
//! Input validation for registration and scan payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Device bridge (line framer)                                  │
//! │  └── Framing and tagged-variant normalization                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - field validation before any ledger write       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── UNIQUE constraints (index_number, card_uid)                       │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a student index number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 30 characters
/// - Alphanumeric, hyphens and slashes only (e.g., "UE/2020/001")
pub fn validate_index_number(index: &str) -> ValidationResult<()> {
    let index = index.trim();

    if index.is_empty() {
        return Err(ValidationError::Required {
            field: "index_number".to_string(),
        });
    }

    if index.len() > 30 {
        return Err(ValidationError::TooLong {
            field: "index_number".to_string(),
            max: 30,
        });
    }

    if !index
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '/')
    {
        return Err(ValidationError::InvalidFormat {
            field: "index_number".to_string(),
            reason: "must contain only letters, numbers, hyphens, and slashes".to_string(),
        });
    }

    Ok(())
}

/// Validates an RFID card UID.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 32 characters
/// - Alphanumeric and hyphens only (hex dumps and vendor formats both pass)
pub fn validate_card_uid(uid: &str) -> ValidationResult<()> {
    let uid = uid.trim();

    if uid.is_empty() {
        return Err(ValidationError::Required {
            field: "card_uid".to_string(),
        });
    }

    if uid.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "card_uid".to_string(),
            max: 32,
        });
    }

    if !uid.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "card_uid".to_string(),
            reason: "must contain only letters, numbers, and hyphens".to_string(),
        });
    }

    Ok(())
}

/// Validates an item tag.
///
/// Same character rules as card UIDs; item tags come from the same reader.
pub fn validate_item_tag(tag: &str) -> ValidationResult<()> {
    let tag = tag.trim();

    if tag.is_empty() {
        return Err(ValidationError::Required {
            field: "item_tag".to_string(),
        });
    }

    if tag.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "item_tag".to_string(),
            max: 64,
        });
    }

    if !tag.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "item_tag".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Registration Validators
// =============================================================================

/// Validates a student's full name.
pub fn validate_full_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "full_name".to_string(),
        });
    }

    if name.len() > 120 {
        return Err(ValidationError::TooLong {
            field: "full_name".to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - May be empty (phone is optional at registration)
/// - At most 20 characters; digits, spaces, `+` and hyphens only
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Ok(());
    }

    if phone.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 20,
        });
    }

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || c == '+' || c == '-' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, '+', and hyphens".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// Loan and transaction ids are UUID v4; anything else is a caller bug
/// surfaced before touching the ledger.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_index_number() {
        assert!(validate_index_number("UE2020001").is_ok());
        assert!(validate_index_number("UE/2020/001").is_ok());
        assert!(validate_index_number("CS-300-12").is_ok());

        assert!(validate_index_number("").is_err());
        assert!(validate_index_number("   ").is_err());
        assert!(validate_index_number("has space").is_err());
        assert!(validate_index_number(&"A".repeat(40)).is_err());
    }

    #[test]
    fn test_validate_card_uid() {
        assert!(validate_card_uid("04A1B2C3").is_ok());
        assert!(validate_card_uid("CARD-ALICE").is_ok());

        assert!(validate_card_uid("").is_err());
        assert!(validate_card_uid("bad uid").is_err());
        assert!(validate_card_uid(&"F".repeat(40)).is_err());
    }

    #[test]
    fn test_validate_item_tag() {
        assert!(validate_item_tag("BOOK-1").is_ok());
        assert!(validate_item_tag("shelf_3_copy_2").is_ok());

        assert!(validate_item_tag("").is_err());
        assert!(validate_item_tag("tag with space").is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Alice Mensah").is_ok());
        assert!(validate_full_name("").is_err());
        assert!(validate_full_name(&"A".repeat(200)).is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("").is_ok()); // optional
        assert!(validate_phone("+233 24 123-4567").is_ok());
        assert!(validate_phone("not a phone").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
