//! Validation utilities for the Inventory Management Platform
//!
//! Pure checks shared by the backend services; each returns a static
//! message suitable for wrapping in a caller-facing validation error.

use rust_decimal::Decimal;

use crate::models::{MovementSign, MovementType};

// ============================================================================
// Quantity Validations
// ============================================================================

/// Validate a caller-supplied magnitude (always positive; sign is derived
/// from the movement type)
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a signed ledger delta against its movement type's sign
/// convention
pub fn validate_movement_sign(
    movement_type: MovementType,
    quantity: Decimal,
) -> Result<(), &'static str> {
    if quantity.is_zero() {
        return Err("Movement quantity must be non-zero");
    }
    match movement_type.expected_sign() {
        MovementSign::Inbound if quantity < Decimal::ZERO => {
            Err("Inbound movement types require a positive quantity")
        }
        MovementSign::Outbound if quantity > Decimal::ZERO => {
            Err("Outbound movement types require a negative quantity")
        }
        _ => Ok(()),
    }
}

/// Validate a unit price (zero is allowed for giveaways/samples)
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate a low-stock threshold (zero disables the alert)
pub fn validate_min_stock(threshold: Decimal) -> Result<(), &'static str> {
    if threshold < Decimal::ZERO {
        return Err("Minimum stock cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Document Validations
// ============================================================================

/// Validate an invoice number (non-empty, printable, bounded length)
pub fn validate_invoice_number(invoice: &str) -> Result<(), &'static str> {
    let trimmed = invoice.trim();
    if trimmed.is_empty() {
        return Err("Invoice number is required");
    }
    if trimmed.len() > 100 {
        return Err("Invoice number must be at most 100 characters");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Invoice number contains invalid characters");
    }
    Ok(())
}

/// Validate a document has at least one line item
pub fn validate_has_items<T>(items: &[T]) -> Result<(), &'static str> {
    if items.is_empty() {
        return Err("At least one item is required");
    }
    Ok(())
}

/// Validate a short entity code (2-20 alphanumeric, dash or underscore)
pub fn validate_entity_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Code must be at least 2 characters");
    }
    if code.len() > 20 {
        return Err("Code must be at most 20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Code must be alphanumeric with - or _ only");
    }
    Ok(())
}

/// Validate an expiry-warning horizon in days
pub fn validate_expiry_horizon(days: i64) -> Result<(), &'static str> {
    if days < 1 {
        return Err("Expiry horizon must be at least 1 day");
    }
    if days > 365 {
        return Err("Expiry horizon must be at most 365 days");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(dec("0.01")).is_ok());
        assert!(validate_quantity(dec("0")).is_err());
        assert!(validate_quantity(dec("-5")).is_err());
    }

    #[test]
    fn movement_sign_follows_type() {
        assert!(validate_movement_sign(MovementType::Purchase, dec("10")).is_ok());
        assert!(validate_movement_sign(MovementType::Purchase, dec("-10")).is_err());
        assert!(validate_movement_sign(MovementType::Sale, dec("-4")).is_ok());
        assert!(validate_movement_sign(MovementType::Sale, dec("4")).is_err());
        assert!(validate_movement_sign(MovementType::Adjustment, dec("4")).is_ok());
        assert!(validate_movement_sign(MovementType::Adjustment, dec("-4")).is_ok());
    }

    #[test]
    fn zero_movement_is_rejected_for_every_type() {
        for t in [
            MovementType::Purchase,
            MovementType::Sale,
            MovementType::Adjustment,
            MovementType::Expired,
        ] {
            assert!(validate_movement_sign(t, dec("0")).is_err());
        }
    }

    #[test]
    fn invoice_number_rules() {
        assert!(validate_invoice_number("INV-2026-0001").is_ok());
        assert!(validate_invoice_number("").is_err());
        assert!(validate_invoice_number("   ").is_err());
        assert!(validate_invoice_number("bad\ninvoice").is_err());
        assert!(validate_invoice_number(&"x".repeat(101)).is_err());
    }

    #[test]
    fn entity_code_rules() {
        assert!(validate_entity_code("WH-01").is_ok());
        assert!(validate_entity_code("a").is_err());
        assert!(validate_entity_code("has space").is_err());
    }

    #[test]
    fn items_must_be_non_empty() {
        let none: [u8; 0] = [];
        assert!(validate_has_items(&none).is_err());
        assert!(validate_has_items(&[1]).is_ok());
    }

    #[test]
    fn horizon_bounds() {
        assert!(validate_expiry_horizon(30).is_ok());
        assert!(validate_expiry_horizon(0).is_err());
        assert!(validate_expiry_horizon(366).is_err());
    }
}
