//! Validation utilities for the stockroom dashboard

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Physical stock counts cannot go negative
pub fn validate_stock(stock: i32) -> Result<(), &'static str> {
    if stock < 0 {
        return Err("Stock must be zero or greater");
    }
    Ok(())
}

/// A threshold of zero would never flag anything but empty shelves
pub fn validate_low_stock_threshold(threshold: i32) -> Result<(), &'static str> {
    if threshold < 1 {
        return Err("Low stock threshold must be at least 1");
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate a password change request
pub fn validate_new_password(current: &str, new: &str) -> Result<(), &'static str> {
    if new.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters");
    }
    if current == new {
        return Err("New password must be different from the current one");
    }
    Ok(())
}
