//! Helpers de validación compartidos

use rust_decimal::Decimal;

use super::errors::{validation_error, AppError};

/// La cantidad debe ser estrictamente positiva
pub fn require_positive(field: &str, value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO {
        return Err(validation_error(field, "must be greater than zero"));
    }
    Ok(())
}

/// El precio puede ser cero pero nunca negativo
pub fn require_non_negative(field: &str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(validation_error(field, "must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive_rejects_zero() {
        assert!(require_positive("quantity", Decimal::ZERO).is_err());
        assert!(require_positive("quantity", Decimal::from(5)).is_ok());
    }

    #[test]
    fn test_require_non_negative_allows_zero() {
        assert!(require_non_negative("unit_price", Decimal::ZERO).is_ok());
        assert!(require_non_negative("unit_price", Decimal::from(-1)).is_err());
    }
}
