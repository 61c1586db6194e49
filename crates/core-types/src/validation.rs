use crate::error::CoreError;

/// Largest whole number a JSON number (an IEEE-754 double) can carry without loss.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Validates a raw reading value as supplied by a user or the recognition service.
///
/// The value must be a finite, non-negative whole number. `12.0` is accepted,
/// `12.5`, `-5` and `NaN` are not.
pub fn validate_reading_value(raw: f64) -> Result<u64, CoreError> {
    if !raw.is_finite() {
        return Err(CoreError::validation("reading", "value must be a finite number"));
    }
    if raw < 0.0 {
        return Err(CoreError::validation(
            "reading",
            format!("value must not be negative, got {raw}"),
        ));
    }
    if raw.fract() != 0.0 {
        return Err(CoreError::validation(
            "reading",
            format!("value must be a whole number, got {raw}"),
        ));
    }
    if raw > MAX_EXACT_INTEGER {
        return Err(CoreError::validation("reading", "value is too large"));
    }
    Ok(raw as u64)
}

/// Validates a meter number and returns its trimmed form.
pub fn validate_meter_number(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("meterNumber", "must not be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_whole_non_negative_values() {
        assert_eq!(validate_reading_value(0.0), Ok(0));
        assert_eq!(validate_reading_value(12850.0), Ok(12850));
    }

    #[test]
    fn rejects_negative_values() {
        let err = validate_reading_value(-5.0).unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "reading", .. }));
    }

    #[test]
    fn rejects_fractional_and_non_finite_values() {
        assert!(validate_reading_value(10.5).is_err());
        assert!(validate_reading_value(f64::NAN).is_err());
        assert!(validate_reading_value(f64::INFINITY).is_err());
        assert!(validate_reading_value(1e300).is_err());
    }

    #[test]
    fn meter_number_is_trimmed() {
        assert_eq!(validate_meter_number("  EM-2024-001 ").unwrap(), "EM-2024-001");
    }

    #[test]
    fn blank_meter_number_is_rejected() {
        assert!(validate_meter_number("").is_err());
        assert!(validate_meter_number(" \t\n").is_err());
    }
}
