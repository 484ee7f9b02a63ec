//! Exact conversions between ADA, lovelace and decimal quantity strings.

/// Lovelace per ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Decimal places of ADA.
const ADA_DECIMALS: usize = 6;

/// A quantity string that cannot be used as an on-chain amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuantityError {
    /// Nothing was supplied.
    #[error("quantity is empty")]
    Empty,

    /// Zero, which no transfer, mint or burn can carry.
    #[error("quantity must be greater than zero")]
    Zero,

    /// Not an unsigned decimal number.
    #[error("invalid quantity '{0}'")]
    Invalid(String),

    /// More fractional digits than the unit supports.
    #[error("quantity '{0}' has more than 6 decimal places")]
    Precision(String),

    /// Does not fit a 64-bit quantity.
    #[error("quantity '{0}' is too large")]
    Overflow(String),
}

/// Parse a positive decimal integer quantity.
///
/// # Errors
///
/// Returns a [`QuantityError`] for empty, zero, signed, fractional or
/// oversized input.
pub fn parse_quantity(s: &str) -> Result<u64, QuantityError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuantityError::Invalid(s.to_owned()));
    }
    match s.parse() {
        Ok(0) => Err(QuantityError::Zero),
        Ok(n) => Ok(n),
        Err(_) => Err(QuantityError::Overflow(s.to_owned())),
    }
}

/// Convert a decimal ADA amount (e.g. `"1.5"`) to lovelace.
///
/// # Errors
///
/// Returns a [`QuantityError`] for malformed input, more than six decimal
/// places, or overflow.
pub fn lovelace_from_ada(ada: &str) -> Result<u64, QuantityError> {
    let ada = ada.trim();
    if ada.is_empty() {
        return Err(QuantityError::Empty);
    }
    let (whole, frac) = ada.split_once('.').unwrap_or((ada, ""));
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits(whole) || !digits(frac) {
        return Err(QuantityError::Invalid(ada.to_owned()));
    }
    if frac.len() > ADA_DECIMALS {
        return Err(QuantityError::Precision(ada.to_owned()));
    }

    let overflow = || QuantityError::Overflow(ada.to_owned());
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let frac: u64 = format!("{frac:0<ADA_DECIMALS$}")
        .parse()
        .map_err(|_| overflow())?;

    whole
        .checked_mul(LOVELACE_PER_ADA)
        .and_then(|l| l.checked_add(frac))
        .ok_or_else(overflow)
}

/// Format lovelace as a decimal ADA string without trailing zeros.
#[must_use]
pub fn ada_from_lovelace(lovelace: u64) -> String {
    let whole = lovelace / LOVELACE_PER_ADA;
    let frac = lovelace % LOVELACE_PER_ADA;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0>ADA_DECIMALS$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("42"), Ok(42));
        assert_eq!(parse_quantity(" 7 "), Ok(7));
        assert_eq!(parse_quantity(""), Err(QuantityError::Empty));
        assert_eq!(parse_quantity("0"), Err(QuantityError::Zero));
        assert_eq!(parse_quantity("000"), Err(QuantityError::Zero));
        assert!(matches!(
            parse_quantity("-1"),
            Err(QuantityError::Invalid(_))
        ));
        assert!(matches!(
            parse_quantity("1.0"),
            Err(QuantityError::Invalid(_))
        ));
        assert!(matches!(
            parse_quantity("18446744073709551616"),
            Err(QuantityError::Overflow(_))
        ));
    }

    #[test]
    fn test_lovelace_from_ada() {
        assert_eq!(lovelace_from_ada("1"), Ok(1_000_000));
        assert_eq!(lovelace_from_ada("1.5"), Ok(1_500_000));
        assert_eq!(lovelace_from_ada("0.000001"), Ok(1));
        assert_eq!(lovelace_from_ada(".25"), Ok(250_000));
        assert_eq!(lovelace_from_ada("2."), Ok(2_000_000));
        assert!(matches!(
            lovelace_from_ada("0.0000001"),
            Err(QuantityError::Precision(_))
        ));
        assert!(matches!(
            lovelace_from_ada("."),
            Err(QuantityError::Invalid(_))
        ));
        assert!(matches!(
            lovelace_from_ada("1e6"),
            Err(QuantityError::Invalid(_))
        ));
        assert!(matches!(
            lovelace_from_ada("18446744073709551616"),
            Err(QuantityError::Overflow(_))
        ));
    }

    #[test]
    fn test_ada_from_lovelace() {
        assert_eq!(ada_from_lovelace(0), "0");
        assert_eq!(ada_from_lovelace(1_500_000), "1.5");
        assert_eq!(ada_from_lovelace(1), "0.000001");
        assert_eq!(ada_from_lovelace(42_000_000), "42");
    }
}
