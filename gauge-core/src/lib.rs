//! Gauge Core - Fundamental types
//!
//! This crate provides the core types used throughout Gauge:
//! - `Number`: Arbitrary precision decimals with an optional result scale
//! - `IntoDecimal`: uniform parsing of caller-supplied quantities
//! - `ConversionError`: Structured domain errors with machine-readable codes
//! - `ValidationError` / `EngineError`: precondition failures and their union

mod number;
mod error;

pub use number::{Number, NumberError, IntoDecimal};
pub use error::{ConversionError, ValidationError, EngineError, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Number, IntoDecimal, ConversionError, ValidationError, EngineError};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod number_tests {
        use super::*;

        #[test]
        fn test_from_i64() {
            let n = Number::from_i64(42);
            assert_eq!(n.to_i64(), Some(42));
        }

        #[test]
        fn test_from_str_decimal() {
            let n = Number::from_str("3.14").unwrap();
            assert!(!n.is_integer());
            assert_eq!(n.to_string(), "3.14");
        }

        #[test]
        fn test_from_str_trims_whitespace() {
            let n = Number::from_str("  12.5 ").unwrap();
            assert_eq!(n, Number::from_str("12.5").unwrap());
        }

        #[test]
        fn test_from_str_scientific() {
            let n = Number::from_str("1.5e2").unwrap();
            assert_eq!(n.to_i64(), Some(150));
        }

        #[test]
        fn test_from_str_scientific_integer_mantissa() {
            let avogadro = Number::from_str("602214076e15").unwrap();
            let expected = Number::from_str("602214076000000000000000").unwrap();
            assert_eq!(avogadro, expected);
        }

        #[test]
        fn test_from_str_rejects_garbage() {
            assert!(matches!(Number::from_str("abc"), Err(NumberError::ParseError(_))));
            assert!(matches!(Number::from_str(""), Err(NumberError::ParseError(_))));
            assert!(Number::from_str("1.2.3").is_err());
        }

        #[test]
        fn test_from_str_rejects_digit_separators() {
            assert!(matches!(Number::from_str("1_000"), Err(NumberError::ParseError(_))));
            assert!(Number::from_str("0x10").is_err());
            assert!(Number::from_str("1 000").is_err());
        }

        #[test]
        fn test_from_str_bounds_exponent() {
            assert!(matches!(Number::from_str("1e-1000000000"), Err(NumberError::Overflow)));
            assert!(matches!(Number::from_str("1.5e20000"), Err(NumberError::Overflow)));
            assert!(Number::from_str("1e-9999").is_ok());
        }

        #[test]
        fn test_long_input_keeps_every_digit() {
            let text = "1234567890123456789012345678901234567890.123456789012345";
            let n = Number::from_str(text).unwrap();
            assert_eq!(n.to_string(), text);
            assert_eq!(n.rescale(15).unwrap().to_string(), text);
        }

        #[test]
        fn test_multiplication_is_exact() {
            let n = Number::from_str("123456789012345678901234567890123456789012345678901").unwrap();
            assert_eq!(
                n.mul(&Number::from_i64(6)).to_string(),
                "740740734074074073407407407340740740734074074073406"
            );
            let sum = n.add(&Number::from_str("0.000000001").unwrap());
            assert_eq!(
                sum.to_string(),
                "123456789012345678901234567890123456789012345678901.000000001"
            );
        }

        #[test]
        fn test_from_f64_uses_shortest_repr() {
            let n = Number::from_f64(0.1).unwrap();
            assert_eq!(n, Number::from_str("0.1").unwrap());
            assert!(Number::from_f64(f64::NAN).is_err());
        }

        #[test]
        fn test_from_parts() {
            assert_eq!(Number::from_parts(25, -4), Number::from_str("0.0025").unwrap());
        }

        #[test]
        fn test_rescale_pads_fraction() {
            let n = Number::from_str("0.0025").unwrap().rescale(6).unwrap();
            assert_eq!(n.to_string(), "0.002500");
            assert_eq!(n.scale(), Some(6));
        }

        #[test]
        fn test_rescale_rounds_half_away_from_zero() {
            assert_eq!(Number::from_str("2.5").unwrap().rescale(0).unwrap().to_string(), "3");
            assert_eq!(Number::from_str("-2.5").unwrap().rescale(0).unwrap().to_string(), "-3");
            assert_eq!(Number::from_str("1.005").unwrap().rescale(2).unwrap().to_string(), "1.01");
            assert_eq!(Number::from_str("1.0049").unwrap().rescale(2).unwrap().to_string(), "1.00");
        }

        #[test]
        fn test_rescale_negative_rounding_to_zero_drops_sign() {
            assert_eq!(Number::from_str("-0.004").unwrap().rescale(2).unwrap().to_string(), "0.00");
            assert_eq!(Number::from_str("-0.005").unwrap().rescale(2).unwrap().to_string(), "-0.01");
        }

        #[test]
        fn test_rescale_integer_gains_fraction() {
            assert_eq!(Number::from_i64(24).rescale(2).unwrap().to_string(), "24.00");
            assert_eq!(Number::from_i64(1000).rescale(0).unwrap().to_string(), "1000");
        }

        #[test]
        fn test_rescale_bounds_scale() {
            let n = Number::from_str("1.5").unwrap();
            assert!(matches!(n.rescale(u32::MAX), Err(NumberError::Overflow)));
            let widest = n.rescale(Number::MAX_SCALE).unwrap();
            assert_eq!(widest.to_string().len(), 2 + Number::MAX_SCALE as usize);
        }

        #[test]
        fn test_tiny_value_rescales_to_zero() {
            let tiny = Number::from_str("1e-9999").unwrap();
            assert_eq!(tiny.rescale(2).unwrap().to_string(), "0.00");
            let tiny = Number::from_str("-5e-3").unwrap();
            assert_eq!(tiny.rescale(2).unwrap().to_string(), "-0.01");
        }

        #[test]
        fn test_equality_ignores_scale() {
            let a = Number::from_i64(3);
            let b = Number::from_i64(3).rescale(3).unwrap();
            assert_eq!(a, b);
        }

        #[test]
        fn test_division_keeps_working_precision() {
            let factor = Number::from_i64(1000).checked_div(&Number::from_i64(3600)).unwrap();
            assert_eq!(factor.rescale(6).unwrap().to_string(), "0.277778");
            assert_eq!(factor.rescale(10).unwrap().to_string(), "0.2777777778");
        }

        #[test]
        fn test_division_by_zero() {
            let result = Number::from_i64(1).checked_div(&Number::zero());
            assert!(matches!(result, Err(NumberError::DivisionByZero)));
        }

        #[test]
        fn test_checked_pow() {
            let ten = Number::from_i64(10);
            assert_eq!(ten.checked_pow(3).unwrap(), Number::from_i64(1000));
            assert_eq!(ten.checked_pow(-2).unwrap(), Number::from_str("0.01").unwrap());
            assert_eq!(ten.checked_pow(0).unwrap(), Number::one());
        }

        #[test]
        fn test_checked_pow_zero_base_negative_exponent() {
            assert!(matches!(Number::zero().checked_pow(-1), Err(NumberError::DivisionByZero)));
        }

        #[test]
        fn test_checked_pow_rejects_huge_exponent() {
            assert!(matches!(Number::from_i64(2).checked_pow(100_000), Err(NumberError::Overflow)));
        }

        #[test]
        fn test_plain_display_strips_trailing_zeros() {
            assert_eq!(Number::from_str("2.50").unwrap().to_string(), "2.5");
            assert_eq!(Number::from_i64(150).to_string(), "150");
            assert_eq!(Number::from_str("-0.75").unwrap().to_string(), "-0.75");
        }

        #[test]
        fn test_serde_roundtrip_preserves_value() {
            let n = Number::from_str("3.785411784").unwrap();
            let json = serde_json::to_string(&n).unwrap();
            assert_eq!(json, "\"3.785411784\"");
            let back: Number = serde_json::from_str(&json).unwrap();
            assert_eq!(back, n);
        }

        #[test]
        fn test_deserialize_from_json_number() {
            let n: Number = serde_json::from_str("1.25").unwrap();
            assert_eq!(n, Number::from_str("1.25").unwrap());
        }

        #[test]
        fn test_into_decimal_accepts_many_inputs() {
            assert_eq!("4".into_decimal().unwrap(), Number::from_i64(4));
            assert_eq!(4_i32.into_decimal().unwrap(), Number::from_i64(4));
            assert_eq!(4_u64.into_decimal().unwrap(), Number::from_i64(4));
            assert_eq!(4.5_f64.into_decimal().unwrap(), Number::from_str("4.5").unwrap());
            assert!("four".into_decimal().is_err());
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_display_includes_code_and_suggestion() {
            let err = ConversionError::unit_not_found("furlong");
            let text = err.to_string();
            assert!(text.starts_with("[UNIT_NOT_FOUND] Unit 'furlong' could not be found for conversion"));
            assert!(text.contains("suggestion:"));
        }

        #[test]
        fn test_from_number_error() {
            let err: ConversionError = NumberError::ParseError("x1".to_string()).into();
            assert_eq!(err.code, codes::INVALID_NUMBER);
            assert!(err.message.contains("Value 'x1'"));

            let err: ConversionError = NumberError::DivisionByZero.into();
            assert!(err.is(codes::DIV_ZERO));
        }

        #[test]
        fn test_engine_error_keeps_families_apart() {
            let domain: EngineError = ConversionError::zero_factor("box").into();
            let local: EngineError = ValidationError::EmptyField { field: "code" }.into();

            assert!(domain.as_conversion().is_some());
            assert!(domain.as_validation().is_none());
            assert!(local.as_validation().is_some());
            assert_eq!(local.to_string(), "The custom unit code must not be empty");
        }

        #[test]
        fn test_error_serializes_without_empty_suggestion() {
            let err = ConversionError::type_mismatch("m", "kg");
            let json = serde_json::to_value(&err).unwrap();
            assert_eq!(json["code"], "TYPE_MISMATCH");
            assert!(json.get("suggestion").is_none());
        }
    }
}
