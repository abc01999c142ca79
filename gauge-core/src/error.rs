//! Structured errors
//!
//! Two families: [`ConversionError`] for business-rule failures the caller
//! can recover from, and [`ValidationError`] for malformed input that
//! violates a precondition. [`EngineError`] carries either one.

use crate::NumberError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
    pub const UNIT_NOT_FOUND: &str = "UNIT_NOT_FOUND";
    pub const TYPE_MISMATCH: &str = "TYPE_MISMATCH";
    pub const MISSING_UNIT_TYPE: &str = "MISSING_UNIT_TYPE";
    pub const ZERO_FACTOR: &str = "ZERO_FACTOR";
    pub const NO_BASE_UNIT: &str = "NO_BASE_UNIT";
    pub const COMPOUND_NOT_FOUND: &str = "COMPOUND_NOT_FOUND";
    pub const DIMENSION_MISMATCH: &str = "DIMENSION_MISMATCH";
    pub const CUSTOM_UNIT_NOT_FOUND: &str = "CUSTOM_UNIT_NOT_FOUND";
    pub const DUPLICATE_CUSTOM_UNIT: &str = "DUPLICATE_CUSTOM_UNIT";
    pub const FORMULAS_DISABLED: &str = "FORMULAS_DISABLED";
    pub const INVALID_FORMULA: &str = "INVALID_FORMULA";
    pub const NO_CUSTOM_CONVERSION: &str = "NO_CUSTOM_CONVERSION";
    pub const NO_PACKAGING: &str = "NO_PACKAGING";
    pub const DIV_ZERO: &str = "DIV_ZERO";
    pub const OVERFLOW: &str = "OVERFLOW";
    pub const STORE_ERROR: &str = "STORE_ERROR";
}

/// Domain error raised by the conversion engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ConversionError {
    /// Create a new error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    // ========== Common Error Constructors ==========

    pub fn invalid_number(value: &str) -> Self {
        Self::new(codes::INVALID_NUMBER, format!("Value '{}' is not a valid number", value))
            .with_suggestion("Pass a decimal such as \"12.5\"")
    }

    pub fn unit_not_found(identifier: &str) -> Self {
        Self::new(codes::UNIT_NOT_FOUND,
            format!("Unit '{}' could not be found for conversion", identifier))
            .with_suggestion("Use a unit id, code, or registered alias")
    }

    pub fn type_mismatch(from: &str, to: &str) -> Self {
        Self::new(codes::TYPE_MISMATCH,
            format!("Units {} and {} belong to different types", from, to))
    }

    pub fn missing_unit_type(unit: &str) -> Self {
        Self::new(codes::MISSING_UNIT_TYPE,
            format!("Unit '{}' has no associated unit type", unit))
    }

    pub fn missing_component_type(unit: &str, compound: &str) -> Self {
        Self::new(codes::MISSING_UNIT_TYPE,
            format!("Unit '{}' in compound unit '{}' has no associated unit type", unit, compound))
    }

    pub fn zero_factor(unit: &str) -> Self {
        Self::new(codes::ZERO_FACTOR,
            format!("Unit '{}' declares a zero conversion factor", unit))
    }

    pub fn zero_conversion_factor(target: &str) -> Self {
        Self::new(codes::ZERO_FACTOR,
            format!("Conversion to '{}' specifies a zero factor", target))
    }

    pub fn no_base_unit(unit_type: &str) -> Self {
        Self::new(codes::NO_BASE_UNIT,
            format!("No base unit is registered for type '{}'", unit_type))
            .with_suggestion("Flag exactly one unit of the type as base")
    }

    pub fn compound_not_found(identifier: &str) -> Self {
        Self::new(codes::COMPOUND_NOT_FOUND,
            format!("Compound unit '{}' could not be found", identifier))
    }

    pub fn dimension_mismatch(from: &str, to: &str) -> Self {
        Self::new(codes::DIMENSION_MISMATCH,
            format!("Compound units '{}' and '{}' do not share the same dimensional structure", from, to))
    }

    pub fn custom_unit_not_found(target: &str) -> Self {
        Self::new(codes::CUSTOM_UNIT_NOT_FOUND,
            format!("Custom unit '{}' could not be found", target))
    }

    pub fn duplicate_custom_unit(code: &str) -> Self {
        Self::new(codes::DUPLICATE_CUSTOM_UNIT,
            format!("Custom unit code '{}' already exists for this owner", code))
            .with_suggestion("Pick another code or register under a different owner")
    }

    pub fn formulas_disabled(target: &str) -> Self {
        Self::new(codes::FORMULAS_DISABLED,
            format!("Conversion to '{}' uses a formula but custom formulas are disabled", target))
            .with_suggestion("Enable allow_custom_formulas or supply a linear factor")
    }

    pub fn invalid_formula(formula: &str, details: impl Into<String>) -> Self {
        Self::new(codes::INVALID_FORMULA,
            format!("Formula '{}' is invalid: {}", formula, details.into()))
    }

    pub fn no_custom_conversion(from: &str, to: &str) -> Self {
        Self::new(codes::NO_CUSTOM_CONVERSION,
            format!("No conversion is registered from custom unit '{}' to '{}'", from, to))
    }

    pub fn no_packaging(base: &str, package: &str) -> Self {
        Self::new(codes::NO_PACKAGING,
            format!("No packaging relationship exists between '{}' and '{}'", base, package))
    }

    pub fn no_packaging_id(id: u64) -> Self {
        Self::new(codes::NO_PACKAGING,
            format!("No packaging relationship exists for packaging #{}", id))
    }

    pub fn div_zero() -> Self {
        Self::new(codes::DIV_ZERO, "Division by zero")
            .with_suggestion("Ensure divisor is not zero")
    }

    pub fn store(details: impl Into<String>) -> Self {
        Self::new(codes::STORE_ERROR, format!("Store error: {}", details.into()))
    }
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConversionError {}

impl From<NumberError> for ConversionError {
    fn from(err: NumberError) -> Self {
        match err {
            NumberError::ParseError(s) => Self::invalid_number(&s),
            NumberError::DivisionByZero => Self::div_zero(),
            NumberError::Overflow => Self::new(codes::OVERFLOW, "Numeric overflow")
                .with_suggestion("Use a smaller exponent or precision"),
        }
    }
}

/// Malformed caller input: a precondition violation, not a business rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The custom unit {field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("Unknown owner kind '{0}'")]
    UnknownOwnerKind(String),
}

/// Error returned by operations that can fail either way
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl EngineError {
    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            EngineError::Conversion(e) => Some(e),
            EngineError::Validation(_) => None,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            EngineError::Validation(e) => Some(e),
            EngineError::Conversion(_) => None,
        }
    }
}
