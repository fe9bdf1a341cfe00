use thiserror::Error;

use crate::translate::TranslateError;
use crate::{ConfigurationError, FieldResolutionError, TypeCoercionError};

/// Unified error type for building, evaluating and translating filters.
///
/// The first fault encountered wins; the variant records which stage
/// produced it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Coercion(#[from] TypeCoercionError),

    #[error(transparent)]
    Resolution(#[from] FieldResolutionError),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}

impl FilterError {
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, FilterError::Configuration(_))
    }

    #[must_use]
    pub fn is_coercion(&self) -> bool {
        matches!(self, FilterError::Coercion(_))
    }

    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(self, FilterError::Resolution(_))
    }
}
