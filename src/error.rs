//! Runtime-tier errors.
//!
//! Only one conversion category can fail once a program compiles: the
//! runtime-checked polymorphic downcast. Everything else is either total
//! or already refused at build time, so this module stays deliberately
//! small.

use thiserror::Error;

/// A conversion that passed every static check but failed at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The object behind a polymorphic base handle is not an instance of
    /// the requested target type.
    #[error("runtime type mismatch: the value behind `{source_ty}` is not a `{target}`")]
    TypeMismatch {
        /// Module-qualified name of the source referent.
        source_ty: &'static str,
        /// Module-qualified name of the target referent.
        target: &'static str,
    },
}

/// Result alias for the fallible conversion paths.
pub type CastResult<T> = Result<T, CastError>;
