//! The closed set of conversion categories.
//!
//! Exactly one category applies to any (source, target) handle pair; the
//! classifier's precedence order guarantees it. Policies decide which
//! categories are reachable, never which one matches.

use serde::{Deserialize, Serialize};

/// The single conversion strategy selected for a handle pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Source and target are the same type; the value passes through.
    Identity,
    /// Same referent, source is const-qualified and the target is not.
    ConstAdjust,
    /// Toward a declared base. Structurally safe, never policy-gated.
    Upcast,
    /// Toward a derived type from a polymorphic base; checked at runtime.
    PolymorphicDowncast,
    /// Toward a derived type with no runtime identity; unchecked.
    NonPolymorphicDowncast,
    /// Ordinary numeric conversion between scalar values.
    StandardConversion,
    /// Thin pointer to/from an address-width integer.
    PointerIntegerStandard,
    /// Thin pointer to/from any other integer type.
    PointerIntegerGeneric,
    /// Bit-level reinterpretation between unrelated thin pointers.
    RawReinterpret,
    /// No conversion exists; always refused at build time.
    Invalid,
}

impl Category {
    /// Returns `true` for the categories a policy flag can forbid.
    #[must_use]
    pub const fn is_policy_gated(self) -> bool {
        matches!(
            self,
            Self::ConstAdjust
                | Self::NonPolymorphicDowncast
                | Self::PointerIntegerStandard
                | Self::PointerIntegerGeneric
                | Self::RawReinterpret
        )
    }

    /// Returns `true` for the only category whose outcome depends on a
    /// value's runtime identity.
    #[must_use]
    pub const fn is_runtime_checked(self) -> bool {
        matches!(self, Self::PolymorphicDowncast)
    }

    /// Stable snake_case identifier for logs and diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::ConstAdjust => "const_adjust",
            Self::Upcast => "upcast",
            Self::PolymorphicDowncast => "polymorphic_downcast",
            Self::NonPolymorphicDowncast => "non_polymorphic_downcast",
            Self::StandardConversion => "standard_conversion",
            Self::PointerIntegerStandard => "pointer_integer_standard",
            Self::PointerIntegerGeneric => "pointer_integer_generic",
            Self::RawReinterpret => "raw_reinterpret",
            Self::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
