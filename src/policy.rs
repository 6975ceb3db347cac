//! Conversion policies.
//!
//! A policy is a *type* carrying four independent permission flags plus a
//! descriptive tag. Keeping the flags as associated constants lets the
//! converter evaluate the rule table during monomorphization, so a
//! forbidden conversion never survives to runtime.
//!
//! Policies are intentionally pure configuration: the same (source,
//! target, policy) triple always produces the same verdict.

use serde::Serialize;

use crate::category::Category;

/// A conversion policy, fixed at the call site.
///
/// The three built-in policies cover the common ground; callers define
/// custom ones by implementing this trait on a unit struct:
///
/// ```
/// use autocast::CastPolicy;
///
/// /// Allows const removal, forbids everything else unsafe.
/// struct Audited;
///
/// impl CastPolicy for Audited {
///     const TAG: &'static str = "audited";
///     const ALLOW_REINTERPRET: bool = false;
///     const ALLOW_CONST_REMOVAL: bool = true;
///     const ALLOW_NON_POLYMORPHIC_DOWNCAST: bool = false;
///     const ALLOW_STANDARD_POINTER_INTEGER_CAST: bool = false;
/// }
///
/// assert!(Audited::FLAGS.allow_const_removal);
/// ```
pub trait CastPolicy {
    /// Short descriptive tag for diagnostics.
    const TAG: &'static str;
    /// Permits unrelated-pointer and pointer/non-standard-integer
    /// reinterpretation.
    const ALLOW_REINTERPRET: bool;
    /// Permits stripping a const qualifier between same-referent pointers.
    const ALLOW_CONST_REMOVAL: bool;
    /// Permits unchecked downcasts from bases without runtime identity.
    const ALLOW_NON_POLYMORPHIC_DOWNCAST: bool;
    /// Permits thin-pointer/address-width-integer conversion.
    const ALLOW_STANDARD_POINTER_INTEGER_CAST: bool;

    /// Value-level snapshot of the flags, usable in const context.
    const FLAGS: PolicyFlags = PolicyFlags {
        tag: Self::TAG,
        allow_reinterpret: Self::ALLOW_REINTERPRET,
        allow_const_removal: Self::ALLOW_CONST_REMOVAL,
        allow_non_polymorphic_downcast: Self::ALLOW_NON_POLYMORPHIC_DOWNCAST,
        allow_standard_pointer_integer_cast: Self::ALLOW_STANDARD_POINTER_INTEGER_CAST,
    };
}

/// The default policy: const removal and standard pointer/integer casts
/// allowed; reinterpretation and unchecked downcasts forbidden.
///
/// An unchecked downcast does not compile under it:
///
/// ```compile_fail
/// use autocast::{cast, cast_class, DefaultPolicy};
///
/// struct Frame;
/// struct KeyFrame { frame: Frame, index: u32 }
/// cast_class!(Frame);
/// cast_class!(KeyFrame: Frame { frame });
///
/// let frame = Frame;
/// let base: *const Frame = &frame;
/// let _ = cast::<*const KeyFrame, DefaultPolicy, *const Frame>(base);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl CastPolicy for DefaultPolicy {
    const TAG: &'static str = "default";
    const ALLOW_REINTERPRET: bool = false;
    const ALLOW_CONST_REMOVAL: bool = true;
    const ALLOW_NON_POLYMORPHIC_DOWNCAST: bool = false;
    const ALLOW_STANDARD_POINTER_INTEGER_CAST: bool = true;
}

/// The permit-everything policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsafePolicy;

impl CastPolicy for UnsafePolicy {
    const TAG: &'static str = "unsafe";
    const ALLOW_REINTERPRET: bool = true;
    const ALLOW_CONST_REMOVAL: bool = true;
    const ALLOW_NON_POLYMORPHIC_DOWNCAST: bool = true;
    const ALLOW_STANDARD_POINTER_INTEGER_CAST: bool = true;
}

/// The strict policy: only identity, upcasts, checked downcasts, and
/// standard numeric conversions remain reachable.
///
/// Removing const does not compile under it:
///
/// ```compile_fail
/// use autocast::{cast, StrictPolicy};
///
/// let x = 1_i32;
/// let shared: *const i32 = &x;
/// let _ = cast::<*mut i32, StrictPolicy, *const i32>(shared);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl CastPolicy for StrictPolicy {
    const TAG: &'static str = "strict";
    const ALLOW_REINTERPRET: bool = false;
    const ALLOW_CONST_REMOVAL: bool = false;
    const ALLOW_NON_POLYMORPHIC_DOWNCAST: bool = false;
    const ALLOW_STANDARD_POINTER_INTEGER_CAST: bool = false;
}

/// Value-level mirror of a policy, for auditing and logging.
///
/// Serializes for audit logs; the tag is a `&'static str`, so the type is
/// write-only on the serde side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct PolicyFlags {
    /// The policy's descriptive tag.
    pub tag: &'static str,
    /// See [`CastPolicy::ALLOW_REINTERPRET`].
    pub allow_reinterpret: bool,
    /// See [`CastPolicy::ALLOW_CONST_REMOVAL`].
    pub allow_const_removal: bool,
    /// See [`CastPolicy::ALLOW_NON_POLYMORPHIC_DOWNCAST`].
    pub allow_non_polymorphic_downcast: bool,
    /// See [`CastPolicy::ALLOW_STANDARD_POINTER_INTEGER_CAST`].
    pub allow_standard_pointer_integer_cast: bool,
}

impl PolicyFlags {
    /// The rule table: whether this policy permits `category`.
    ///
    /// Identity, upcasts, standard conversions, and polymorphic downcasts
    /// are always permitted; a polymorphic downcast is runtime-checked,
    /// which is why no flag forbids attempting it. `Invalid` is never
    /// permitted.
    #[must_use]
    pub const fn permits(self, category: Category) -> bool {
        match category {
            Category::Identity
            | Category::Upcast
            | Category::PolymorphicDowncast
            | Category::StandardConversion => true,
            Category::ConstAdjust => self.allow_const_removal,
            Category::NonPolymorphicDowncast => self.allow_non_polymorphic_downcast,
            Category::PointerIntegerStandard => self.allow_standard_pointer_integer_cast,
            Category::PointerIntegerGeneric | Category::RawReinterpret => self.allow_reinterpret,
            Category::Invalid => false,
        }
    }
}
