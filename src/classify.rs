//! The type-relationship classifier.
//!
//! [`classify_between`] is a single ordered predicate chain over two
//! [`TypeDesc`]s: first match wins, and every pair lands in exactly one
//! [`Category`]. The chain is a `const fn`, so the converter can evaluate
//! it while monomorphizing and turn forbidden results into build errors.
//!
//! Policy flags are deliberately *not* an input here. A structurally
//! matching category wins the precedence check even when the active
//! policy forbids it; the refusal then happens at the policy gate, never
//! by silently falling through to a weaker category.

use serde::Serialize;

use crate::category::Category;
use crate::policy::{CastPolicy, PolicyFlags};
use crate::shape::{Castable, TypeDesc};

/// Classifies the conversion between two declared handle shapes.
///
/// Precedence, first match wins:
///
/// 1. identical handle and referent: [`Category::Identity`];
/// 2. same-referent pointers differing in constness: removal is
///    [`Category::ConstAdjust`], addition passes through as identity;
/// 3. target referent is a declared base: [`Category::Upcast`];
/// 4. source referent is a declared base: [`Category::PolymorphicDowncast`]
///    when the source carries runtime identity, otherwise
///    [`Category::NonPolymorphicDowncast`];
/// 5. both numeric scalars by value: [`Category::StandardConversion`];
/// 6. thin pointer paired with an address-width integer:
///    [`Category::PointerIntegerStandard`];
/// 7. thin pointer paired with any other integer:
///    [`Category::PointerIntegerGeneric`]; unrelated thin pointers:
///    [`Category::RawReinterpret`];
/// 8. anything else: [`Category::Invalid`].
///
/// Dropping a const qualifier while moving along an inheritance edge is
/// `Invalid` (steps 3 and 4 require constness to be preserved), and
/// reference-level const removal is `Invalid` outright: Rust has no sound
/// `&T -> &mut T`.
#[must_use]
pub const fn classify_between(from: &TypeDesc, to: &TypeDesc) -> Category {
    let same_class = from.class.same_class(&to.class);

    // 1. Identical handle shape and referent.
    if same_class && from.handle.mutable() == to.handle.mutable() && from.handle.same_family(to.handle) {
        return Category::Identity;
    }

    // 2. Same referent, const qualification differs.
    if same_class && from.handle.same_family(to.handle) {
        if !from.handle.mutable() && to.handle.mutable() {
            // Removal is gated for pointers; `&T -> &mut T` has no sound
            // meaning in Rust at all.
            if from.handle.is_pointer() {
                return Category::ConstAdjust;
            }
            return Category::Invalid;
        }
        // Adding const never needs permission.
        return Category::Identity;
    }

    // 3 / 4. Declared inheritance, pointers with pointers and references
    // with references only.
    if from.handle.same_family(to.handle)
        && (from.handle.is_pointer() || from.handle.is_reference())
    {
        if from.class.lists_base(to.class.name) {
            if from.handle.keeps_const(to.handle) {
                return Category::Upcast;
            }
            return Category::Invalid;
        }
        if to.class.lists_base(from.class.name) {
            if !from.handle.keeps_const(to.handle) {
                return Category::Invalid;
            }
            if from.class.polymorphic {
                return Category::PolymorphicDowncast;
            }
            return Category::NonPolymorphicDowncast;
        }
    }

    // 5. Ordinary scalar conversion.
    if from.handle.is_value()
        && to.handle.is_value()
        && from.class.numeric()
        && to.class.numeric()
    {
        return Category::StandardConversion;
    }

    // 6. Thin pointer <-> address-width integer.
    if (from.thin_pointer() && to.handle.is_value() && to.class.address_integer)
        || (from.handle.is_value() && from.class.address_integer && to.thin_pointer())
    {
        return Category::PointerIntegerStandard;
    }

    // 7. Thin pointer <-> any other integer, or unrelated thin pointers.
    if (from.thin_pointer() && to.handle.is_value() && to.class.integral)
        || (from.handle.is_value() && from.class.integral && to.thin_pointer())
    {
        return Category::PointerIntegerGeneric;
    }
    if from.thin_pointer() && to.thin_pointer() {
        return Category::RawReinterpret;
    }

    Category::Invalid
}

/// Classifies the conversion from handle type `From` to handle type `To`.
///
/// Identity holds for every type against itself:
///
/// ```
/// use autocast::{classify, Category};
///
/// assert_eq!(classify::<i32, i32>(), Category::Identity);
/// assert_eq!(classify::<i32, f64>(), Category::StandardConversion);
/// assert_eq!(classify::<*mut i32, usize>(), Category::PointerIntegerStandard);
/// assert_eq!(classify::<*mut i32, *mut f64>(), Category::RawReinterpret);
/// ```
#[must_use]
pub const fn classify<From: Castable, To: Castable>() -> Category {
    classify_between(&From::DESC, &To::DESC)
}

/// A reified verdict over one (source, target, policy) triple.
///
/// The conversion attempt itself is transient; this record is the
/// loggable shadow of it, produced without performing any conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ruling {
    /// Module-qualified source handle referent name.
    pub source: &'static str,
    /// Module-qualified target handle referent name.
    pub target: &'static str,
    /// The structurally matching category.
    pub category: Category,
    /// The policy consulted.
    pub policy: PolicyFlags,
    /// Whether the policy permits the category.
    pub permitted: bool,
}

/// Produces the [`Ruling`] for a conversion without attempting it.
///
/// ```
/// use autocast::{ruling, Category, DefaultPolicy, StrictPolicy};
///
/// let r = ruling::<*const i32, *mut i32, DefaultPolicy>();
/// assert_eq!(r.category, Category::ConstAdjust);
/// assert!(r.permitted);
///
/// let r = ruling::<*const i32, *mut i32, StrictPolicy>();
/// assert!(!r.permitted);
/// ```
#[must_use]
pub const fn ruling<From: Castable, To: Castable, P: CastPolicy>() -> Ruling {
    let category = classify::<From, To>();
    Ruling {
        source: From::DESC.class.name,
        target: To::DESC.class.name,
        category,
        policy: P::FLAGS,
        permitted: P::FLAGS.permits(category),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{DefaultPolicy, StrictPolicy, UnsafePolicy};
    use crate::shape::{BaseEntry, ClassDesc};

    // Hand-built descriptors: the classifier only reads names and flags,
    // so the projection functions can be stubs.
    unsafe fn stub_up(_src: *const u8, _dst: *mut u8) {}
    unsafe fn stub_down(_src: *const u8, _dst: *mut u8) -> bool {
        true
    }

    const BASE: ClassDesc = ClassDesc::structure("t::Base", &[]);
    const DERIVED: ClassDesc = ClassDesc::structure("t::Derived", &["t::Base"]);
    const DYN_SHAPE: ClassDesc = ClassDesc::dyn_trait("t::dyn Shape");
    const CIRCLE: ClassDesc = ClassDesc::structure("t::Circle", &["t::dyn Shape"]);
    const ENTRY: &[BaseEntry] = &[BaseEntry {
        base: "t::Base",
        upcast: stub_up,
        downcast: stub_down,
    }];

    const fn ptr(class: ClassDesc, bases: &'static [BaseEntry], mutable: bool) -> TypeDesc {
        TypeDesc::pointer(class, bases, mutable)
    }

    #[test]
    fn test_identity_beats_everything() {
        // Same type in every handle family.
        assert_eq!(
            classify_between(&TypeDesc::value(BASE, &[]), &TypeDesc::value(BASE, &[])),
            Category::Identity
        );
        assert_eq!(
            classify_between(&ptr(DERIVED, ENTRY, true), &ptr(DERIVED, ENTRY, true)),
            Category::Identity
        );
        assert_eq!(classify::<usize, usize>(), Category::Identity);
        assert_eq!(classify::<*mut f64, *mut f64>(), Category::Identity);
    }

    #[test]
    fn test_const_adjustment_directions() {
        // Removal needs permission, addition is a pass-through.
        assert_eq!(classify::<*const i32, *mut i32>(), Category::ConstAdjust);
        assert_eq!(classify::<*mut i32, *const i32>(), Category::Identity);
    }

    #[test]
    fn test_reference_const_removal_is_invalid() {
        let shared = TypeDesc::reference(BASE, &[], false);
        let exclusive = TypeDesc::reference(BASE, &[], true);
        assert_eq!(classify_between(&shared, &exclusive), Category::Invalid);
        // Adding const on references still passes through.
        assert_eq!(classify_between(&exclusive, &shared), Category::Identity);
    }

    #[test]
    fn test_upcast_direction() {
        assert_eq!(
            classify_between(&ptr(DERIVED, ENTRY, true), &ptr(BASE, &[], true)),
            Category::Upcast
        );
        // References upcast too.
        assert_eq!(
            classify_between(
                &TypeDesc::reference(DERIVED, ENTRY, false),
                &TypeDesc::reference(BASE, &[], false)
            ),
            Category::Upcast
        );
        // Mixed families never relate.
        assert_eq!(
            classify_between(&ptr(DERIVED, ENTRY, true), &TypeDesc::reference(BASE, &[], false)),
            Category::Invalid
        );
    }

    #[test]
    fn test_upcast_never_drops_const() {
        assert_eq!(
            classify_between(&ptr(DERIVED, ENTRY, false), &ptr(BASE, &[], true)),
            Category::Invalid
        );
        // Adding const while upcasting is fine.
        assert_eq!(
            classify_between(&ptr(DERIVED, ENTRY, true), &ptr(BASE, &[], false)),
            Category::Upcast
        );
    }

    #[test]
    fn test_downcast_split_on_polymorphism() {
        assert_eq!(
            classify_between(&ptr(BASE, &[], true), &ptr(DERIVED, ENTRY, true)),
            Category::NonPolymorphicDowncast
        );
        assert_eq!(
            classify_between(&ptr(DYN_SHAPE, &[], true), &ptr(CIRCLE, &[], true)),
            Category::PolymorphicDowncast
        );
    }

    #[test]
    fn test_standard_conversions() {
        assert_eq!(classify::<i32, i64>(), Category::StandardConversion);
        assert_eq!(classify::<i64, i16>(), Category::StandardConversion);
        assert_eq!(classify::<u8, f64>(), Category::StandardConversion);
        assert_eq!(classify::<f64, bool>(), Category::StandardConversion);
        assert_eq!(classify::<usize, isize>(), Category::StandardConversion);
    }

    #[test]
    fn test_pointer_integer_pairs() {
        assert_eq!(classify::<*mut i32, usize>(), Category::PointerIntegerStandard);
        assert_eq!(classify::<isize, *const f64>(), Category::PointerIntegerStandard);
        assert_eq!(classify::<*mut i32, u64>(), Category::PointerIntegerGeneric);
        assert_eq!(classify::<u32, *mut i32>(), Category::PointerIntegerGeneric);
        // Floats never reinterpret against pointers.
        assert_eq!(classify::<*mut i32, f64>(), Category::Invalid);
    }

    #[test]
    fn test_raw_reinterpret_is_last_pointer_resort() {
        assert_eq!(classify::<*mut i32, *mut f64>(), Category::RawReinterpret);
        assert_eq!(classify::<*const u8, *mut u64>(), Category::RawReinterpret);
        // Related pointers classified earlier never reach reinterpret.
        assert_eq!(
            classify_between(&ptr(DERIVED, ENTRY, true), &ptr(BASE, &[], true)),
            Category::Upcast
        );
    }

    #[test]
    fn test_fat_pointers_never_reinterpret() {
        let dyn_ptr = ptr(DYN_SHAPE, &[], true);
        assert_eq!(
            classify_between(&dyn_ptr, &TypeDesc::value(<usize as crate::shape::CastClass>::CLASS, &[])),
            Category::Invalid
        );
        assert_eq!(
            classify_between(&dyn_ptr, &ptr(BASE, &[], true)),
            Category::Invalid
        );
    }

    #[test]
    fn test_unrelated_values_are_invalid() {
        let a = TypeDesc::value(BASE, &[]);
        let b = TypeDesc::value(DERIVED, ENTRY);
        // No by-value slicing along inheritance edges.
        assert_eq!(classify_between(&b, &a), Category::Invalid);
        assert_eq!(classify_between(&a, &b), Category::Invalid);
    }

    #[test]
    fn test_classification_ignores_policy() {
        // The category is structural; only `permitted` tracks the policy.
        let strict = ruling::<*const i32, *mut i32, StrictPolicy>();
        let lax = ruling::<*const i32, *mut i32, UnsafePolicy>();
        assert_eq!(strict.category, Category::ConstAdjust);
        assert_eq!(strict.category, lax.category);
        assert!(!strict.permitted);
        assert!(lax.permitted);
    }

    #[test]
    fn test_ruling_serialization() {
        let r = ruling::<*mut i32, usize, DefaultPolicy>();
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"category\":\"pointer_integer_standard\""));
        assert!(json.contains("\"permitted\":true"));
        assert!(json.contains("\"tag\":\"default\""));
    }
}
