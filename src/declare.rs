//! Hierarchy declaration: the as-any hook and the registration macros.
//!
//! Rust has no inheritance, so the cast universe declares its edges:
//!
//! - a *polymorphic base* is a trait object. The trait takes [`DynCast`]
//!   as a supertrait (satisfied automatically for every concrete type)
//!   and registers with [`cast_trait!`];
//! - a *concrete base* is an embedded field of the derived struct,
//!   registered with [`cast_class!`] and a `{ field }` clause naming the
//!   embedding.
//!
//! Each base clause registers one direct edge; deeper trees list every
//! ancestor as its own clause. The macros generate the `unsafe`
//! registration impls so the declared facts (names, offsets, vtable
//! attachment) stay mechanically in sync with the types.

use std::any::Any;

/// Object-safe access to `std::any` identity, for polymorphic bases.
///
/// Implemented for every `'static` type, so declaring a polymorphic base
/// is just a supertrait bound:
///
/// ```
/// use autocast::DynCast;
///
/// trait Shape: DynCast {
///     fn area(&self) -> f64;
/// }
/// ```
///
/// A checked downcast calls `as_any` through the base vtable, which is
/// what makes the identity the *most derived* type rather than the
/// static one.
pub trait DynCast: Any {
    /// The value as `Any`, with its concrete type's identity.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> DynCast for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Registers a trait object as a polymorphic base.
///
/// The trait must have [`DynCast`] as a supertrait. Invoke next to the
/// trait definition so the registered name is qualified by the defining
/// module.
///
/// ```
/// use autocast::{cast_trait, DynCast};
///
/// trait Shape: DynCast {}
/// cast_trait!(Shape);
/// ```
#[macro_export]
macro_rules! cast_trait {
    ($tr:path) => {
        unsafe impl $crate::CastClass for dyn $tr {
            const CLASS: $crate::ClassDesc = $crate::ClassDesc::dyn_trait(concat!(
                module_path!(),
                "::dyn ",
                stringify!($tr)
            ));
        }
    };
}

/// Registers a concrete class, with optional base clauses.
///
/// A bare trait-object type declares a polymorphic edge; a `Base { field }`
/// clause declares an embedded concrete base at that field. Invoke next
/// to the struct definition.
///
/// ```
/// use autocast::{cast_class, cast_trait, DynCast};
///
/// trait Shape: DynCast {}
/// cast_trait!(Shape);
///
/// struct Unit;
/// struct Circle {
///     unit: Unit,
///     radius: f64,
/// }
/// impl Shape for Circle {}
///
/// cast_class!(Unit);
/// cast_class!(Circle: dyn Shape, Unit { unit });
/// ```
#[macro_export]
macro_rules! cast_class {
    // Entry for an embedded concrete base: address adjustment by the
    // field offset, unchecked in the downcast direction.
    (@entry $ty:ty, $base:ty, $field:ident) => {{
        unsafe fn up(src: *const u8, dst: *mut u8) {
            let p = src.cast::<*mut $ty>().read();
            let q = if p.is_null() {
                ::core::ptr::null_mut()
            } else {
                p.cast::<u8>()
                    .wrapping_add(::core::mem::offset_of!($ty, $field))
                    .cast::<$base>()
            };
            dst.cast::<*mut $base>().write(q);
        }
        unsafe fn down(src: *const u8, dst: *mut u8) -> bool {
            let p = src.cast::<*mut $base>().read();
            let q = if p.is_null() {
                ::core::ptr::null_mut()
            } else {
                p.cast::<u8>()
                    .wrapping_sub(::core::mem::offset_of!($ty, $field))
                    .cast::<$ty>()
            };
            dst.cast::<*mut $ty>().write(q);
            true
        }
        $crate::BaseEntry {
            base: <$base as $crate::CastClass>::CLASS.name,
            upcast: up,
            downcast: down,
        }
    }};
    // Entry for a polymorphic trait-object base: vtable attachment on the
    // way up, an `Any` identity check on the way down.
    (@entry $ty:ty, $base:ty) => {{
        unsafe fn up(src: *const u8, dst: *mut u8) {
            let p = src.cast::<*mut $ty>().read();
            dst.cast::<*mut $base>().write(p as *mut $base);
        }
        unsafe fn down(src: *const u8, dst: *mut u8) -> bool {
            let p = src.cast::<*mut $base>().read();
            if p.is_null() {
                dst.cast::<*mut $ty>().write(::core::ptr::null_mut());
                return true;
            }
            match $crate::DynCast::as_any(&*p).downcast_ref::<$ty>() {
                ::core::option::Option::Some(hit) => {
                    dst.cast::<*mut $ty>().write((hit as *const $ty).cast_mut());
                    true
                }
                ::core::option::Option::None => false,
            }
        }
        $crate::BaseEntry {
            base: <$base as $crate::CastClass>::CLASS.name,
            upcast: up,
            downcast: down,
        }
    }};
    ($ty:ty) => {
        unsafe impl $crate::CastClass for $ty {
            const CLASS: $crate::ClassDesc = $crate::ClassDesc::structure(
                concat!(module_path!(), "::", stringify!($ty)),
                &[],
            );
        }
        unsafe impl $crate::Castable for $ty {
            const DESC: $crate::TypeDesc = $crate::TypeDesc::value(
                <$ty as $crate::CastClass>::CLASS,
                <$ty as $crate::CastClass>::BASES,
            );
        }
    };
    ($ty:ty : $($base:ty $({ $field:ident })?),+ $(,)?) => {
        unsafe impl $crate::CastClass for $ty {
            const CLASS: $crate::ClassDesc = $crate::ClassDesc::structure(
                concat!(module_path!(), "::", stringify!($ty)),
                &[$(<$base as $crate::CastClass>::CLASS.name),+],
            );
            const BASES: &'static [$crate::BaseEntry] =
                &[$($crate::cast_class!(@entry $ty, $base $(, $field)?)),+];
        }
        unsafe impl $crate::Castable for $ty {
            const DESC: $crate::TypeDesc = $crate::TypeDesc::value(
                <$ty as $crate::CastClass>::CLASS,
                <$ty as $crate::CastClass>::BASES,
            );
        }
    };
}

#[cfg(test)]
mod tests {
    use core::mem::MaybeUninit;
    use core::ptr::addr_of;

    use crate::shape::CastClass;
    use crate::DynCast;

    trait Shape: DynCast {
        fn area(&self) -> f64;
    }
    crate::cast_trait!(Shape);

    struct Anchor;

    struct Circle {
        anchor: Anchor,
        radius: f64,
    }

    impl Shape for Circle {
        fn area(&self) -> f64 {
            std::f64::consts::PI * self.radius * self.radius
        }
    }

    struct Square {
        side: f64,
    }

    impl Shape for Square {
        fn area(&self) -> f64 {
            self.side * self.side
        }
    }

    crate::cast_class!(Anchor);
    crate::cast_class!(Circle: dyn Shape, Anchor { anchor });
    crate::cast_class!(Square: dyn Shape);

    #[test]
    fn test_registered_names_are_module_qualified() {
        assert!(<Circle as CastClass>::CLASS.name.ends_with("declare::tests::Circle"));
        assert!(<dyn Shape as CastClass>::CLASS.name.ends_with("declare::tests::dyn Shape"));
    }

    #[test]
    fn test_base_lists_follow_declarations() {
        let circle = <Circle as CastClass>::CLASS;
        assert!(circle.lists_base(<dyn Shape as CastClass>::CLASS.name));
        assert!(circle.lists_base(<Anchor as CastClass>::CLASS.name));
        assert!(!<Square as CastClass>::CLASS.lists_base(<Anchor as CastClass>::CLASS.name));
        assert!(<dyn Shape as CastClass>::CLASS.polymorphic);
        assert!(!circle.polymorphic);
    }

    #[test]
    fn test_embedded_base_projection_round_trip() {
        let entry = <Circle as CastClass>::BASES
            .iter()
            .find(|e| e.base == <Anchor as CastClass>::CLASS.name)
            .unwrap();

        let mut circle = Circle { anchor: Anchor, radius: 1.0 };
        let derived: *mut Circle = &mut circle;

        let mut base = MaybeUninit::<*mut Anchor>::uninit();
        unsafe {
            (entry.upcast)(
                addr_of!(derived).cast(),
                base.as_mut_ptr().cast(),
            );
        }
        let base = unsafe { base.assume_init() };
        assert_eq!(base.cast::<u8>(), addr_of!(circle.anchor).cast_mut().cast::<u8>());

        let mut back = MaybeUninit::<*mut Circle>::uninit();
        let ok = unsafe { (entry.downcast)(addr_of!(base).cast(), back.as_mut_ptr().cast()) };
        assert!(ok);
        assert_eq!(unsafe { back.assume_init() }, derived);
    }

    #[test]
    fn test_polymorphic_identity_check() {
        let entry = <Circle as CastClass>::BASES
            .iter()
            .find(|e| e.base == <dyn Shape as CastClass>::CLASS.name)
            .unwrap();

        let mut circle = Circle { anchor: Anchor, radius: 2.0 };
        let as_shape: *mut dyn Shape = &mut circle;

        let mut hit = MaybeUninit::<*mut Circle>::uninit();
        let ok = unsafe { (entry.downcast)(addr_of!(as_shape).cast(), hit.as_mut_ptr().cast()) };
        assert!(ok);
        assert_eq!(unsafe { hit.assume_init() }, &mut circle as *mut Circle);

        // A Square behind the same base trait is refused.
        let mut square = Square { side: 1.0 };
        let as_shape: *mut dyn Shape = &mut square;
        let ok = unsafe { (entry.downcast)(addr_of!(as_shape).cast(), hit.as_mut_ptr().cast()) };
        assert!(!ok);
    }

    #[test]
    fn test_null_pointer_maps_to_null() {
        let entry = &<Square as CastClass>::BASES[0];

        let null_derived: *mut Square = core::ptr::null_mut();
        let mut fat = MaybeUninit::<*mut dyn Shape>::uninit();
        unsafe { (entry.upcast)(addr_of!(null_derived).cast(), fat.as_mut_ptr().cast()) };
        assert!(unsafe { fat.assume_init() }.is_null());

        let mut thin = MaybeUninit::<*mut Square>::uninit();
        let fat = unsafe { fat.assume_init() };
        let ok = unsafe { (entry.downcast)(addr_of!(fat).cast(), thin.as_mut_ptr().cast()) };
        assert!(ok);
        assert!(unsafe { thin.assume_init() }.is_null());
    }
}
