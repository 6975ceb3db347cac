//! The policy-gated converter.
//!
//! Every entry point runs the same pipeline: classify the (source,
//! target) pair in const context, refuse forbidden or impossible
//! categories while the program is being built, then run the one arm the
//! classifier selected. The only runtime failure is the polymorphic
//! downcast's identity check; every other arm is total.
//!
//! Entry points split by handle family, the way `std::any` splits
//! `downcast` from `downcast_ref`: by-value handles (scalars, raw
//! pointers, registered classes) go through [`cast`]/[`try_cast`],
//! references through [`cast_ref`]/[`cast_mut`], and raw-pointer
//! polymorphic downcasts (whose identity check must read the pointee)
//! through the unsafe [`cast_ptr`]/[`try_cast_ptr`].

use core::mem::{transmute_copy, ManuallyDrop, MaybeUninit};
use core::ptr::addr_of;

use crate::category::Category;
use crate::classify::classify_between;
use crate::error::{CastError, CastResult};
use crate::policy::{CastPolicy, DefaultPolicy, PolicyFlags, StrictPolicy, UnsafePolicy};
use crate::shape::{BaseEntry, CastClass, Castable, ClassDesc, TypeDesc};

/// Build-time rule check, evaluated per instantiation inside `const`
/// blocks. Panicking here is a monomorphization-time compile error, the
/// moral equivalent of a failed `static_assert`.
///
/// `allow_pointer_downcast` distinguishes the unsafe raw-pointer entry
/// points, which are allowed to reach the runtime-checked downcast for
/// pointer handles.
pub(crate) const fn enforce(
    from: &TypeDesc,
    to: &TypeDesc,
    flags: PolicyFlags,
    allow_pointer_downcast: bool,
) {
    let category = classify_between(from, to);
    match category {
        Category::Invalid => {
            panic!("autocast: no conversion exists between these types")
        }
        Category::ConstAdjust => {
            assert!(
                flags.allow_const_removal,
                "autocast: removing const is forbidden by the active policy"
            );
        }
        Category::NonPolymorphicDowncast => {
            assert!(
                flags.allow_non_polymorphic_downcast,
                "autocast: non-polymorphic downcast is forbidden by the active policy"
            );
        }
        Category::PointerIntegerStandard => {
            assert!(
                flags.allow_standard_pointer_integer_cast,
                "autocast: pointer/address-integer casts are forbidden by the active policy"
            );
        }
        Category::PointerIntegerGeneric => {
            assert!(
                flags.allow_reinterpret,
                "autocast: pointer/integer reinterpretation is forbidden by the active policy"
            );
            if to.handle.is_value() {
                assert!(
                    to.class.width >= core::mem::size_of::<usize>(),
                    "autocast: the integer target is too narrow to hold an address"
                );
            }
        }
        Category::RawReinterpret => {
            assert!(
                flags.allow_reinterpret,
                "autocast: reinterpreting unrelated pointers is forbidden by the active policy"
            );
        }
        Category::Identity
        | Category::Upcast
        | Category::PolymorphicDowncast
        | Category::StandardConversion => {}
    }
    if !allow_pointer_downcast
        && matches!(category, Category::PolymorphicDowncast)
        && from.handle.is_pointer()
    {
        panic!(
            "autocast: a raw-pointer polymorphic downcast must read the pointee; \
             use the unsafe cast_ptr / try_cast_ptr entry points"
        );
    }
}

fn find_entry(entries: &'static [BaseEntry], base: &str) -> Option<&'static BaseEntry> {
    entries.iter().find(|entry| entry.base == base)
}

/// An integer or float read out of a scalar handle.
enum Scalar {
    Signed(i128),
    Unsigned(u128),
    Float(f64),
}

impl Scalar {
    /// Boolean conversion: anything non-zero is true.
    #[allow(clippy::float_cmp)]
    fn truthy(&self) -> bool {
        match *self {
            Self::Signed(v) => v != 0,
            Self::Unsigned(v) => v != 0,
            Self::Float(v) => v != 0.0,
        }
    }

    /// Truncates to address width, as Rust `as` would.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn to_address(&self) -> usize {
        match *self {
            Self::Signed(v) => v as usize,
            Self::Unsigned(v) => v as usize,
            // The classifier never pairs floats with pointers.
            Self::Float(_) => unreachable!("float handles never classify against pointers"),
        }
    }
}

/// Reads the scalar behind `src`, whose layout `class` describes.
unsafe fn read_scalar(class: &ClassDesc, src: *const u8) -> Scalar {
    if class.boolean {
        Scalar::Unsigned(u128::from(src.cast::<bool>().read()))
    } else if class.float {
        match class.width {
            4 => Scalar::Float(f64::from(src.cast::<f32>().read())),
            _ => Scalar::Float(src.cast::<f64>().read()),
        }
    } else if class.signed {
        Scalar::Signed(match class.width {
            1 => i128::from(src.cast::<i8>().read()),
            2 => i128::from(src.cast::<i16>().read()),
            4 => i128::from(src.cast::<i32>().read()),
            8 => i128::from(src.cast::<i64>().read()),
            _ => src.cast::<i128>().read(),
        })
    } else {
        Scalar::Unsigned(match class.width {
            1 => u128::from(src.cast::<u8>().read()),
            2 => u128::from(src.cast::<u16>().read()),
            4 => u128::from(src.cast::<u32>().read()),
            8 => u128::from(src.cast::<u64>().read()),
            _ => src.cast::<u128>().read(),
        })
    }
}

/// Writes `value` into `dst` with the target scalar's `as` semantics:
/// wrapping truncation between integers, saturation from floats.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_lossless
)]
unsafe fn write_scalar(class: &ClassDesc, value: Scalar, dst: *mut u8) {
    macro_rules! write_as {
        ($ty:ty) => {
            dst.cast::<$ty>().write(match value {
                Scalar::Signed(v) => v as $ty,
                Scalar::Unsigned(v) => v as $ty,
                Scalar::Float(v) => v as $ty,
            })
        };
    }

    if class.boolean {
        dst.cast::<bool>().write(value.truthy());
    } else if class.float {
        match class.width {
            4 => write_as!(f32),
            _ => write_as!(f64),
        }
    } else if class.signed {
        match class.width {
            1 => write_as!(i8),
            2 => write_as!(i16),
            4 => write_as!(i32),
            8 => write_as!(i64),
            _ => write_as!(i128),
        }
    } else {
        match class.width {
            1 => write_as!(u8),
            2 => write_as!(u16),
            4 => write_as!(u32),
            8 => write_as!(u64),
            _ => write_as!(u128),
        }
    }
}

/// The by-value pipeline. One arm per category; the match scrutinee is a
/// constant, so only the classified arm survives into the instantiation.
///
/// # Safety
///
/// Reachable arms other than the pointer polymorphic downcast are sound
/// for any input. When the classified category is `PolymorphicDowncast`
/// on pointer handles, the caller must guarantee the source pointer is
/// null or addresses a live object of its static class.
unsafe fn dispatch<To: Castable, F: Castable>(value: F) -> CastResult<To> {
    let src = ManuallyDrop::new(value);
    let src_ptr: *const u8 = addr_of!(src).cast();

    match const { classify_between(&F::DESC, &To::DESC) } {
        Category::Identity
        | Category::ConstAdjust
        | Category::PointerIntegerStandard
        | Category::RawReinterpret => {
            // Same-width bit copy; the classifier already proved the
            // representations line up.
            Ok(transmute_copy::<ManuallyDrop<F>, To>(&src))
        }
        Category::Upcast => {
            let Some(entry) = find_entry(F::DESC.bases, To::DESC.class.name) else {
                unreachable!("classifier guaranteed a declared base edge")
            };
            let mut out = MaybeUninit::<To>::uninit();
            (entry.upcast)(src_ptr, out.as_mut_ptr().cast());
            Ok(out.assume_init())
        }
        Category::PolymorphicDowncast | Category::NonPolymorphicDowncast => {
            let Some(entry) = find_entry(To::DESC.bases, F::DESC.class.name) else {
                unreachable!("classifier guaranteed a declared base edge")
            };
            let mut out = MaybeUninit::<To>::uninit();
            if (entry.downcast)(src_ptr, out.as_mut_ptr().cast()) {
                Ok(out.assume_init())
            } else {
                Err(CastError::TypeMismatch {
                    source_ty: F::DESC.class.name,
                    target: To::DESC.class.name,
                })
            }
        }
        Category::StandardConversion => {
            let scalar = read_scalar(&F::DESC.class, src_ptr);
            let mut out = MaybeUninit::<To>::uninit();
            write_scalar(&To::DESC.class, scalar, out.as_mut_ptr().cast());
            Ok(out.assume_init())
        }
        Category::PointerIntegerGeneric => {
            let mut out = MaybeUninit::<To>::uninit();
            if F::DESC.thin_pointer() {
                // Pointer to integer: zero-extend the address.
                let addr = src_ptr.cast::<usize>().read();
                write_scalar(&To::DESC.class, Scalar::Unsigned(addr as u128), out.as_mut_ptr().cast());
            } else {
                // Integer to pointer: truncate to address width.
                let addr = read_scalar(&F::DESC.class, src_ptr).to_address();
                out.as_mut_ptr().cast::<usize>().write(addr);
            }
            Ok(out.assume_init())
        }
        Category::Invalid => unreachable!("invalid conversions are refused at build time"),
    }
}

/// The shared-reference pipeline: identity, upcast, checked downcast.
fn dispatch_ref<'a, To, F>(value: &'a F) -> CastResult<&'a To>
where
    To: CastClass + ?Sized,
    F: CastClass + ?Sized,
{
    match const {
        classify_between(
            &TypeDesc::reference(F::CLASS, F::BASES, false),
            &TypeDesc::reference(To::CLASS, To::BASES, false),
        )
    } {
        Category::Identity => Ok(unsafe { transmute_copy::<&'a F, &'a To>(&value) }),
        Category::Upcast => {
            let Some(entry) = find_entry(F::BASES, To::CLASS.name) else {
                unreachable!("classifier guaranteed a declared base edge")
            };
            let mut out = MaybeUninit::<&'a To>::uninit();
            unsafe {
                (entry.upcast)(addr_of!(value).cast(), out.as_mut_ptr().cast());
                Ok(out.assume_init())
            }
        }
        Category::PolymorphicDowncast => {
            let Some(entry) = find_entry(To::BASES, F::CLASS.name) else {
                unreachable!("classifier guaranteed a declared base edge")
            };
            let mut out = MaybeUninit::<&'a To>::uninit();
            if unsafe { (entry.downcast)(addr_of!(value).cast(), out.as_mut_ptr().cast()) } {
                Ok(unsafe { out.assume_init() })
            } else {
                Err(CastError::TypeMismatch {
                    source_ty: F::CLASS.name,
                    target: To::CLASS.name,
                })
            }
        }
        _ => unreachable!("reference casts reach only identity, upcast, and checked downcast"),
    }
}

/// The mutable-reference pipeline; mirrors [`dispatch_ref`].
fn dispatch_mut<'a, To, F>(value: &'a mut F) -> CastResult<&'a mut To>
where
    To: CastClass + ?Sized,
    F: CastClass + ?Sized,
{
    match const {
        classify_between(
            &TypeDesc::reference(F::CLASS, F::BASES, true),
            &TypeDesc::reference(To::CLASS, To::BASES, true),
        )
    } {
        Category::Identity => Ok(unsafe { transmute_copy::<&'a mut F, &'a mut To>(&value) }),
        Category::Upcast => {
            let Some(entry) = find_entry(F::BASES, To::CLASS.name) else {
                unreachable!("classifier guaranteed a declared base edge")
            };
            let mut out = MaybeUninit::<&'a mut To>::uninit();
            unsafe {
                (entry.upcast)(addr_of!(value).cast(), out.as_mut_ptr().cast());
                Ok(out.assume_init())
            }
        }
        Category::PolymorphicDowncast => {
            let Some(entry) = find_entry(To::BASES, F::CLASS.name) else {
                unreachable!("classifier guaranteed a declared base edge")
            };
            let mut out = MaybeUninit::<&'a mut To>::uninit();
            if unsafe { (entry.downcast)(addr_of!(value).cast(), out.as_mut_ptr().cast()) } {
                Ok(unsafe { out.assume_init() })
            } else {
                Err(CastError::TypeMismatch {
                    source_ty: F::CLASS.name,
                    target: To::CLASS.name,
                })
            }
        }
        _ => unreachable!("reference casts reach only identity, upcast, and checked downcast"),
    }
}

/// Converts `value` to `To` under policy `P`.
///
/// The category is decided while the program is built; forbidden or
/// impossible conversions do not compile. The call itself can fail only
/// for a runtime-checked polymorphic downcast, and the raw-pointer form
/// of that category is reserved for [`cast_ptr`].
///
/// ```
/// use autocast::{cast, DefaultPolicy, UnsafePolicy};
///
/// // Standard numeric conversion, any policy.
/// assert_eq!(cast::<i64, DefaultPolicy, i32>(42), 42_i64);
///
/// // Pointer to address-width integer under the default policy.
/// let x = 7_u32;
/// let addr = cast::<usize, DefaultPolicy, *const u32>(&x);
/// assert_ne!(addr, 0);
///
/// // Round-trip through the permit-everything policy.
/// let back = cast::<*const u32, UnsafePolicy, usize>(addr);
/// assert_eq!(back, &x as *const u32);
/// ```
///
/// The default policy refuses reinterpretation at build time:
///
/// ```compile_fail
/// use autocast::{cast, DefaultPolicy};
///
/// let x = 7_u64;
/// let p: *mut u64 = &x as *const u64 as *mut u64;
/// let _ = cast::<*mut f64, DefaultPolicy, *mut u64>(p);
/// ```
///
/// Unrelated types refuse under every policy:
///
/// ```compile_fail
/// use autocast::{cast, UnsafePolicy};
///
/// let _ = cast::<*mut u8, UnsafePolicy, f64>(1.0);
/// ```
///
/// # Panics
///
/// Never: the runtime-checked category is unreachable from this entry
/// point (see [`cast_ptr`] and [`cast_ref`]).
#[must_use]
pub fn cast<To: Castable, P: CastPolicy, F: Castable>(value: F) -> To {
    const { enforce(&F::DESC, &To::DESC, P::FLAGS, false) };
    match unsafe { dispatch::<To, F>(value) } {
        Ok(converted) => converted,
        Err(err) => panic!("{err}"),
    }
}

/// [`cast`] with the default policy.
#[must_use]
pub fn cast_safe<To: Castable, F: Castable>(value: F) -> To {
    cast::<To, DefaultPolicy, F>(value)
}

/// [`cast`] with the permit-everything policy.
///
/// ```
/// use autocast::cast_unsafe;
///
/// let x = 3_i32;
/// let addr = cast_unsafe::<u64, *const i32>(&x);
/// let back = cast_unsafe::<*const i32, u64>(addr);
/// assert_eq!(back, &x as *const i32);
/// ```
#[must_use]
pub fn cast_unsafe<To: Castable, F: Castable>(value: F) -> To {
    cast::<To, UnsafePolicy, F>(value)
}

/// [`cast`] with the strict policy.
///
/// ```compile_fail
/// use autocast::cast_strict;
///
/// // Even the standard pointer/integer cast is out under strict.
/// let x = 3_i32;
/// let _ = cast_strict::<usize, *const i32>(&x);
/// ```
#[must_use]
pub fn cast_strict<To: Castable, F: Castable>(value: F) -> To {
    cast::<To, StrictPolicy, F>(value)
}

/// Fallible [`cast`]. Static refusals still do not compile; the `Option`
/// only reports runtime outcomes.
///
/// An integer target too narrow for an address is a static refusal, never
/// a silent truncation or a `None`:
///
/// ```compile_fail
/// use autocast::{try_cast, UnsafePolicy};
///
/// let x = 1_i32;
/// let _ = try_cast::<u16, UnsafePolicy, *const i32>(&x);
/// ```
#[must_use]
pub fn try_cast<To: Castable, P: CastPolicy, F: Castable>(value: F) -> Option<To> {
    const { enforce(&F::DESC, &To::DESC, P::FLAGS, false) };
    unsafe { dispatch::<To, F>(value) }.ok()
}

/// [`try_cast`] with the default policy.
#[must_use]
pub fn try_cast_safe<To: Castable, F: Castable>(value: F) -> Option<To> {
    try_cast::<To, DefaultPolicy, F>(value)
}

/// Converts a raw pointer, including runtime-checked polymorphic
/// downcasts.
///
/// Identical to [`cast`] except that the `PolymorphicDowncast` category
/// is reachable for pointer handles, whose identity check must read the
/// pointee. A null source converts to a null target without failure.
///
/// # Safety
///
/// `value`, if it is a non-null pointer handle, must address a live
/// object of its static class for the duration of the call.
///
/// # Panics
///
/// If the runtime identity check refuses the downcast. Use
/// [`try_cast_ptr`] to observe that outcome as `None`.
#[must_use]
pub unsafe fn cast_ptr<To: Castable, P: CastPolicy, F: Castable>(value: F) -> To {
    const { enforce(&F::DESC, &To::DESC, P::FLAGS, true) };
    match dispatch::<To, F>(value) {
        Ok(converted) => converted,
        Err(err) => panic!("{err}"),
    }
}

/// Fallible [`cast_ptr`]: a runtime identity mismatch is `None`, a null
/// source is `Some(null)`.
///
/// # Safety
///
/// Same contract as [`cast_ptr`].
#[must_use]
pub unsafe fn try_cast_ptr<To: Castable, P: CastPolicy, F: Castable>(value: F) -> Option<To> {
    const { enforce(&F::DESC, &To::DESC, P::FLAGS, true) };
    dispatch::<To, F>(value).ok()
}

/// Converts a shared reference: identity, upcast, or checked downcast.
///
/// ```
/// use autocast::{cast_class, cast_ref, cast_trait, DefaultPolicy, DynCast};
///
/// trait Node: DynCast {}
/// cast_trait!(Node);
///
/// struct Leaf(u32);
/// impl Node for Leaf {}
/// cast_class!(Leaf: dyn Node);
///
/// let leaf = Leaf(5);
/// let node: &dyn Node = &leaf;
/// let again = cast_ref::<Leaf, DefaultPolicy, dyn Node>(node);
/// assert_eq!(again.0, 5);
/// ```
///
/// Unchecked reference downcasts never compile; a reference to the wrong
/// type is undefined behavior the moment it exists, so only the
/// raw-pointer form carries that contract:
///
/// ```compile_fail
/// use autocast::{cast_class, cast_ref, UnsafePolicy};
///
/// struct Plain;
/// struct Extended { plain: Plain, tag: u8 }
/// cast_class!(Plain);
/// cast_class!(Extended: Plain { plain });
///
/// let plain = Plain;
/// let _ = cast_ref::<Extended, UnsafePolicy, Plain>(&plain);
/// ```
///
/// # Panics
///
/// If a polymorphic downcast's runtime identity check refuses; references
/// cannot be null, so there is no absent result on this path. Use
/// [`try_cast_ref`] for the non-panicking form.
#[must_use]
pub fn cast_ref<'a, To, P, F>(value: &'a F) -> &'a To
where
    To: CastClass + ?Sized,
    P: CastPolicy,
    F: CastClass + ?Sized,
{
    const {
        let from = TypeDesc::reference(F::CLASS, F::BASES, false);
        let to = TypeDesc::reference(To::CLASS, To::BASES, false);
        enforce(&from, &to, P::FLAGS, false);
        assert!(
            !matches!(classify_between(&from, &to), Category::NonPolymorphicDowncast),
            "autocast: an unchecked reference downcast is undefined behavior on a mismatch; \
             use the raw-pointer entry points"
        );
    };
    match dispatch_ref::<To, F>(value) {
        Ok(converted) => converted,
        Err(err) => panic!("{err}"),
    }
}

/// Fallible [`cast_ref`].
#[must_use]
pub fn try_cast_ref<'a, To, P, F>(value: &'a F) -> Option<&'a To>
where
    To: CastClass + ?Sized,
    P: CastPolicy,
    F: CastClass + ?Sized,
{
    const {
        let from = TypeDesc::reference(F::CLASS, F::BASES, false);
        let to = TypeDesc::reference(To::CLASS, To::BASES, false);
        enforce(&from, &to, P::FLAGS, false);
        assert!(
            !matches!(classify_between(&from, &to), Category::NonPolymorphicDowncast),
            "autocast: an unchecked reference downcast is undefined behavior on a mismatch; \
             use the raw-pointer entry points"
        );
    };
    dispatch_ref::<To, F>(value).ok()
}

/// Converts a mutable reference: identity, upcast, or checked downcast.
///
/// # Panics
///
/// Same contract as [`cast_ref`].
#[must_use]
pub fn cast_mut<'a, To, P, F>(value: &'a mut F) -> &'a mut To
where
    To: CastClass + ?Sized,
    P: CastPolicy,
    F: CastClass + ?Sized,
{
    const {
        let from = TypeDesc::reference(F::CLASS, F::BASES, true);
        let to = TypeDesc::reference(To::CLASS, To::BASES, true);
        enforce(&from, &to, P::FLAGS, false);
        assert!(
            !matches!(classify_between(&from, &to), Category::NonPolymorphicDowncast),
            "autocast: an unchecked reference downcast is undefined behavior on a mismatch; \
             use the raw-pointer entry points"
        );
    };
    match dispatch_mut::<To, F>(value) {
        Ok(converted) => converted,
        Err(err) => panic!("{err}"),
    }
}

/// Fallible [`cast_mut`].
#[must_use]
pub fn try_cast_mut<'a, To, P, F>(value: &'a mut F) -> Option<&'a mut To>
where
    To: CastClass + ?Sized,
    P: CastPolicy,
    F: CastClass + ?Sized,
{
    const {
        let from = TypeDesc::reference(F::CLASS, F::BASES, true);
        let to = TypeDesc::reference(To::CLASS, To::BASES, true);
        enforce(&from, &to, P::FLAGS, false);
        assert!(
            !matches!(classify_between(&from, &to), Category::NonPolymorphicDowncast),
            "autocast: an unchecked reference downcast is undefined behavior on a mismatch; \
             use the raw-pointer entry points"
        );
    };
    dispatch_mut::<To, F>(value).ok()
}
