//! A short tour of the conversion policies.
//!
//! Thin consumer of the dispatcher: walks each built-in policy plus a
//! custom one and prints what happens. Conversions a policy forbids are
//! shown through [`autocast::ruling`] - writing them as casts would stop
//! this binary from compiling, which is the point of the policy gates.

use autocast::{
    cast, cast_class, cast_trait, cast_unsafe, ruling, try_cast_ptr, CastPolicy, DefaultPolicy,
    DynCast, StrictPolicy, UnsafePolicy,
};

trait Beast: DynCast {
    fn speak(&self) -> &'static str;
}
cast_trait!(Beast);

struct Wolf;
impl Beast for Wolf {
    fn speak(&self) -> &'static str {
        "awoo"
    }
}

struct Lamb;
impl Beast for Lamb {
    fn speak(&self) -> &'static str {
        "baa"
    }
}

cast_class!(Wolf: dyn Beast);
cast_class!(Lamb: dyn Beast);

struct Plain {
    tag: u8,
}

struct Fancy {
    plain: Plain,
    trim: u8,
}

cast_class!(Plain);
cast_class!(Fancy: Plain { plain });

/// Const removal allowed, everything else unsafe forbidden.
struct HousePolicy;

impl CastPolicy for HousePolicy {
    const TAG: &'static str = "house";
    const ALLOW_REINTERPRET: bool = false;
    const ALLOW_CONST_REMOVAL: bool = true;
    const ALLOW_NON_POLYMORPHIC_DOWNCAST: bool = false;
    const ALLOW_STANDARD_POINTER_INTEGER_CAST: bool = true;
}

fn main() {
    println!("=== default policy ===");
    let x = 42_i32;
    let addr = cast::<usize, DefaultPolicy, *const i32>(&x);
    println!("pointer -> usize: {addr:#x}");
    let verdict = ruling::<*mut i32, *mut f64, DefaultPolicy>();
    println!(
        "reinterpreting *mut i32 as *mut f64 would be {} ({})",
        verdict.category,
        if verdict.permitted { "permitted" } else { "refused at build time" }
    );

    println!("\n=== unsafe policy ===");
    let p = cast_unsafe::<*mut i32, usize>(addr);
    println!("usize -> pointer round-trips: {}", p.cast_const() == core::ptr::addr_of!(x));

    let mut fancy = Fancy { plain: Plain { tag: 7 }, trim: 1 };
    let base = cast::<*mut Plain, DefaultPolicy, *mut Fancy>(&mut fancy);
    let derived = cast::<*mut Fancy, UnsafePolicy, *mut Plain>(base);
    println!(
        "unchecked downcast recovers the derived object: tag={} trim={}",
        unsafe { (*derived).plain.tag },
        unsafe { (*derived).trim },
    );

    println!("\n=== strict policy ===");
    println!("standard conversion still works: {}", cast::<i64, StrictPolicy, i16>(-3));
    let verdict = ruling::<*const i32, *mut i32, StrictPolicy>();
    println!(
        "removing const would be {} ({})",
        verdict.category,
        if verdict.permitted { "permitted" } else { "refused at build time" }
    );

    println!("\n=== runtime-checked downcasts ===");
    let mut wolf = Wolf;
    let beast: *mut dyn Beast = &mut wolf;
    match unsafe { try_cast_ptr::<*mut Wolf, DefaultPolicy, *mut dyn Beast>(beast) } {
        Some(wolf) => println!("the beast is a wolf: {}", unsafe { (*wolf).speak() }),
        None => println!("the beast is not a wolf"),
    }

    let mut lamb = Lamb;
    let beast: *mut dyn Beast = &mut lamb;
    match unsafe { try_cast_ptr::<*mut Wolf, DefaultPolicy, *mut dyn Beast>(beast) } {
        Some(_) => println!("the beast is a wolf (should not happen)"),
        None => println!("the lamb is not a wolf: {}", lamb.speak()),
    }

    println!("\n=== custom policy ===");
    let shared: *const i32 = &x;
    let exclusive = cast::<*mut i32, HousePolicy, *const i32>(shared);
    println!("house policy strips const: {}", exclusive.cast_const() == shared);
    let verdict = ruling::<*mut Plain, *mut Fancy, HousePolicy>();
    println!(
        "house policy on an unchecked downcast: {} ({})",
        verdict.category,
        if verdict.permitted { "permitted" } else { "refused at build time" }
    );
}
