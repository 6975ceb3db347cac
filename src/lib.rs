//! # autocast - a policy-governed conversion dispatcher
//!
//! One generic entry point decides, while your program is being built,
//! which single conversion strategy applies between a source and a target
//! type - identity, const adjustment, upcast, checked or unchecked
//! downcast, standard numeric conversion, pointer/integer casts, or raw
//! reinterpretation - and refuses to compile anything the active policy
//! forbids. Only runtime-checked polymorphic downcasts can fail once a
//! program builds.
//!
//! ## Core concepts
//!
//! - **Policy**: a type with four permission flags fixing which unsafe
//!   categories are reachable ([`DefaultPolicy`], [`UnsafePolicy`],
//!   [`StrictPolicy`], or your own [`CastPolicy`] impl)
//! - **Category**: the one conversion strategy the classifier selects for
//!   a (source, target) pair
//! - **Declared universe**: classes and trait-object bases register their
//!   shapes and inheritance edges with [`cast_class!`] and [`cast_trait!`]
//!
//! ## Usage
//!
//! ```rust
//! use autocast::{cast, cast_class, cast_ref, cast_trait, DefaultPolicy, DynCast};
//!
//! trait Shape: DynCast {
//!     fn area(&self) -> f64;
//! }
//! cast_trait!(Shape);
//!
//! struct Circle {
//!     radius: f64,
//! }
//! impl Shape for Circle {
//!     fn area(&self) -> f64 {
//!         std::f64::consts::PI * self.radius * self.radius
//!     }
//! }
//! cast_class!(Circle: dyn Shape);
//!
//! // Numeric conversions and pointer/address casts under the default policy.
//! let wide = cast::<i64, DefaultPolicy, i32>(42);
//! assert_eq!(wide, 42);
//!
//! // Upcast, then a runtime-checked downcast back.
//! let circle = Circle { radius: 1.0 };
//! let shape = cast_ref::<dyn Shape, DefaultPolicy, Circle>(&circle);
//! let again = cast_ref::<Circle, DefaultPolicy, dyn Shape>(shape);
//! assert_eq!(again.radius, 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Descriptors and the declared type universe
pub mod declare;
pub mod shape;

// Classification
pub mod category;
pub mod classify;

// Policies and the gated converter
pub mod convert;
pub mod error;
pub mod policy;

// Re-export the primary surface at the crate root for convenience
pub use category::Category;
pub use classify::{classify, classify_between, ruling, Ruling};
pub use convert::{
    cast, cast_mut, cast_ptr, cast_ref, cast_safe, cast_strict, cast_unsafe, try_cast,
    try_cast_mut, try_cast_ptr, try_cast_ref, try_cast_safe,
};
pub use declare::DynCast;
pub use error::{CastError, CastResult};
pub use policy::{CastPolicy, DefaultPolicy, PolicyFlags, StrictPolicy, UnsafePolicy};
pub use shape::{BaseEntry, CastClass, Castable, ClassDesc, Handle, TypeDesc};
