//! Compiled programs as composable effects.
//!
//! [`Interpreter::compile`](crate::Interpreter::compile) turns a program into
//! a [`Kleisli`](crate::Kleisli): a value implementing [`Effect`] whose
//! environment is the algebra's handle. Effects compose with the zero-cost
//! combinators of [`EffectExt`] and can be type-erased with
//! [`boxed`](EffectExt::boxed) when different effects must share a type.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sluice::algebra::large_object::{self, LargeObjectHandle};
//! use sluice::effect::EffectExt;
//! use sluice::runtime::Inline;
//! use sluice::testing::{Journal, MockLargeObject};
//! use sluice::Interpreters;
//!
//! # tokio_test::block_on(async {
//! let interpreters = Interpreters::new(Inline::new());
//! let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 7));
//!
//! let doubled = interpreters
//!     .large_object
//!     .compile(large_object::write(b"abc".to_vec()).then(large_object::size()))
//!     .map(|size| size * 2);
//!
//! assert_eq!(doubled.execute(&object).await, Ok(6));
//! # });
//! ```

mod boxed;
pub mod combinators;
mod ext;
mod trait_def;

pub use boxed::{BoxFuture, BoxedEffect};
pub use combinators::{pure, AndThen, Map, OrElse, Pure};
pub use ext::EffectExt;
pub use trait_def::Effect;
