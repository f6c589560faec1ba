//! The `Effect` trait.

use std::future::Future;

/// A computation that needs an environment and may fail.
///
/// Combinators return concrete types, like `Future` and `Iterator`; use
/// [`boxed`](crate::effect::EffectExt::boxed) when type erasure is needed.
///
/// For a compiled program the environment is the resource handle, the
/// output is the program's value and the error is
/// [`Interrupted`](crate::Interrupted).
pub trait Effect: Sized + Send {
    /// The success type.
    type Output: Send;

    /// The error type.
    type Error: Send;

    /// The environment the effect runs against.
    ///
    /// `Clone` so that boxing can move an owned copy into the future.
    type Env: Clone + Send + Sync;

    /// Run the effect against `env`.
    fn run(self, env: &Self::Env)
        -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}
