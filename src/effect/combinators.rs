//! Concrete types returned by the [`EffectExt`](super::EffectExt) combinators.
//!
//! Each combinator is a plain struct holding the inner effect and the
//! closure; nothing is boxed until [`boxed`](super::EffectExt::boxed).

use std::fmt;
use std::marker::PhantomData;

use crate::effect::trait_def::Effect;

macro_rules! opaque_debug {
    ($($name:ident),*) => {$(
        impl<Inner, F> fmt::Debug for $name<Inner, F> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    )*};
}

/// Transforms the success value of the inner effect.
pub struct Map<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

/// Runs the inner effect, then the effect built from its value.
///
/// Both run against the same environment; for compiled programs that is
/// the same handle.
pub struct AndThen<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

/// Runs a recovery effect when the inner effect fails.
pub struct OrElse<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: F,
}

opaque_debug!(Map, AndThen, OrElse);

impl<Inner, F, U> Effect for Map<Inner, F>
where
    Inner: Effect,
    F: FnOnce(Inner::Output) -> U + Send,
    U: Send,
{
    type Output = U;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<U, Self::Error> {
        self.inner.run(env).await.map(self.f)
    }
}

impl<Inner, F, Next> Effect for AndThen<Inner, F>
where
    Inner: Effect,
    Next: Effect<Error = Inner::Error, Env = Inner::Env>,
    F: FnOnce(Inner::Output) -> Next + Send,
{
    type Output = Next::Output;
    type Error = Inner::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        let value = self.inner.run(env).await?;
        (self.f)(value).run(env).await
    }
}

impl<Inner, F, Recovery> Effect for OrElse<Inner, F>
where
    Inner: Effect,
    Recovery: Effect<Output = Inner::Output, Env = Inner::Env>,
    F: FnOnce(Inner::Error) -> Recovery + Send,
{
    type Output = Inner::Output;
    type Error = Recovery::Error;
    type Env = Inner::Env;

    async fn run(self, env: &Self::Env) -> Result<Self::Output, Self::Error> {
        match self.inner.run(env).await {
            Ok(value) => Ok(value),
            Err(error) => (self.f)(error).run(env).await,
        }
    }
}

/// An effect that yields a value without touching its environment.
#[derive(Debug, Clone)]
pub struct Pure<T, E, Env> {
    value: T,
    _env: PhantomData<fn() -> (E, Env)>,
}

impl<T, E, Env> Effect for Pure<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    type Output = T;
    type Error = E;
    type Env = Env;

    async fn run(self, _env: &Env) -> Result<T, E> {
        Ok(self.value)
    }
}

/// An effect yielding `value`, for mixing constants with compiled programs.
pub fn pure<T, E, Env>(value: T) -> Pure<T, E, Env>
where
    T: Send,
    E: Send,
    Env: Clone + Send + Sync,
{
    Pure {
        value,
        _env: PhantomData,
    }
}
