//! Cross-algebra embedding.
//!
//! An [`Embedded`] pairs a handle with a program of the same algebra. The
//! pairing is fixed by the variant, so a program can never be run against
//! a handle of another algebra, and dispatch is an exhaustive match.

use std::fmt;

use crate::algebra::connection::PgConnectionHandle;
use crate::algebra::copy_in::CopyInHandle;
use crate::algebra::copy_manager::CopyManagerHandle;
use crate::algebra::copy_out::CopyOutHandle;
use crate::algebra::fastpath::FastpathHandle;
use crate::algebra::large_object::LargeObjectHandle;
use crate::algebra::large_object_manager::LargeObjectManagerHandle;
use crate::algebra::{
    Algebra, CopyInAlgebra, CopyManagerAlgebra, CopyOutAlgebra, FastpathAlgebra,
    LargeObjectAlgebra, LargeObjectManagerAlgebra, PgConnectionAlgebra,
};
use crate::effect::BoxFuture;
use crate::interpreter::Interpreter;
use crate::kernel::{Fold, Kernel, Step};
use crate::program::Erased;
use crate::runtime::{Fiber, Runtime};

/// A program of some algebra, bound to its own handle.
///
/// Built by [`Program::embed`](crate::Program::embed).
#[derive(Clone)]
pub enum Embedded {
    /// A connection program and its connection.
    PgConnection(PgConnectionHandle, Erased<PgConnectionAlgebra>),
    /// A copy-in program and its stream.
    CopyIn(CopyInHandle, Erased<CopyInAlgebra>),
    /// A copy-out program and its stream.
    CopyOut(CopyOutHandle, Erased<CopyOutAlgebra>),
    /// A copy manager program and its manager.
    CopyManager(CopyManagerHandle, Erased<CopyManagerAlgebra>),
    /// A fast-path program and its channel.
    Fastpath(FastpathHandle, Erased<FastpathAlgebra>),
    /// A large-object program and its object.
    LargeObject(LargeObjectHandle, Erased<LargeObjectAlgebra>),
    /// A large-object directory program and its manager.
    LargeObjectManager(LargeObjectManagerHandle, Erased<LargeObjectManagerAlgebra>),
}

impl Embedded {
    /// Name of the algebra of the enclosed program.
    pub fn algebra(&self) -> &'static str {
        match self {
            Embedded::PgConnection(..) => PgConnectionAlgebra::NAME,
            Embedded::CopyIn(..) => CopyInAlgebra::NAME,
            Embedded::CopyOut(..) => CopyOutAlgebra::NAME,
            Embedded::CopyManager(..) => CopyManagerAlgebra::NAME,
            Embedded::Fastpath(..) => FastpathAlgebra::NAME,
            Embedded::LargeObject(..) => LargeObjectAlgebra::NAME,
            Embedded::LargeObjectManager(..) => LargeObjectManagerAlgebra::NAME,
        }
    }
}

impl fmt::Debug for Embedded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedded")
            .field("algebra", &self.algebra())
            .field("handle", &"<handle>")
            .finish()
    }
}

impl<R: Runtime> Kernel<R> {
    /// Run an embedded program through the interpreter of its own algebra.
    pub(crate) fn dispatch<'a>(
        &'a self,
        embedded: &'a Embedded,
        fiber: &'a Fiber,
    ) -> BoxFuture<'a, Step> {
        match embedded {
            Embedded::PgConnection(handle, program) => self.run_embedded(handle, program, fiber),
            Embedded::CopyIn(handle, program) => self.run_embedded(handle, program, fiber),
            Embedded::CopyOut(handle, program) => self.run_embedded(handle, program, fiber),
            Embedded::CopyManager(handle, program) => self.run_embedded(handle, program, fiber),
            Embedded::Fastpath(handle, program) => self.run_embedded(handle, program, fiber),
            Embedded::LargeObject(handle, program) => self.run_embedded(handle, program, fiber),
            Embedded::LargeObjectManager(handle, program) => {
                self.run_embedded(handle, program, fiber)
            }
        }
    }

    fn run_embedded<'a, Alg: Algebra>(
        &'a self,
        handle: &'a Alg::Handle,
        program: &'a Erased<Alg>,
        fiber: &'a Fiber,
    ) -> BoxFuture<'a, Step> {
        let interpreter = Interpreter::<Alg, R>::from_kernel(self.clone());
        let run = async move { interpreter.fold(&program.node, handle, fiber).await };

        #[cfg(feature = "tracing")]
        let run = tracing::Instrument::instrument(
            run,
            tracing::debug_span!("embedded", algebra = Alg::NAME),
        );

        Box::pin(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::large_object;
    use crate::testing::{Journal, MockLargeObject};
    use std::sync::Arc;

    #[test]
    fn test_embedded_reports_its_algebra() {
        let object: LargeObjectHandle = Arc::new(MockLargeObject::new(Journal::new(), 7));
        let embedded = LargeObjectAlgebra::embed(object, large_object::tell().erase());
        assert_eq!(embedded.algebra(), "large_object");
        assert!(format!("{:?}", embedded).contains("large_object"));
    }
}
