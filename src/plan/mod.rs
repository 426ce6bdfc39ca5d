//! Method signature analysis.
//!
//! A [`CallablePlan`] is the compiled invocation metadata for one exposed
//! method:
//!
//! - its ordered argument types;
//! - whether it takes a leading [`RequestContext`];
//! - where its error slot sits;
//! - a type-erased invoker that binds positional params and calls it.
//!
//! Plans are built once, at registration, and never change afterwards.
//!
//! Any `Fn(A0, .., An) -> R` or `Fn(&RequestContext, A0, .., An) -> R` with
//! up to eight `DeserializeOwned` data arguments and an [`IntoOutcome`] return
//! is a [`Handler`].
//!
//! ## Example
//!
//! ```ignore
//! let plan = CallablePlan::analyze("add", |a: i64, b: i64| a + b);
//! assert_eq!(plan.arg_types().len(), 2);
//! assert!(!plan.has_context());
//! assert_eq!(plan.error_position(), None);
//! ```

mod outcome;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::binder::PositionalArgs;
use crate::context::RequestContext;
use crate::error::RpcError;

pub use outcome::{IntoOutcome, Json};
pub(crate) use outcome::is_empty_result;

/// Marker for handlers whose first parameter is `&RequestContext`.
#[derive(Debug)]
pub enum WithContext {}

/// Marker for handlers that take data arguments only.
#[derive(Debug)]
pub enum Plain {}

/// A callable that can back an exposed method.
///
/// `M` is a marker that keeps the context-taking and plain impls apart. It is
/// inferred and never named by callers.
pub trait Handler<M>: Send + Sync + 'static {
    /// The method's declared return type.
    type Output: IntoOutcome;

    /// Whether the first parameter is the request context.
    const HAS_CONTEXT: bool;

    /// Type names of the data arguments, in order.
    fn arg_types() -> Vec<&'static str>;

    /// Bind positional arguments and call through.
    fn call(&self, ctx: &RequestContext, args: &mut PositionalArgs) -> Result<Self::Output, RpcError>;
}

macro_rules! impl_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, R, $($ty,)*> Handler<(Plain, ($($ty,)*))> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($ty: DeserializeOwned + 'static,)*
        {
            type Output = R;
            const HAS_CONTEXT: bool = false;

            fn arg_types() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$ty>()),*]
            }

            fn call(&self, _ctx: &RequestContext, args: &mut PositionalArgs) -> Result<R, RpcError> {
                $(let $ty = args.next::<$ty>()?;)*
                Ok((self)($($ty),*))
            }
        }

        #[allow(non_snake_case, unused_variables)]
        impl<F, R, $($ty,)*> Handler<(WithContext, ($($ty,)*))> for F
        where
            F: Fn(&RequestContext, $($ty),*) -> R + Send + Sync + 'static,
            R: IntoOutcome,
            $($ty: DeserializeOwned + 'static,)*
        {
            type Output = R;
            const HAS_CONTEXT: bool = true;

            fn arg_types() -> Vec<&'static str> {
                vec![$(std::any::type_name::<$ty>()),*]
            }

            fn call(&self, ctx: &RequestContext, args: &mut PositionalArgs) -> Result<R, RpcError> {
                $(let $ty = args.next::<$ty>()?;)*
                Ok((self)(ctx, $($ty),*))
            }
        }
    };
}

impl_handler!();
impl_handler!(A0);
impl_handler!(A0, A1);
impl_handler!(A0, A1, A2);
impl_handler!(A0, A1, A2, A3);
impl_handler!(A0, A1, A2, A3, A4);
impl_handler!(A0, A1, A2, A3, A4, A5);
impl_handler!(A0, A1, A2, A3, A4, A5, A6);
impl_handler!(A0, A1, A2, A3, A4, A5, A6, A7);

type Invoker = dyn Fn(&RequestContext, Option<Value>) -> Result<Option<Value>, RpcError> + Send + Sync;

/// Compiled invocation metadata for one exposed method.
#[derive(Clone)]
pub struct CallablePlan {
    method_name: String,
    arg_types: Vec<&'static str>,
    has_context: bool,
    error_position: Option<usize>,
    invoke: Arc<Invoker>,
}

impl CallablePlan {
    /// Analyze `handler` and build its plan.
    ///
    /// `method_name` is the name as declared. The registry applies the
    /// naming convention on top of it.
    pub fn analyze<H, M>(method_name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<M>,
    {
        let arg_types = H::arg_types();
        let arity = arg_types.len();
        let invoke = move |ctx: &RequestContext, params: Option<Value>| {
            let mut args = PositionalArgs::bind(params, arity)?;
            let output = handler.call(ctx, &mut args)?;
            output.into_outcome().map_err(|e| e.into_rpc_error())
        };
        Self {
            method_name: method_name.into(),
            arg_types,
            has_context: H::HAS_CONTEXT,
            error_position: <H::Output as IntoOutcome>::error_position(),
            invoke: Arc::new(invoke),
        }
    }

    /// The method name as declared.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Type names of the data arguments, excluding the context.
    pub fn arg_types(&self) -> &[&'static str] {
        &self.arg_types
    }

    pub fn has_context(&self) -> bool {
        self.has_context
    }

    /// Position of the error slot in the logical return list.
    ///
    /// `None` when the method cannot fail, `Some(0)` for error-only methods,
    /// `Some(1)` for methods returning a payload and an error.
    pub fn error_position(&self) -> Option<usize> {
        self.error_position
    }

    /// Bind `params` and invoke.
    ///
    /// Binding failures map to Invalid params and are raised before the
    /// underlying method runs. Errors the method returns are mapped through
    /// the service error taxonomy.
    pub fn call(&self, ctx: &RequestContext, params: Option<Value>) -> Result<Option<Value>, RpcError> {
        (self.invoke)(ctx, params)
    }
}

impl fmt::Debug for CallablePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallablePlan")
            .field("method_name", &self.method_name)
            .field("arg_types", &self.arg_types)
            .field("has_context", &self.has_context)
            .field("error_position", &self.error_position)
            .finish_non_exhaustive()
    }
}
