//! Positional argument binding.
//!
//! The `params` member of a request is a JSON array. Element `i` is bound to
//! the method's `i`-th declared data argument. Binding is strict:
//!
//! - more elements than declared arguments is an error;
//! - a missing trailing element is bound from `null`, so it only succeeds
//!   for arguments that accept null (`Option<T>`, `()`);
//! - an element that does not deserialize into its declared type is an error.
//!
//! Every failure maps to the Invalid params code. The method is never invoked
//! when binding fails.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::RpcError;

/// Why positional binding failed.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("non-array params")]
    NotAnArray,
    #[error("too many arguments, want at most {expected}")]
    TooMany { expected: usize, got: usize },
    #[error("missing value for required argument {index}")]
    Missing { index: usize, type_name: &'static str },
    #[error("invalid argument {index}: {source}")]
    Invalid {
        index: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<BindError> for RpcError {
    fn from(err: BindError) -> Self {
        RpcError::invalid_params(err.to_string())
    }
}

/// Raw JSON parameters, checked against a method's arity and consumed in order.
#[derive(Debug)]
pub struct PositionalArgs {
    values: std::vec::IntoIter<Value>,
    supplied: usize,
    index: usize,
}

impl PositionalArgs {
    /// Check `params` against an arity of `expected` arguments.
    ///
    /// `None` and `null` both mean "no arguments".
    pub fn bind(params: Option<Value>, expected: usize) -> Result<Self, BindError> {
        let values = match params {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(values)) => values,
            Some(_) => return Err(BindError::NotAnArray),
        };
        if values.len() > expected {
            return Err(BindError::TooMany {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            supplied: values.len(),
            values: values.into_iter(),
            index: 0,
        })
    }

    /// Number of elements the client actually sent.
    pub fn supplied(&self) -> usize {
        self.supplied
    }

    /// Deserialize the next positional argument.
    pub fn next<T: DeserializeOwned>(&mut self) -> Result<T, BindError> {
        let index = self.index;
        self.index += 1;
        let type_name = std::any::type_name::<T>();

        match self.values.next() {
            Some(value) => serde_json::from_value(value).map_err(|source| BindError::Invalid {
                index,
                type_name,
                source,
            }),
            None => {
                serde_json::from_value(Value::Null).map_err(|_| BindError::Missing { index, type_name })
            }
        }
    }
}
