//! Return-shape rules for exposed methods.
//!
//! | Rust return          | payload | error slot |
//! |----------------------|---------|------------|
//! | `()`                 | none    | none       |
//! | `Result<(), E>`      | none    | `Some(0)`  |
//! | `Result<T, E>`       | `T`     | `Some(1)`  |
//! | plain payload type   | itself  | none       |
//!
//! `E` is anything convertible into [`ServiceError`]. Plain payload types are
//! the common scalars and containers below. Any other `Serialize` value goes
//! through [`Json`]; `#[rpc_service]` adds that wrapper itself, closures
//! given to `ServiceDef` spell it out.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::Serialize;
use serde_json::Value;

use crate::error::ServiceError;

/// A value a method may return.
pub trait IntoOutcome {
    /// Position of the error slot in the logical return list, if any.
    fn error_position() -> Option<usize>;

    /// Convert into an optional JSON payload or a service error.
    fn into_outcome(self) -> Result<Option<Value>, ServiceError>;
}

impl IntoOutcome for () {
    fn error_position() -> Option<usize> {
        None
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        Ok(None)
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: Serialize + 'static,
    E: Into<ServiceError>,
{
    fn error_position() -> Option<usize> {
        if TypeId::of::<T>() == TypeId::of::<()>() {
            Some(0)
        } else {
            Some(1)
        }
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        let value = self.map_err(Into::into)?;
        Ok(Some(serde_json::to_value(value)?))
    }
}

/// Return an arbitrary `Serialize` value as an infallible payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoOutcome for Json<T> {
    fn error_position() -> Option<usize> {
        None
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        Ok(Some(serde_json::to_value(self.0)?))
    }
}

macro_rules! payload_outcome {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoOutcome for $ty {
                fn error_position() -> Option<usize> {
                    None
                }

                fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
                    Ok(Some(serde_json::to_value(self)?))
                }
            }
        )*
    };
}

payload_outcome!(
    Value,
    String,
    &'static str,
    char,
    bool,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
);

impl<T: Serialize> IntoOutcome for Vec<T> {
    fn error_position() -> Option<usize> {
        None
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        Ok(Some(serde_json::to_value(self)?))
    }
}

impl<T: Serialize> IntoOutcome for Option<T> {
    fn error_position() -> Option<usize> {
        None
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        Ok(Some(serde_json::to_value(self)?))
    }
}

impl<K: Serialize, V: Serialize, S: BuildHasher> IntoOutcome for HashMap<K, V, S> {
    fn error_position() -> Option<usize> {
        None
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        Ok(Some(serde_json::to_value(self)?))
    }
}

impl<K: Serialize, V: Serialize> IntoOutcome for BTreeMap<K, V> {
    fn error_position() -> Option<usize> {
        None
    }

    fn into_outcome(self) -> Result<Option<Value>, ServiceError> {
        Ok(Some(serde_json::to_value(self)?))
    }
}

/// Whether a serialized result counts as the empty value and is omitted.
///
/// `null`, `false`, numeric zero and `""` are empty. Arrays and objects are
/// always emitted, even when empty.
pub(crate) fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
