//! Panic containment around middleware and method invocation.
//!
//! [`guard`] runs a closure inside `catch_unwind`. A panic becomes a
//! [`Crashed`] value carrying the panic message and the backtrace captured at
//! the panic site.
//!
//! The backtrace is recorded by a process-wide panic hook, installed once,
//! that chains to the previously installed hook. It only records for threads
//! that are currently inside a guard. Panics elsewhere in the host are handed
//! to the previous hook untouched.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static GUARDED: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// A panic recovered by [`guard`].
#[derive(Debug)]
pub struct Crashed {
    /// Panic payload rendered as text.
    pub message: String,
    /// Backtrace captured where the panic was raised.
    pub backtrace: String,
}

/// Run `f`, converting a panic into [`Crashed`].
pub fn guard<T>(f: impl FnOnce() -> T) -> Result<T, Crashed> {
    install_hook();

    GUARDED.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    GUARDED.with(|depth| depth.set(depth.get().saturating_sub(1)));

    result.map_err(|payload| {
        let backtrace = CAPTURED
            .with(|slot| slot.borrow_mut().take())
            .map(|bt| bt.to_string())
            .unwrap_or_default();
        Crashed {
            message: panic_message(payload.as_ref()),
            backtrace,
        }
    })
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let guarded = GUARDED.with(|depth| depth.get() > 0);
            if guarded {
                let backtrace = Backtrace::force_capture();
                CAPTURED.with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
