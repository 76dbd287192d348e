//! Contract violations and the per-runtime diagnostics hook.
//!
//! The runtime checks its own contracts (preconditions on arguments, postconditions after a
//! commit, internal assertions) and reports every failure as a [`Violation`] to the
//! [`ViolationHandler`] installed on that runtime. The default handler logs the violation at
//! `error` level and then panics.
//!
//! Handlers that return normally let the runtime continue: the offending operation is skipped
//! (a rejected system is not registered, a missing component reads as `None`, and so on).
//!
//! ```rust,ignore
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! runtime.set_violation_handler(move |v: &Violation| sink.lock().unwrap().push(v.clone()));
//! ```

use std::{fmt, sync::Arc};

/// The category of a contract violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// An internal invariant did not hold.
    Assertion,
    /// A caller supplied arguments the operation does not accept.
    Precondition,
    /// An operation finished in a state it promises never to produce.
    Postcondition,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Assertion => write!(f, "assertion"),
            ViolationKind::Precondition => write!(f, "precondition"),
            ViolationKind::Postcondition => write!(f, "postcondition"),
        }
    }
}

/// A single contract violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    kind: ViolationKind,
    message: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Precondition, message)
    }

    pub fn postcondition(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Postcondition, message)
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Assertion, message)
    }

    #[inline]
    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violation: {}", self.kind, self.message)
    }
}

/// Receiver of contract violations.
pub trait ViolationHandler: Send + Sync {
    fn handle(&self, violation: &Violation);
}

impl<F> ViolationHandler for F
where
    F: Fn(&Violation) + Send + Sync,
{
    fn handle(&self, violation: &Violation) {
        self(violation)
    }
}

/// Logs the violation and panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicHandler;

impl ViolationHandler for PanicHandler {
    fn handle(&self, violation: &Violation) {
        log::error!("{violation}");
        panic!("{violation}");
    }
}

/// The diagnostics hook owned by one runtime.
#[derive(Clone)]
pub struct Diagnostics {
    handler: Arc<dyn ViolationHandler>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            handler: Arc::new(PanicHandler),
        }
    }
}

impl Diagnostics {
    /// Replace the handler.
    pub fn set_handler(&mut self, handler: impl ViolationHandler + 'static) {
        self.handler = Arc::new(handler);
    }

    /// Restore the default handler.
    pub fn reset_handler(&mut self) {
        self.handler = Arc::new(PanicHandler);
    }

    /// Report a violation to the handler.
    pub fn report(&self, violation: Violation) {
        self.handler.handle(&violation);
    }

    pub fn precondition(&self, message: impl Into<String>) {
        self.report(Violation::precondition(message));
    }

    pub fn postcondition(&self, message: impl Into<String>) {
        self.report(Violation::postcondition(message));
    }

    pub fn assertion(&self, message: impl Into<String>) {
        self.report(Violation::assertion(message));
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}
