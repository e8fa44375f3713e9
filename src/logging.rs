//! Injected logging handle.
//!
//! Components never log through a process-wide subscriber. Instead they hold a
//! [`Logger`] given to them at construction, which carries an optional
//! `tracing::Dispatch` and a component name. Events are emitted with the
//! regular `tracing` macros inside [`Logger::emit`], which scopes the dispatch
//! to the current call only.
//!
//! ```ignore
//! let logger = Logger::new(tracing::Dispatch::new(subscriber)).component("cache");
//! logger.emit(|| tracing::debug!(evicted = 12, "evicted cache entries"));
//! ```

use std::fmt;

use tracing::Dispatch;

/// Cloneable logging handle passed to components that report events.
#[derive(Clone, Default)]
pub struct Logger {
    dispatch: Option<Dispatch>,
    component: &'static str,
}

impl Logger {
    /// Handle routing events to `dispatch`.
    #[must_use]
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch: Some(dispatch),
            component: "fuzzydedup",
        }
    }

    /// Handle that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Child handle sharing the dispatch under a different component name.
    #[must_use]
    pub fn component(&self, name: &'static str) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            component: name,
        }
    }

    #[must_use]
    pub fn component_name(&self) -> &'static str {
        self.component
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Run `event` with this handle's dispatch as the scoped default.
    ///
    /// The closure is not called at all for a disabled handle, so field
    /// expressions inside it cost nothing when logging is off.
    pub fn emit<F: FnOnce()>(&self, event: F) {
        if let Some(dispatch) = &self.dispatch {
            tracing::dispatcher::with_default(dispatch, || {
                tracing::debug_span!("component", name = self.component).in_scope(event)
            });
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
