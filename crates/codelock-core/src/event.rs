//! Synchronous publish/subscribe channel.
//!
//! An [`EventBus`] holds an ordered list of handlers. Publishing calls each
//! handler in subscription order on the calling thread. A failing handler
//! does not stop dispatch: every handler runs, and the failures are returned
//! together as [`Error::HandlerFailures`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use codelock_core::EventBus;
//!
//! let bus: EventBus<u32> = EventBus::new();
//! let total = Arc::new(AtomicUsize::new(0));
//!
//! let sink = total.clone();
//! bus.subscribe(move |value| {
//!     sink.fetch_add(*value as usize, Ordering::SeqCst);
//!     Ok(())
//! });
//!
//! bus.publish(&5).unwrap();
//! bus.publish(&7).unwrap();
//! assert_eq!(total.load(Ordering::SeqCst), 12);
//! ```

use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, HandlerError, Result};

type Handler<T> = Box<dyn Fn(&T) -> std::result::Result<(), HandlerError> + Send + Sync>;

/// Ordered list of handlers invoked synchronously on publish.
///
/// Handlers must not subscribe to the bus they are being called from.
pub struct EventBus<T> {
    handlers: RwLock<Vec<Handler<T>>>,
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler. Handlers are never removed.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&T) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(handler));
    }

    /// Invoke every handler with `payload`, in subscription order.
    ///
    /// # Errors
    /// Returns `Error::HandlerFailures` holding every handler failure, after
    /// all handlers have run.
    pub fn publish(&self, payload: &T) -> Result<()> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);

        let failures: Vec<HandlerError> = handlers
            .iter()
            .filter_map(|handler| handler(payload).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::HandlerFailures(failures))
        }
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_publish_without_handlers() {
        let bus: EventBus<&str> = EventBus::new();
        assert!(bus.publish(&"nobody listens").is_ok());
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus: EventBus<char> = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let calls = calls.clone();
            bus.subscribe(move |c| {
                calls.lock().unwrap().push((id, *c));
                Ok(())
            });
        }

        bus.publish(&'7').unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![(0, '7'), (1, '7'), (2, '7')]);
    }

    #[test]
    fn test_failures_are_aggregated_and_do_not_stop_dispatch() {
        let bus: EventBus<u8> = EventBus::new();
        let reached = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(|_| Err("first handler broke".into()));
        {
            let reached = reached.clone();
            bus.subscribe(move |_| {
                reached.lock().unwrap().push("second");
                Ok(())
            });
        }
        bus.subscribe(|_| Err("third handler broke".into()));
        {
            let reached = reached.clone();
            bus.subscribe(move |_| {
                reached.lock().unwrap().push("fourth");
                Ok(())
            });
        }

        let result = bus.publish(&1);

        assert_eq!(*reached.lock().unwrap(), vec!["second", "fourth"]);
        match result {
            Err(Error::HandlerFailures(failures)) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].to_string(), "first handler broke");
                assert_eq!(failures[1].to_string(), "third handler broke");
            }
            other => panic!("expected aggregated failures, got {other:?}"),
        }
    }
}
