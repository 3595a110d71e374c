//! Shared handle to an edit session for UI callbacks.
//!
//! Callbacks hold clones of [`SharedSession`]. A listener that feeds another
//! event back while one is still being handled is ignored instead of
//! panicking on a double borrow.

use std::cell::RefCell;
use std::rc::Rc;

use crate::geometry::Point;

use super::session::{EditSession, TouchOutcome};

type Listener = Box<dyn Fn(&EditSession, &TouchOutcome)>;

/// Reference-counted edit session with change listeners.
#[derive(Clone)]
pub struct SharedSession {
    inner: Rc<RefCell<EditSession>>,
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl SharedSession {
    pub fn new(session: EditSession) -> Self {
        Self {
            inner: Rc::new(RefCell::new(session)),
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register a listener called after every touch that changed something.
    /// Returns false if called from inside a listener.
    pub fn add_listener(&self, listener: impl Fn(&EditSession, &TouchOutcome) + 'static) -> bool {
        match self.listeners.try_borrow_mut() {
            Ok(mut listeners) => {
                listeners.push(Box::new(listener));
                true
            }
            Err(_) => {
                log::warn!("Cannot add a session listener while listeners are running");
                false
            }
        }
    }

    pub fn touch_began(&self, location: Point) -> TouchOutcome {
        self.dispatch("touch_began", |s| s.touch_began(location))
    }

    pub fn touch_moved(&self, location: Point) -> TouchOutcome {
        self.dispatch("touch_moved", |s| s.touch_moved(location))
    }

    pub fn touch_ended(&self, location: Point) -> TouchOutcome {
        self.dispatch("touch_ended", |s| s.touch_ended(location))
    }

    /// Read the session. `None` while it is being mutated.
    pub fn with<R>(&self, f: impl FnOnce(&EditSession) -> R) -> Option<R> {
        self.inner.try_borrow().ok().map(|session| f(&session))
    }

    /// Mutate the session outside of touch handling (menu actions, info
    /// edits). `None` when the session is busy.
    pub fn update<R>(&self, f: impl FnOnce(&mut EditSession) -> R) -> Option<R> {
        match self.inner.try_borrow_mut() {
            Ok(mut session) => Some(f(&mut session)),
            Err(_) => {
                log::debug!("Session busy, update skipped");
                None
            }
        }
    }

    fn dispatch(
        &self,
        event: &str,
        f: impl FnOnce(&mut EditSession) -> TouchOutcome,
    ) -> TouchOutcome {
        let outcome = match self.inner.try_borrow_mut() {
            Ok(mut session) => f(&mut session),
            Err(_) => {
                log::debug!("Ignoring re-entrant {}", event);
                return TouchOutcome::Ignored;
            }
        };

        if outcome != TouchOutcome::Ignored {
            self.notify(&outcome);
        }
        outcome
    }

    fn notify(&self, outcome: &TouchOutcome) {
        let (Ok(session), Ok(listeners)) = (self.inner.try_borrow(), self.listeners.try_borrow())
        else {
            return;
        };
        for listener in listeners.iter() {
            listener(&session, outcome);
        }
    }
}
