// src/core/session/gate.rs

//! A single-fire gate: closed at creation, opened at most once, and once open
//! it releases every current and future waiter.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// The gate keeps two views of the same flag: a mutex/condvar pair for threads
/// that block, and a `watch` channel for async waiters. Both are updated while
/// the mutex is held, so they can never disagree.
#[derive(Debug)]
pub struct Gate {
    opened: Mutex<bool>,
    cond: Condvar,
    notify: watch::Sender<bool>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self {
            opened: Mutex::new(false),
            cond: Condvar::new(),
            notify,
        }
    }

    /// Opens the gate. Returns `true` only for the call that actually opened it;
    /// every later call is a no-op.
    pub fn open(&self) -> bool {
        let mut opened = self.opened.lock();
        if *opened {
            return false;
        }
        *opened = true;
        self.notify.send_replace(true);
        self.cond.notify_all();
        true
    }

    pub fn is_open(&self) -> bool {
        *self.opened.lock()
    }

    /// Blocks the calling thread until the gate opens or `timeout` elapses.
    /// Returns whether the gate was open when the wait ended.
    ///
    /// Must not be called from inside an async runtime worker; use [`Gate::wait`] there.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut opened = self.opened.lock();
        while !*opened {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut opened, deadline).timed_out() {
                        return *opened;
                    }
                }
                // The deadline overflowed `Instant`; treat it as "wait forever".
                None => self.cond.wait(&mut opened),
            }
        }
        true
    }

    /// Waits asynchronously until the gate opens or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.notify.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(|opened| *opened)).await {
            Ok(result) => result.is_ok(),
            Err(_) => self.is_open(),
        }
    }
}
