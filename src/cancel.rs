// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Cancellation of blocked withdrawals.
//!
//! A [`CancelToken`] is handed to [`Account::withdraw_cancellable`] and can be
//! fired from any other thread. Each blocked withdrawal registers a waker with
//! the token; firing the token wakes those monitors so the waiters observe the
//! cancellation on their next predicate check.
//!
//! Lock order is always account lock, then token lock. Wakers are drained
//! under the token lock and invoked only after it is released.
//!
//! [`Account::withdraw_cancellable`]: crate::Account::withdraw_cancellable

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

type Waker = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Wakers {
    next_key: u64,
    entries: HashMap<u64, Waker>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    wakers: Mutex<Wakers>,
}

/// Shared cancellation signal.
///
/// Clones observe and fire the same signal. Cancelling is idempotent and
/// cannot be undone.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the token and wakes every withdrawal currently blocked on it.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        let wakers: Vec<Waker> = {
            let mut wakers = self.inner.wakers.lock();
            wakers.entries.drain().map(|(_, waker)| waker).collect()
        };

        for wake in wakers {
            wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Registers a waker until the returned guard is dropped.
    ///
    /// Callers must check [`is_cancelled`](Self::is_cancelled) after
    /// registering, otherwise a cancel racing with the registration is lost.
    pub(crate) fn register(&self, waker: Waker) -> Registration<'_> {
        let mut wakers = self.inner.wakers.lock();
        let key = wakers.next_key;
        wakers.next_key += 1;
        wakers.entries.insert(key, waker);
        Registration { token: self, key }
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.inner.wakers.lock().entries.len()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Removes a registered waker on drop.
pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    key: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.token.inner.wakers.lock().entries.remove(&self.key);
    }
}
