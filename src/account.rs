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

//! Account monitor.
//!
//! Each [`Account`] owns one balance behind a mutex and two condition
//! variables, one per [`Priority`] class. Deposits never block. Withdrawals
//! block while the balance cannot cover them, and an ordinary withdrawal also
//! blocks while any preferred withdrawal is outstanding on the same account.
//!
//! Every wake re-evaluates the full predicate; a notification is only a hint.
//!
//! # Example
//!
//! ```
//! use ledger_monitor_rs::{Account, AccountId, Priority};
//!
//! let account = Account::new(AccountId(0), 100).unwrap();
//! assert_eq!(account.deposit(50).unwrap(), 150);
//! assert_eq!(account.withdraw(120, Priority::Preferred).unwrap(), 30);
//! ```

use crate::LedgerError;
use crate::base::{AccountId, Priority};
use crate::cancel::{CancelToken, Registration};
use parking_lot::{Condvar, Mutex};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

#[derive(Debug)]
struct AccountData {
    balance: i64,
    /// Preferred withdrawals registered and not yet finished.
    preferred_waiters: usize,
    /// Ordinary withdrawals currently blocked.
    ordinary_waiters: usize,
}

impl AccountData {
    fn new(balance: i64) -> Self {
        Self {
            balance,
            preferred_waiters: 0,
            ordinary_waiters: 0,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= 0,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    /// Withdrawal predicate: `true` while the request has to keep waiting.
    fn must_wait(&self, amount: i64, priority: Priority) -> bool {
        self.balance < amount || (!priority.is_preferred() && self.preferred_waiters > 0)
    }

    /// Increases balance.
    fn credit(&mut self, amount: i64) -> Result<i64, LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.assert_invariants();
        Ok(self.balance)
    }

    /// Decreases balance. Callers must have checked the predicate.
    fn debit(&mut self, amount: i64) -> i64 {
        self.balance -= amount;
        self.assert_invariants();
        self.balance
    }
}

#[derive(Debug)]
struct Monitor {
    data: Mutex<AccountData>,
    ordinary: Condvar,
    preferred: Condvar,
}

impl Monitor {
    fn condition(&self, priority: Priority) -> &Condvar {
        match priority {
            Priority::Ordinary => &self.ordinary,
            Priority::Preferred => &self.preferred,
        }
    }

    /// Wakes both classes so blocked withdrawals re-check their abort signal.
    fn wake_all(&self) {
        let _data = self.data.lock();
        self.preferred.notify_all();
        self.ordinary.notify_all();
    }
}

/// How a blocked withdrawal may be aborted.
#[derive(Debug, Clone, Copy)]
enum Abort<'a> {
    Never,
    Token(&'a CancelToken),
    Deadline(Instant),
}

/// Monitor-guarded account balance.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    monitor: Arc<Monitor>,
}

impl Account {
    /// Creates an account holding `initial_balance`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if the initial balance is negative.
    pub fn new(id: AccountId, initial_balance: i64) -> Result<Self, LedgerError> {
        if initial_balance < 0 {
            return Err(LedgerError::InvalidAmount);
        }
        Ok(Self {
            id,
            monitor: Arc::new(Monitor {
                data: Mutex::new(AccountData::new(initial_balance)),
                ordinary: Condvar::new(),
                preferred: Condvar::new(),
            }),
        })
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> i64 {
        self.monitor.data.lock().balance
    }

    /// Preferred withdrawals that are registered and not yet finished.
    pub fn preferred_waiters(&self) -> usize {
        self.monitor.data.lock().preferred_waiters
    }

    /// Ordinary withdrawals that are currently blocked.
    pub fn ordinary_waiters(&self) -> usize {
        self.monitor.data.lock().ordinary_waiters
    }

    /// Adds `amount` and returns the new balance.
    ///
    /// Wakes the preferred class if any preferred withdrawal is outstanding,
    /// otherwise the ordinary class.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
    /// - [`LedgerError::Overflow`] - the balance would overflow.
    pub fn deposit(&self, amount: i64) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut data = self.monitor.data.lock();
        let balance = data.credit(amount)?;
        if data.preferred_waiters > 0 {
            self.monitor.preferred.notify_all();
        } else {
            self.monitor.ordinary.notify_all();
        }

        debug!(account = %self.id, amount, balance, "deposited");
        Ok(balance)
    }

    /// Removes `amount`, blocking until the account can cover it and, for
    /// ordinary withdrawals, until no preferred withdrawal is outstanding.
    ///
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if `amount` is not positive.
    pub fn withdraw(&self, amount: i64, priority: Priority) -> Result<i64, LedgerError> {
        self.withdraw_with(amount, priority, Abort::Never)
    }

    /// Ordinary-priority [`withdraw`](Self::withdraw).
    pub fn withdraw_ordinary(&self, amount: i64) -> Result<i64, LedgerError> {
        self.withdraw(amount, Priority::Ordinary)
    }

    /// Like [`withdraw`](Self::withdraw), but gives up with
    /// [`LedgerError::Cancelled`] if `token` fires while the withdrawal is
    /// blocked. A withdrawal that can proceed immediately does so even if
    /// the token has already fired.
    pub fn withdraw_cancellable(
        &self,
        amount: i64,
        priority: Priority,
        token: &CancelToken,
    ) -> Result<i64, LedgerError> {
        self.withdraw_with(amount, priority, Abort::Token(token))
    }

    /// Like [`withdraw`](Self::withdraw), but gives up with
    /// [`LedgerError::TimedOut`] if the withdrawal is still blocked after
    /// `timeout`. A zero timeout makes a single non-blocking attempt.
    pub fn withdraw_timeout(
        &self,
        amount: i64,
        priority: Priority,
        timeout: Duration,
    ) -> Result<i64, LedgerError> {
        let abort = match Instant::now().checked_add(timeout) {
            Some(deadline) => Abort::Deadline(deadline),
            None => Abort::Never,
        };
        self.withdraw_with(amount, priority, abort)
    }

    fn withdraw_with(
        &self,
        amount: i64,
        priority: Priority,
        abort: Abort<'_>,
    ) -> Result<i64, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let mut data = self.monitor.data.lock();
        debug!(account = %self.id, amount, %priority, "withdraw requested");

        // Registered before any blocking so arriving ordinary withdrawals
        // see the request immediately.
        if priority.is_preferred() {
            data.preferred_waiters += 1;
        }

        let mut registration: Option<Registration<'_>> = None;
        let mut counted = false;
        let outcome = loop {
            if !data.must_wait(amount, priority) {
                break Ok(());
            }

            match abort {
                Abort::Never => {}
                Abort::Token(token) => {
                    if registration.is_none() {
                        let monitor = Arc::downgrade(&self.monitor);
                        registration = Some(token.register(Box::new(move || {
                            if let Some(monitor) = monitor.upgrade() {
                                monitor.wake_all();
                            }
                        })));
                    }
                    if token.is_cancelled() {
                        break Err(LedgerError::Cancelled);
                    }
                }
                Abort::Deadline(deadline) => {
                    if Instant::now() >= deadline {
                        break Err(LedgerError::TimedOut);
                    }
                }
            }

            if !counted && !priority.is_preferred() {
                data.ordinary_waiters += 1;
                counted = true;
            }

            trace!(account = %self.id, amount, %priority, balance = data.balance, "withdraw parked");
            let condition = self.monitor.condition(priority);
            match abort {
                Abort::Deadline(deadline) => {
                    let _ = condition.wait_until(&mut data, deadline);
                }
                Abort::Never | Abort::Token(_) => condition.wait(&mut data),
            }
        };

        if counted {
            data.ordinary_waiters -= 1;
        }

        if let Err(error) = outcome {
            if priority.is_preferred() {
                data.preferred_waiters -= 1;
                if data.preferred_waiters == 0 {
                    self.monitor.ordinary.notify_all();
                }
            }
            warn!(account = %self.id, amount, %priority, %error, "withdraw aborted");
            return Err(error);
        }

        let balance = data.debit(amount);
        if priority.is_preferred() {
            data.preferred_waiters -= 1;
        }
        if data.preferred_waiters == 0 {
            self.monitor.ordinary.notify_all();
        }

        debug!(account = %self.id, amount, %priority, balance, "withdrawn");
        Ok(balance)
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let balance = self.balance();
        let mut state = serializer.serialize_struct("Account", 2)?;
        state.serialize_field("account", &self.id)?;
        state.serialize_field("balance", &balance)?;
        state.end()
    }
}
