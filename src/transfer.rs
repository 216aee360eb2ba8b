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

//! Transfer coordinator.
//!
//! A transfer is a withdrawal on the source followed, only if it succeeds, by
//! a deposit on the destination. The two steps enter and leave each account's
//! monitor independently; no code path ever holds two account locks at once,
//! so transfers in opposite directions over the same pair cannot deadlock.
//!
//! A transfer is not atomic across the two accounts. Between the withdrawal
//! and the deposit the amount belongs to neither.

use crate::LedgerError;
use crate::account::Account;
use crate::base::{AccountId, Priority};
use crate::cancel::CancelToken;
use crate::ledger::Ledger;
use std::ptr;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Balances observed by a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub amount: i64,
    pub source: AccountId,
    pub destination: AccountId,
    /// Source balance right after the withdrawal.
    pub source_balance: i64,
    /// Destination balance right after the deposit.
    pub destination_balance: i64,
}

/// Moves `amount` from `source` to `destination` with an ordinary withdrawal.
///
/// Blocks while `source` cannot cover the amount.
///
/// # Errors
///
/// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
/// - [`LedgerError::SameAccount`] - `source` and `destination` are the same account.
/// - [`LedgerError::Overflow`] - the destination balance would overflow; the
///   amount is returned to the source.
/// - [`LedgerError::RefundFailed`] - the destination deposit failed and the
///   source could not take the amount back; the amount is held by neither.
pub fn transfer(
    amount: i64,
    source: &Account,
    destination: &Account,
) -> Result<TransferReceipt, LedgerError> {
    transfer_with(amount, source, destination, Priority::Ordinary)
}

/// [`transfer`] with an explicit withdrawal priority.
pub fn transfer_with(
    amount: i64,
    source: &Account,
    destination: &Account,
    priority: Priority,
) -> Result<TransferReceipt, LedgerError> {
    execute(amount, source, destination, |account| {
        account.withdraw(amount, priority)
    })
}

fn execute<W>(
    amount: i64,
    source: &Account,
    destination: &Account,
    withdraw: W,
) -> Result<TransferReceipt, LedgerError>
where
    W: FnOnce(&Account) -> Result<i64, LedgerError>,
{
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount);
    }
    if ptr::eq(source, destination) {
        return Err(LedgerError::SameAccount);
    }

    let source_balance = withdraw(source).inspect_err(|error| {
        warn!(source = %source.id(), destination = %destination.id(), amount, %error, "transfer failed");
    })?;

    let destination_balance = match destination.deposit(amount) {
        Ok(balance) => balance,
        Err(error) => {
            if let Err(refund_error) = source.deposit(amount) {
                error!(source = %source.id(), amount, %refund_error, "transfer refund failed");
                return Err(LedgerError::RefundFailed {
                    amount,
                    source_account: source.id(),
                });
            }
            warn!(source = %source.id(), destination = %destination.id(), amount, %error, "transfer reverted");
            return Err(error);
        }
    };

    debug!(source = %source.id(), destination = %destination.id(), amount, "transfer completed");
    Ok(TransferReceipt {
        amount,
        source: source.id(),
        destination: destination.id(),
        source_balance,
        destination_balance,
    })
}

/// Runs transfers between accounts of one [`Ledger`], addressed by ID.
///
/// # Example
///
/// ```
/// use ledger_monitor_rs::{AccountId, Ledger, TransferCoordinator};
///
/// let ledger = Ledger::new([100, 0]).unwrap();
/// let coordinator = TransferCoordinator::new(&ledger);
///
/// let receipt = coordinator.transfer(40, AccountId(0), AccountId(1)).unwrap();
/// assert_eq!(receipt.source_balance, 60);
/// assert_eq!(receipt.destination_balance, 40);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TransferCoordinator<'l> {
    ledger: &'l Ledger,
    priority: Priority,
}

impl<'l> TransferCoordinator<'l> {
    /// Creates a coordinator whose withdrawals are ordinary.
    pub fn new(ledger: &'l Ledger) -> Self {
        Self::with_priority(ledger, Priority::Ordinary)
    }

    pub fn with_priority(ledger: &'l Ledger, priority: Priority) -> Self {
        Self { ledger, priority }
    }

    pub fn ledger(&self) -> &'l Ledger {
        self.ledger
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Moves `amount` from `from` to `to`, blocking while `from` cannot cover it.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `amount` is not positive.
    /// - [`LedgerError::UnknownAccount`] - either ID is outside the ledger.
    /// - [`LedgerError::SameAccount`] - `from == to`.
    /// - [`LedgerError::Overflow`] - the destination balance would overflow.
    pub fn transfer(
        &self,
        amount: i64,
        from: AccountId,
        to: AccountId,
    ) -> Result<TransferReceipt, LedgerError> {
        let (source, destination) = self.resolve(amount, from, to)?;
        let priority = self.priority;
        execute(amount, source, destination, |account| {
            account.withdraw(amount, priority)
        })
    }

    /// [`transfer`](Self::transfer) that fails with [`LedgerError::Cancelled`]
    /// if `token` fires while the withdrawal is blocked.
    pub fn transfer_cancellable(
        &self,
        amount: i64,
        from: AccountId,
        to: AccountId,
        token: &CancelToken,
    ) -> Result<TransferReceipt, LedgerError> {
        let (source, destination) = self.resolve(amount, from, to)?;
        let priority = self.priority;
        execute(amount, source, destination, |account| {
            account.withdraw_cancellable(amount, priority, token)
        })
    }

    /// [`transfer`](Self::transfer) that fails with [`LedgerError::TimedOut`]
    /// if the withdrawal is still blocked after `timeout`.
    pub fn transfer_timeout(
        &self,
        amount: i64,
        from: AccountId,
        to: AccountId,
        timeout: Duration,
    ) -> Result<TransferReceipt, LedgerError> {
        let (source, destination) = self.resolve(amount, from, to)?;
        let priority = self.priority;
        execute(amount, source, destination, |account| {
            account.withdraw_timeout(amount, priority, timeout)
        })
    }

    fn resolve(
        &self,
        amount: i64,
        from: AccountId,
        to: AccountId,
    ) -> Result<(&'l Account, &'l Account), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let source = self.ledger.get(from)?;
        let destination = self.ledger.get(to)?;
        if from == to {
            return Err(LedgerError::SameAccount);
        }
        Ok((source, destination))
    }
}
