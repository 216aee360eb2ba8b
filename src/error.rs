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

//! Error types for account and transfer operations.

use crate::base::AccountId;
use thiserror::Error;

/// Ledger operation errors.
///
/// Insufficient funds is deliberately absent: a withdrawal that cannot be
/// covered blocks until a deposit arrives instead of failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Amount is zero or negative
    #[error("invalid amount (must be positive)")]
    InvalidAmount,

    /// Blocked withdrawal was aborted through its cancel token
    #[error("withdrawal cancelled while waiting")]
    Cancelled,

    /// Blocked withdrawal reached its deadline
    #[error("withdrawal timed out while waiting")]
    TimedOut,

    /// Transfer source and destination are the same account
    #[error("source and destination account cannot be the same")]
    SameAccount,

    /// Account ID is outside the ledger
    #[error("account {0} not found")]
    UnknownAccount(AccountId),

    /// Deposit would overflow the balance
    #[error("balance overflow")]
    Overflow,

    /// Destination deposit failed and the withdrawn amount could not be
    /// returned to the source either
    #[error("transfer of {amount} could not be refunded to account {source_account}")]
    RefundFailed {
        amount: i64,
        source_account: AccountId,
    },
}
