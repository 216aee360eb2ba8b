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

//! # Ledger Monitor
//!
//! This library models independently guarded account balances that support
//! concurrent deposits, two-priority withdrawals, and transfers between
//! accounts without deadlock or lost updates.
//!
//! ## Core Components
//!
//! - [`Account`]: Monitor owning one balance; withdrawals block until covered
//! - [`Priority`]: Withdrawal class; preferred withdrawals hold back ordinary ones
//! - [`TransferCoordinator`]: Withdraw-then-deposit between two ledger accounts
//! - [`Ledger`]: Fixed-size registry of accounts addressed by [`AccountId`]
//! - [`CancelToken`]: Aborts a blocked withdrawal from another thread
//! - [`LedgerError`]: Error types for rejected or aborted operations
//!
//! ## Example
//!
//! ```
//! use ledger_monitor_rs::{AccountId, Ledger, Priority, TransferCoordinator};
//! use std::thread;
//!
//! let ledger = Ledger::new([0, 50]).unwrap();
//!
//! thread::scope(|s| {
//!     // Blocks until account 0 can cover the withdrawal.
//!     let waiter = s.spawn(|| ledger.get(AccountId(0)).unwrap().withdraw(80, Priority::Preferred));
//!
//!     ledger.get(AccountId(0)).unwrap().deposit(100).unwrap();
//!     assert_eq!(waiter.join().unwrap(), Ok(20));
//! });
//!
//! let coordinator = TransferCoordinator::new(&ledger);
//! coordinator.transfer(50, AccountId(1), AccountId(0)).unwrap();
//! assert_eq!(ledger.get(AccountId(0)).unwrap().balance(), 70);
//! ```
//!
//! ## Thread Safety
//!
//! Every [`Account`] is its own monitor. Operations on different accounts
//! never contend, and no operation holds more than one account lock.

pub mod account;
mod base;
pub mod cancel;
pub mod error;
mod ledger;
pub mod transfer;

pub use account::Account;
pub use base::{AccountId, Priority};
pub use cancel::CancelToken;
pub use error::LedgerError;
pub use ledger::Ledger;
pub use transfer::{TransferCoordinator, TransferReceipt, transfer, transfer_with};
