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

//! Fixed-size account registry.
//!
//! A [`Ledger`] is populated once, before any concurrent activity, and is
//! never resized afterwards. Its structure needs no synchronization; each
//! [`Account`] guards its own balance.

use crate::LedgerError;
use crate::account::Account;
use crate::base::AccountId;

/// Ordered collection of accounts addressed by position.
#[derive(Debug)]
pub struct Ledger {
    accounts: Vec<Account>,
}

impl Ledger {
    /// Creates one account per initial balance, numbered from zero.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] if any initial balance is negative.
    pub fn new<I>(initial_balances: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = i64>,
    {
        let accounts = initial_balances
            .into_iter()
            .enumerate()
            .map(|(index, balance)| Account::new(AccountId(index), balance))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Ledger { accounts })
    }

    /// Retrieves an account by ID.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownAccount`] if `id` is outside the ledger.
    pub fn get(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.accounts
            .get(id.0)
            .ok_or(LedgerError::UnknownAccount(id))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Returns an iterator over all accounts in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    /// Sum of all balances.
    ///
    /// Each balance is read under its own lock, one account at a time, so the
    /// sum is only exact while no transfer is in flight.
    pub fn total_balance(&self) -> i128 {
        self.accounts
            .iter()
            .map(|account| i128::from(account.balance()))
            .sum()
    }
}
