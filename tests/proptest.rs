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

//! Property-based tests for the account monitor and transfer coordinator.
//!
//! These tests verify invariants that should hold for any sequence of
//! deposits, withdrawals and transfers.

use ledger_monitor_rs::{Account, AccountId, Ledger, LedgerError, Priority, TransferCoordinator};
use proptest::prelude::*;
use std::thread;
use std::time::Duration;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount.
fn arb_amount() -> impl Strategy<Value = i64> {
    1i64..=1_000
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Ordinary), Just(Priority::Preferred)]
}

#[derive(Debug, Clone)]
enum Op {
    Deposit(i64),
    Withdraw(i64, Priority),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_amount().prop_map(Op::Deposit),
        (arb_amount(), arb_priority()).prop_map(|(amount, priority)| Op::Withdraw(amount, priority)),
    ]
}

/// (amount, from, to) over a ledger of `accounts` accounts.
fn arb_transfer(accounts: usize) -> impl Strategy<Value = (i64, usize, usize)> {
    (arb_amount(), 0..accounts, 0..accounts)
}

// =============================================================================
// Account Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Single-threaded monitor matches a plain integer model, where a
    /// withdrawal that cannot be covered right away is rejected.
    #[test]
    fn account_matches_model(
        initial in 0i64..=1_000,
        ops in prop::collection::vec(arb_op(), 0..50),
    ) {
        let account = Account::new(AccountId(0), initial).unwrap();
        let mut model = initial;

        for op in ops {
            match op {
                Op::Deposit(amount) => {
                    model += amount;
                    prop_assert_eq!(account.deposit(amount), Ok(model));
                }
                Op::Withdraw(amount, priority) => {
                    let result = account.withdraw_timeout(amount, priority, Duration::ZERO);
                    if amount <= model {
                        model -= amount;
                        prop_assert_eq!(result, Ok(model));
                    } else {
                        prop_assert_eq!(result, Err(LedgerError::TimedOut));
                    }
                }
            }
            prop_assert!(account.balance() >= 0);
        }

        prop_assert_eq!(account.balance(), model);
        prop_assert_eq!(account.preferred_waiters(), 0);
        prop_assert_eq!(account.ordinary_waiters(), 0);
    }

    /// Non-positive amounts never change the balance.
    #[test]
    fn non_positive_amounts_rejected(
        initial in 0i64..=1_000,
        amount in i64::MIN..=0,
        priority in arb_priority(),
    ) {
        let account = Account::new(AccountId(0), initial).unwrap();

        prop_assert_eq!(account.deposit(amount), Err(LedgerError::InvalidAmount));
        prop_assert_eq!(account.withdraw(amount, priority), Err(LedgerError::InvalidAmount));
        prop_assert_eq!(account.balance(), initial);
        prop_assert_eq!(account.preferred_waiters(), 0);
    }

    /// Reading a balance twice without a mutation in between agrees.
    #[test]
    fn balance_read_is_idempotent(
        initial in 0i64..=1_000,
        deposits in prop::collection::vec(arb_amount(), 0..10),
    ) {
        let account = Account::new(AccountId(0), initial).unwrap();
        for amount in deposits {
            account.deposit(amount).unwrap();
            prop_assert_eq!(account.balance(), account.balance());
        }
    }

    /// Negative initial balances are rejected.
    #[test]
    fn negative_initial_balance_rejected(initial in i64::MIN..0) {
        prop_assert_eq!(
            Account::new(AccountId(0), initial).unwrap_err(),
            LedgerError::InvalidAmount
        );
    }
}

// =============================================================================
// Transfer Invariant Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Sum of balances is invariant across any sequence of transfers, and
    /// no balance ever goes negative.
    #[test]
    fn transfers_conserve_total(
        initial in prop::collection::vec(0i64..=1_000, 2..8),
        transfers in prop::collection::vec(arb_transfer(8), 0..100),
    ) {
        let accounts = initial.len();
        let ledger = Ledger::new(initial).unwrap();
        let coordinator = TransferCoordinator::new(&ledger);
        let total = ledger.total_balance();

        for (amount, from, to) in transfers {
            let (from, to) = (AccountId(from % accounts), AccountId(to % accounts));
            let result = coordinator.transfer_timeout(amount, from, to, Duration::ZERO);

            if from == to {
                prop_assert_eq!(result, Err(LedgerError::SameAccount));
            } else if let Ok(receipt) = &result {
                prop_assert_eq!(receipt.amount, amount);
            } else {
                prop_assert_eq!(result, Err(LedgerError::TimedOut));
            }

            prop_assert_eq!(ledger.total_balance(), total);
            prop_assert!(ledger.iter().all(|account| account.balance() >= 0));
        }
    }

    /// A failed transfer leaves both balances untouched.
    #[test]
    fn failed_transfer_changes_nothing(
        source in 0i64..=100,
        destination in 0i64..=1_000,
        excess in 1i64..=100,
    ) {
        let ledger = Ledger::new([source, destination]).unwrap();
        let coordinator = TransferCoordinator::new(&ledger);

        let result = coordinator.transfer_timeout(
            source + excess,
            AccountId(0),
            AccountId(1),
            Duration::ZERO,
        );

        prop_assert_eq!(result, Err(LedgerError::TimedOut));
        prop_assert_eq!(ledger.get(AccountId(0)).unwrap().balance(), source);
        prop_assert_eq!(ledger.get(AccountId(1)).unwrap().balance(), destination);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Concurrent transfers conserve the total.
    #[test]
    fn concurrent_transfers_conserve_total(
        initial in prop::collection::vec(0i64..=500, 2..6),
        plans in prop::collection::vec(prop::collection::vec(arb_transfer(6), 1..30), 2..6),
    ) {
        let accounts = initial.len();
        let ledger = Ledger::new(initial).unwrap();
        let total = ledger.total_balance();

        thread::scope(|s| {
            for (n, plan) in plans.iter().enumerate() {
                let priority = if n % 2 == 0 { Priority::Ordinary } else { Priority::Preferred };
                let coordinator = TransferCoordinator::with_priority(&ledger, priority);
                s.spawn(move || {
                    for &(amount, from, to) in plan {
                        let _ = coordinator.transfer_timeout(
                            amount,
                            AccountId(from % accounts),
                            AccountId(to % accounts),
                            Duration::from_millis(1),
                        );
                    }
                });
            }
        });

        prop_assert_eq!(ledger.total_balance(), total);
        prop_assert!(ledger.iter().all(|account| account.balance() >= 0));
        prop_assert!(ledger.iter().all(|account| account.preferred_waiters() == 0));
    }
}
