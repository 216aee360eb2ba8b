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

use clap::Parser;
use csv::Writer;
use ledger_monitor_rs::{AccountId, Ledger, LedgerError, TransferCoordinator, TransferReceipt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use std::process;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Ledger Monitor - Concurrent transfer simulation
///
/// Seeds every account with a random balance, then starts one worker per
/// account that pulls a fixed amount from a random other account. After a
/// delay a payroll deposit lands in every account, releasing blocked
/// transfers. Initial and final balances are written to stdout as CSV.
#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-monitor-rs")]
#[command(about = "Simulates concurrent transfers between monitor-guarded accounts", long_about = None)]
struct Args {
    /// Number of accounts (at least two)
    #[arg(long, default_value_t = 10)]
    accounts: usize,

    /// Upper bound (inclusive) of each random initial balance
    #[arg(long, default_value_t = 300)]
    max_initial_balance: i64,

    /// Amount each worker transfers into its own account
    #[arg(long, default_value_t = 100)]
    transfer_amount: i64,

    /// Amount deposited into every account after the delay (0 to skip)
    #[arg(long, default_value_t = 1000)]
    payroll: i64,

    /// Delay before the payroll deposit, in milliseconds
    #[arg(long, default_value_t = 1000)]
    payroll_delay_ms: u64,

    /// How long a worker waits for funds before giving up, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    transfer_timeout_ms: u64,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        if self.accounts < 2 {
            return Err("at least two accounts are required".to_string());
        }
        if self.max_initial_balance < 0 {
            return Err("maximum initial balance cannot be negative".to_string());
        }
        if self.transfer_amount <= 0 {
            return Err("transfer amount must be positive".to_string());
        }
        if self.payroll < 0 {
            return Err("payroll cannot be negative".to_string());
        }
        Ok(())
    }
}

fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if let Err(e) = simulate(&args, &mut rng, std::io::stdout()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Simulation failures that abort the run.
#[derive(Error, Debug)]
enum SimulationError {
    #[error("creating accounts: {0}")]
    Ledger(#[from] LedgerError),

    #[error("writing balances: {0}")]
    Csv(#[from] csv::Error),

    #[error("writing output: {0}")]
    Io(#[from] std::io::Error),

    #[error("a worker thread panicked")]
    WorkerPanicked,
}

/// Runs the whole simulation, writing the initial and the final balance
/// report to `out`, separated by an empty line.
fn simulate<R: Rng, W: Write>(
    args: &Args,
    rng: &mut R,
    mut out: W,
) -> Result<Vec<Result<TransferReceipt, LedgerError>>, SimulationError> {
    let ledger = build_ledger(args, rng)?;
    write_balances(&ledger, &mut out)?;
    writeln!(out)?;

    let plan = plan_transfers(ledger.len(), rng);
    let outcomes =
        run_simulation(&ledger, &plan, args).map_err(|_| SimulationError::WorkerPanicked)?;

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    info!(
        transfers = outcomes.len(),
        failed,
        total = %ledger.total_balance(),
        "simulation finished"
    );

    write_balances(&ledger, &mut out)?;
    Ok(outcomes)
}

/// Library events at `debug`, everything else at `info`.
const DEFAULT_LOG_FILTER: &str = "info,ledger_monitor_rs=debug";

/// Installs the stderr log subscriber.
///
/// Per-operation deposit and withdrawal events are shown by default;
/// `RUST_LOG` overrides the filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Creates the ledger with random initial balances in `0..=max_initial_balance`.
fn build_ledger<R: Rng>(args: &Args, rng: &mut R) -> Result<Ledger, LedgerError> {
    let balances: Vec<i64> = (0..args.accounts)
        .map(|_| rng.gen_range(0..=args.max_initial_balance))
        .collect();
    Ledger::new(balances)
}

/// Pairs every account (destination) with a random other account (source).
fn plan_transfers<R: Rng>(accounts: usize, rng: &mut R) -> Vec<(AccountId, AccountId)> {
    (0..accounts)
        .map(|to| {
            let offset = rng.gen_range(1..accounts);
            (AccountId((to + offset) % accounts), AccountId(to))
        })
        .collect()
}

/// Runs one scoped worker per planned transfer, deposits the payroll after the
/// delay, and collects every worker's outcome in plan order.
///
/// # Errors
///
/// Returns the panic payload if any worker panicked.
fn run_simulation(
    ledger: &Ledger,
    plan: &[(AccountId, AccountId)],
    args: &Args,
) -> thread::Result<Vec<Result<TransferReceipt, LedgerError>>> {
    let coordinator = TransferCoordinator::new(ledger);
    let amount = args.transfer_amount;
    let timeout = Duration::from_millis(args.transfer_timeout_ms);

    crossbeam::scope(|scope| {
        let workers: Vec<_> = plan
            .iter()
            .map(|&(from, to)| {
                scope.spawn(move |_| {
                    info!(%from, %to, amount, "transfer requested");
                    let outcome = coordinator.transfer_timeout(amount, from, to, timeout);
                    if let Err(error) = &outcome {
                        warn!(%from, %to, amount, %error, "transfer not completed");
                    }
                    outcome
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(args.payroll_delay_ms));

        if args.payroll > 0 {
            for account in ledger.iter() {
                if let Err(error) = account.deposit(args.payroll) {
                    warn!(account = %account.id(), %error, "payroll deposit failed");
                }
            }
        }

        workers
            .into_iter()
            .map(|worker| worker.join())
            .collect::<thread::Result<Vec<_>>>()
    })
    .and_then(|outcomes| outcomes)
}

/// Write account balances to a CSV writer
///
/// # CSV Format
///
/// Columns: `account, balance`
///
/// # Example
///
/// ```csv
/// account,balance
/// 0,1100
/// 1,1000
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
fn write_balances<W: Write>(ledger: &Ledger, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    for account in ledger.iter() {
        wtr.serialize(account)?;
    }

    wtr.flush()?;
    Ok(())
}
