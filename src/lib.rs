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

//! # Cashbook
//!
//! A double-entry ledger and transaction processing engine for an informal
//! money network: customer funds move between sites, financiers, commission
//! partners, external parties and one organization account.
//!
//! ## Core Components
//!
//! - [`Processor`]: Turns business intents into balanced posting sets, one
//!   recipe per transaction kind, and handles reversals
//! - [`Ledger`]: Applies posting sets atomically and keeps the append-only
//!   journal
//! - [`AccountBook`]: Registry with one account per economic actor
//! - [`BlockManager`]: Holds against financier balances without moving money
//! - [`CommissionCalculator`] / [`ApprovalGate`]: Pluggable commission and
//!   approval policies
//!
//! ## Example
//!
//! ```
//! use cashbook::{
//!     AccountBook, AccountId, Actor, EntityId, Ledger, Processor,
//!     TransactionIntent, TransactionStore,
//! };
//! use rust_decimal_macros::dec;
//! use std::sync::Arc;
//!
//! let accounts = Arc::new(AccountBook::new());
//! accounts.register(AccountId::site(1));
//! accounts.register(AccountId::financier(2));
//!
//! let ledger = Arc::new(Ledger::new(accounts));
//! let processor = Processor::new(ledger, Arc::new(TransactionStore::new()));
//!
//! // A customer deposits cash with financier 2 on behalf of site 1.
//! let deposit = TransactionIntent::Deposit {
//!     site: EntityId(1),
//!     financier: EntityId(2),
//!     amount: dec!(100.00),
//! };
//! let transaction = processor.process(deposit, &Actor::admin("ops")).unwrap();
//!
//! assert_eq!(
//!     processor.ledger().balance_of(AccountId::financier(2)),
//!     Some(dec!(100.00))
//! );
//! assert_eq!(transaction.net_amount, dec!(100.00));
//! ```
//!
//! ## Thread Safety
//!
//! Every component is safe to share across threads. Posting sets lock their
//! affected accounts in ascending account id order, so recipes touching
//! overlapping accounts serialize without deadlocking while disjoint ones
//! run in parallel.

pub mod account;
pub mod approval;
mod base;
pub mod block;
pub mod commission;
pub mod entry;
pub mod error;
pub mod hooks;
mod ledger;
mod processor;
mod store;
pub mod transaction;

pub use account::{Account, AccountBook};
pub use approval::{Actor, ApprovalGate, AutoApprove, Role, RolePolicy};
pub use base::{AccountId, BlockId, EntityId, EntityType, TransactionId};
pub use block::{Block, BlockManager};
pub use commission::{CommissionCalculator, CommissionSnapshot, NoCommission, RateTable};
pub use entry::{EntryType, LedgerEntry, Posting};
pub use error::LedgerError;
pub use hooks::{AuditSink, MemoryAudit, MemoryNotifier, Notifier, NullAudit, NullNotifier};
pub use ledger::{BalanceCheck, Ledger};
pub use processor::Processor;
pub use store::TransactionStore;
pub use transaction::{Transaction, TransactionIntent, TransactionKind, TransactionStatus};
