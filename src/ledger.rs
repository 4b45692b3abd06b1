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

//! Ledger engine: the money-conservation authority.
//!
//! [`Ledger::apply`] turns a balanced posting set into account balance
//! updates plus immutable journal entries, atomically: validation is
//! complete before the first balance is touched, and every account in the
//! set is locked for the whole application, so no partial posting set is
//! ever observable.
//!
//! # Locking
//!
//! Accounts are locked in ascending [`AccountId`] order. Every posting set
//! follows the same order, so two sets touching overlapping accounts
//! serialize without deadlocking. [`Ledger::apply_checked`] additionally
//! verifies available-balance requirements inside that lock scope, closing
//! the check-then-act race between reading an available balance and
//! applying postings against it.

use crate::account::AccountBook;
use crate::base::{AccountId, TransactionId};
use crate::entry::{EntryType, LedgerEntry, Posting};
use crate::error::LedgerError;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;

/// An available-balance requirement verified under the apply lock scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub account_id: AccountId,
    pub requested: Decimal,
}

/// The ledger: account registry plus append-only journal.
///
/// Only this type mutates account balances.
#[derive(Debug)]
pub struct Ledger {
    accounts: Arc<AccountBook>,
    journal: Mutex<Vec<LedgerEntry>>,
}

impl Ledger {
    pub fn new(accounts: Arc<AccountBook>) -> Self {
        Self {
            accounts,
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    /// Applies a balanced posting set atomically.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::EmptyPostings`] - no postings.
    /// - [`LedgerError::InvalidAmount`] - a posting amount is not positive.
    /// - [`LedgerError::Unbalanced`] - debit total != credit total.
    /// - [`LedgerError::NotFound`] - a posting targets an unknown account.
    ///
    /// In every error case no balance is mutated and no entry is written.
    pub fn apply(
        &self,
        transaction_id: TransactionId,
        postings: &[Posting],
    ) -> Result<(), LedgerError> {
        self.apply_checked(transaction_id, postings, &[])
    }

    /// Like [`Ledger::apply`], but first verifies each balance check under
    /// the same lock scope that the postings are applied in.
    ///
    /// Fails with [`LedgerError::InsufficientBalance`] when a checked
    /// account's `balance - blocked` cannot cover the requested amount.
    pub fn apply_checked(
        &self,
        transaction_id: TransactionId,
        postings: &[Posting],
        checks: &[BalanceCheck],
    ) -> Result<(), LedgerError> {
        if postings.is_empty() {
            return Err(LedgerError::EmptyPostings);
        }

        let mut debits = Decimal::ZERO;
        let mut credits = Decimal::ZERO;
        for posting in postings {
            if posting.amount <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount);
            }
            match posting.entry_type {
                EntryType::Debit => debits += posting.amount,
                EntryType::Credit => credits += posting.amount,
            }
        }
        // Exact decimal equality, never approximate.
        if debits != credits {
            return Err(LedgerError::Unbalanced { debits, credits });
        }

        // Resolve every affected account up front so a missing one fails
        // before any mutation.
        let mut ids: Vec<AccountId> = postings
            .iter()
            .map(|posting| posting.account_id)
            .chain(checks.iter().map(|check| check.account_id))
            .collect();
        ids.sort();
        ids.dedup();

        let accounts = ids
            .iter()
            .map(|id| self.accounts.resolve(*id))
            .collect::<Result<Vec<_>, _>>()?;

        // Lock in ascending account id order; posting order within the set
        // does not matter for the final balances.
        let mut guards: Vec<_> = accounts.iter().map(|account| account.lock()).collect();

        let index_of = |account_id: AccountId| -> Result<usize, LedgerError> {
            ids.binary_search(&account_id)
                .map_err(|_| LedgerError::Storage(format!("account {account_id} not locked")))
        };

        for check in checks {
            let available = guards[index_of(check.account_id)?].available();
            if check.requested > available {
                return Err(LedgerError::InsufficientBalance {
                    available,
                    requested: check.requested,
                });
            }
        }

        let now = Utc::now();
        let mut entries = Vec::with_capacity(postings.len());
        for posting in postings {
            let balance_after =
                guards[index_of(posting.account_id)?].post(posting.entry_type, posting.amount);
            tracing::debug!(
                transaction = %transaction_id,
                account = %posting.account_id,
                entry = ?posting.entry_type,
                amount = %posting.amount,
                balance_after = %balance_after,
                "posting applied"
            );
            entries.push(LedgerEntry {
                transaction_id,
                account_id: posting.account_id,
                entry_type: posting.entry_type,
                amount: posting.amount,
                description: posting.description.clone(),
                balance_after,
                recorded_at: now,
            });
        }

        // Journal rows land while the account locks are still held, so a
        // reader that takes an account lock never sees a balance ahead of
        // its entries.
        self.journal.lock().extend(entries);
        Ok(())
    }

    /// All entries written under the given transaction, in posting order.
    pub fn entries_for(&self, transaction_id: TransactionId) -> Vec<LedgerEntry> {
        self.journal
            .lock()
            .iter()
            .filter(|entry| entry.transaction_id == transaction_id)
            .cloned()
            .collect()
    }

    /// All entries affecting the given account since its creation.
    pub fn entries_for_account(&self, account_id: AccountId) -> Vec<LedgerEntry> {
        self.journal
            .lock()
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.journal.lock().len()
    }

    /// Current balance of an account, if registered.
    pub fn balance_of(&self, account_id: AccountId) -> Option<Decimal> {
        self.accounts.get(&account_id).map(|account| account.balance())
    }
}
