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

//! Account management.
//!
//! One [`Account`] per economic actor, created when the actor is registered
//! in the [`AccountBook`]. The balance is a raw signed decimal; the blocked
//! amount is a hold that reduces the available balance without moving money.
//!
//! Mutation is deliberately narrow: only the ledger engine writes `balance`
//! (through [`AccountData::post`]) and only the block manager writes
//! `blocked` (through the block methods). Everything else reads snapshots.

use crate::base::{AccountId, EntityId, EntityType};
use crate::entry::EntryType;
use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::sync::Arc;

/// Interior account state, guarded by the account mutex.
#[derive(Debug)]
pub struct AccountData {
    account_id: AccountId,
    balance: Decimal,
    blocked: Decimal,
    credit_limit: Decimal,
}

impl AccountData {
    fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            balance: Decimal::ZERO,
            blocked: Decimal::ZERO,
            credit_limit: Decimal::ZERO,
        }
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.blocked >= Decimal::ZERO,
            "Invariant violated: blocked amount went negative: {}",
            self.blocked
        );
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn blocked(&self) -> Decimal {
        self.blocked
    }

    /// The spendable portion: `balance - blocked`.
    pub fn available(&self) -> Decimal {
        self.balance - self.blocked
    }

    /// Applies one posting side to the balance and returns the new balance.
    ///
    /// Debits add, credits subtract. Availability is NOT checked here; the
    /// processor validates it inside the same lock scope before applying.
    pub(crate) fn post(&mut self, entry_type: EntryType, amount: Decimal) -> Decimal {
        self.balance += entry_type.sign() * amount;
        self.assert_invariants();
        self.balance
    }

    /// Raises the blocked amount. Caller must have checked availability.
    pub(crate) fn raise_block(&mut self, amount: Decimal) {
        self.blocked += amount;
        self.assert_invariants();
    }

    /// Lowers the blocked amount, floored at zero to guard against drift.
    pub(crate) fn release_block(&mut self, amount: Decimal) {
        self.blocked = (self.blocked - amount).max(Decimal::ZERO);
        self.assert_invariants();
    }
}

/// Account for one economic actor.
#[derive(Debug)]
pub struct Account {
    inner: Mutex<AccountData>,
}

impl Account {
    /// Balances render with two fraction digits.
    const DECIMAL_PRECISION: u32 = 2;

    pub fn new(account_id: AccountId) -> Self {
        Self {
            inner: Mutex::new(AccountData::new(account_id)),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.inner.lock().account_id
    }

    pub fn balance(&self) -> Decimal {
        self.inner.lock().balance
    }

    pub fn blocked(&self) -> Decimal {
        self.inner.lock().blocked
    }

    /// Returns `balance - blocked`.
    pub fn available(&self) -> Decimal {
        self.inner.lock().available()
    }

    pub fn credit_limit(&self) -> Decimal {
        self.inner.lock().credit_limit
    }

    /// Acquires the account lock. Multi-account posting sets must acquire
    /// locks in ascending [`AccountId`] order.
    pub(crate) fn lock(&self) -> MutexGuard<'_, AccountData> {
        self.inner.lock()
    }
}

impl Serialize for Account {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.inner.lock();
        let mut state = serializer.serialize_struct("Account", 5)?;
        state.serialize_field("entity_type", &data.account_id.entity_type)?;
        state.serialize_field("entity_id", &data.account_id.entity_id)?;
        state.serialize_field("balance", &data.balance.round_dp(Account::DECIMAL_PRECISION))?;
        state.serialize_field("blocked", &data.blocked.round_dp(Account::DECIMAL_PRECISION))?;
        state.serialize_field(
            "available",
            &data.available().round_dp(Account::DECIMAL_PRECISION),
        )?;
        state.end()
    }
}

/// Registry of accounts, one per registered actor.
///
/// The organization account exists from construction. All other accounts
/// are created when their owning actor is registered; referencing an
/// unregistered actor is a not-found error, never an implicit creation.
#[derive(Debug)]
pub struct AccountBook {
    accounts: dashmap::DashMap<AccountId, Arc<Account>>,
}

impl AccountBook {
    pub fn new() -> Self {
        let book = Self {
            accounts: dashmap::DashMap::new(),
        };
        book.register(AccountId::organization());
        book
    }

    /// Creates the account for an actor if it does not exist yet.
    pub fn register(&self, account_id: AccountId) -> Arc<Account> {
        self.accounts
            .entry(account_id)
            .or_insert_with(|| Arc::new(Account::new(account_id)))
            .clone()
    }

    /// Convenience: registers the account owned by `(entity_type, id)`.
    pub fn register_entity(&self, entity_type: EntityType, id: EntityId) -> Arc<Account> {
        self.register(AccountId::new(entity_type, id))
    }

    /// Resolves a registered account or fails with a not-found error.
    pub fn resolve(&self, account_id: AccountId) -> Result<Arc<Account>, crate::LedgerError> {
        self.accounts
            .get(&account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                crate::LedgerError::not_found(
                    account_id.entity_type.label(),
                    account_id.entity_id,
                )
            })
    }

    pub fn get(&self, account_id: &AccountId) -> Option<Arc<Account>> {
        self.accounts.get(account_id).map(|entry| entry.value().clone())
    }

    /// Iterates over all accounts, for report output.
    pub fn iter(&self) -> impl Iterator<Item = Arc<Account>> + '_ {
        self.accounts.iter().map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl Default for AccountBook {
    fn default() -> Self {
        Self::new()
    }
}
