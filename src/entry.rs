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

//! Ledger postings and entries.
//!
//! A [`Posting`] is an instruction: debit or credit one account by a
//! positive amount. A [`LedgerEntry`] is the immutable row written once a
//! posting has been applied, carrying the account balance snapshot taken
//! immediately after the update. Entries are never edited; a reversal
//! appends mirrored entries under a new transaction id.

use crate::base::{AccountId, TransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of a double-entry posting.
///
/// Debit increases an actor's holdings, credit decreases them. The same
/// asset-style convention applies to every account, including the
/// organization (whose display-sign inversion is a presentation concern
/// outside this crate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    /// The opposite side, used when mirroring entries for a reversal.
    pub fn flipped(self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }

    /// Sign applied to the account balance: `+1` for debit, `-1` for credit.
    pub fn sign(self) -> Decimal {
        match self {
            EntryType::Debit => Decimal::ONE,
            EntryType::Credit => Decimal::NEGATIVE_ONE,
        }
    }
}

/// One side of a posting set, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub account_id: AccountId,
    pub entry_type: EntryType,
    /// Strictly positive.
    pub amount: Decimal,
    pub description: String,
}

impl Posting {
    pub fn debit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            entry_type: EntryType::Debit,
            amount,
            description: description.into(),
        }
    }

    pub fn credit(account_id: AccountId, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            account_id,
            entry_type: EntryType::Credit,
            amount,
            description: description.into(),
        }
    }

    /// Builds the mirror posting of an applied entry: same account, same
    /// amount, flipped side.
    pub fn mirror_of(entry: &LedgerEntry) -> Self {
        Self {
            account_id: entry.account_id,
            entry_type: entry.entry_type.flipped(),
            amount: entry.amount,
            description: format!("reversal of transaction {}", entry.transaction_id),
        }
    }
}

/// An immutable ledger row: one applied posting plus the balance snapshot
/// taken immediately after applying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub description: String,
    pub balance_after: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// The signed contribution of this entry to its account balance.
    pub fn signed_amount(&self) -> Decimal {
        self.entry_type.sign() * self.amount
    }
}
