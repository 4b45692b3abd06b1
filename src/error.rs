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

//! Error types for ledger and transaction processing.

use crate::base::{BlockId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger and transaction processing errors.
///
/// Business-rule violations ([`InsufficientBalance`], [`AlreadyReversed`],
/// [`AlreadyResolved`]) are surfaced to the caller and never retried.
/// [`Unbalanced`] indicates a defective posting recipe and must never occur
/// with the recipes shipped in this crate. [`Storage`] means the whole
/// operation was rolled back; the caller may retry it from scratch.
///
/// [`InsufficientBalance`]: LedgerError::InsufficientBalance
/// [`AlreadyReversed`]: LedgerError::AlreadyReversed
/// [`AlreadyResolved`]: LedgerError::AlreadyResolved
/// [`Unbalanced`]: LedgerError::Unbalanced
/// [`Storage`]: LedgerError::Storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A referenced entity, account, transaction or block does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A debiting operation would drive the available balance negative.
    #[error("insufficient available balance: {available} available, {requested} requested")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    /// A posting set's debit total does not equal its credit total.
    #[error("unbalanced posting set: {debits} debited, {credits} credited")]
    Unbalanced { debits: Decimal, credits: Decimal },

    /// A posting set with no postings was submitted.
    #[error("posting set is empty")]
    EmptyPostings,

    /// Amount is zero, negative, or carries more than two decimal places.
    #[error("invalid amount (must be positive with at most 2 decimal places)")]
    InvalidAmount,

    /// The transaction has already been reversed.
    #[error("transaction {0} is already reversed")]
    AlreadyReversed(TransactionId),

    /// The transaction cannot be reversed (not completed, or itself a reversal).
    #[error("transaction {0} cannot be reversed")]
    NotReversible(TransactionId),

    /// The block has already been resolved.
    #[error("block {0} is already resolved")]
    AlreadyResolved(BlockId),

    /// A transaction with this ID already exists in the store.
    #[error("duplicate transaction {0}")]
    DuplicateTransaction(TransactionId),

    /// Infrastructure failure during an atomic apply; nothing was committed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Builds a [`LedgerError::NotFound`] for any displayable id.
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
