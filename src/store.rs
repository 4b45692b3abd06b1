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

//! Thread-safe transaction store with id allocation and deduplication.
//!
//! Combines a [`DashMap`] for O(1) lookup with a [`SegQueue`] preserving
//! insertion order. Each record sits behind its own mutex so the reversal
//! handler can hold a transaction across its status check and the mirrored
//! posting application.

use crate::base::TransactionId;
use crate::error::LedgerError;
use crate::transaction::Transaction;
use crossbeam::queue::SegQueue;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transaction store with duplicate detection and FIFO insertion order.
#[derive(Debug)]
pub struct TransactionStore {
    /// Records indexed by transaction id.
    transactions: DashMap<TransactionId, Arc<Mutex<Transaction>>>,

    /// Transaction ids in insertion order.
    order: SegQueue<TransactionId>,

    /// Next id to allocate; ids start at 1.
    next_id: AtomicU64,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            order: SegQueue::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocates a globally unique transaction id.
    pub fn allocate_id(&self) -> TransactionId {
        TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Adds a transaction record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateTransaction`] if a record with the
    /// same id already exists.
    pub fn insert(&self, transaction: Transaction) -> Result<(), LedgerError> {
        let id = transaction.id;

        // Entry API for atomic check-and-insert.
        match self.transactions.entry(id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateTransaction(id)),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(transaction)));
                self.order.push(id);
                Ok(())
            }
        }
    }

    /// Returns the lockable record for a transaction, if present.
    pub fn get(&self, id: TransactionId) -> Option<Arc<Mutex<Transaction>>> {
        self.transactions.get(&id).map(|entry| entry.value().clone())
    }

    /// Returns a point-in-time copy of a transaction.
    pub fn snapshot(&self, id: TransactionId) -> Option<Transaction> {
        self.get(id).map(|record| record.lock().clone())
    }

    /// Drains and returns all ids in insertion order. Intended for
    /// end-of-run reporting.
    pub fn drain_order(&self) -> Vec<TransactionId> {
        let mut ids = Vec::new();
        while let Some(id) = self.order.pop() {
            ids.push(id);
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for TransactionStore {
    fn default() -> Self {
        Self::new()
    }
}
