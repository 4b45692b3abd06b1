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

//! Balance blocks: holds against a financier that reduce the available
//! balance without moving money.
//!
//! Only the [`BlockManager`] mutates an account's blocked amount. A block
//! resolves at most once; the release is floored at zero to guard against
//! drift.

use crate::account::AccountBook;
use crate::base::{AccountId, BlockId, EntityId};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default estimated resolution time when a financier has no history.
const DEFAULT_ESTIMATE_DAYS: i64 = 3;

/// Number of recent resolutions averaged for the estimate.
const ESTIMATE_WINDOW: usize = 10;

/// A hold against a financier's balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub financier: EntityId,
    pub amount: Decimal,
    pub reason: String,
    pub started_at: DateTime<Utc>,
    /// `None` while the block is active.
    pub resolved_at: Option<DateTime<Utc>>,
    pub estimated_days: i64,
    pub resolution_note: Option<String>,
}

impl Block {
    pub fn is_active(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Opens and resolves blocks, and owns the `blocked_amount` side of every
/// financier account.
#[derive(Debug)]
pub struct BlockManager {
    accounts: Arc<AccountBook>,
    blocks: DashMap<BlockId, Arc<Mutex<Block>>>,
    /// Resolution durations in days per financier, most recent last.
    resolution_days: DashMap<EntityId, Vec<i64>>,
    next_id: AtomicU64,
}

impl BlockManager {
    pub fn new(accounts: Arc<AccountBook>) -> Self {
        Self {
            accounts,
            blocks: DashMap::new(),
            resolution_days: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Opens a block against a financier.
    ///
    /// Requires `amount <= available balance`, verified while the account
    /// lock is held so a concurrent recipe cannot spend the same funds.
    /// When `estimated_days` is not supplied it defaults to the rounded
    /// mean resolution time of the financier's last 10 resolved blocks, or
    /// 3 days with no history.
    pub fn open(
        &self,
        financier: EntityId,
        amount: Decimal,
        reason: impl Into<String>,
        estimated_days: Option<i64>,
    ) -> Result<Block, LedgerError> {
        if amount <= Decimal::ZERO || amount.round_dp(2) != amount {
            return Err(LedgerError::InvalidAmount);
        }

        let account = self.accounts.resolve(AccountId::financier(financier.0))?;
        {
            let mut data = account.lock();
            let available = data.available();
            if amount > available {
                return Err(LedgerError::InsufficientBalance {
                    available,
                    requested: amount,
                });
            }
            data.raise_block(amount);
        }

        let block = Block {
            id: BlockId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            financier,
            amount,
            reason: reason.into(),
            started_at: Utc::now(),
            resolved_at: None,
            estimated_days: estimated_days.unwrap_or_else(|| self.estimate(financier)),
            resolution_note: None,
        };
        tracing::info!(
            block = %block.id,
            financier = %financier,
            amount = %amount,
            "block opened"
        );
        self.blocks
            .insert(block.id, Arc::new(Mutex::new(block.clone())));
        Ok(block)
    }

    /// Resolves a block, releasing its amount from the financier's blocked
    /// balance (floored at zero) and stamping `resolved_at`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - unknown block id.
    /// - [`LedgerError::AlreadyResolved`] - block was resolved before.
    pub fn resolve(&self, block_id: BlockId, note: Option<&str>) -> Result<(), LedgerError> {
        let record = self
            .blocks
            .get(&block_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LedgerError::not_found("block", block_id))?;

        let mut block = record.lock();
        if block.resolved_at.is_some() {
            return Err(LedgerError::AlreadyResolved(block_id));
        }

        let account = self
            .accounts
            .resolve(AccountId::financier(block.financier.0))?;
        account.lock().release_block(block.amount);

        let now = Utc::now();
        block.resolved_at = Some(now);
        block.resolution_note = note.map(String::from);

        let days = (now - block.started_at).num_days();
        self.resolution_days
            .entry(block.financier)
            .or_default()
            .push(days);

        tracing::info!(block = %block_id, financier = %block.financier, "block resolved");
        Ok(())
    }

    /// Returns a point-in-time copy of a block.
    pub fn get(&self, block_id: BlockId) -> Option<Block> {
        self.blocks
            .get(&block_id)
            .map(|entry| entry.lock().clone())
    }

    /// Active blocks for a financier.
    pub fn active_for(&self, financier: EntityId) -> Vec<Block> {
        self.blocks
            .iter()
            .map(|entry| entry.lock().clone())
            .filter(|block| block.financier == financier && block.is_active())
            .collect()
    }

    /// Rounded mean resolution time (days) of the financier's last 10
    /// resolved blocks, or 3 with no history.
    fn estimate(&self, financier: EntityId) -> i64 {
        let Some(history) = self.resolution_days.get(&financier) else {
            return DEFAULT_ESTIMATE_DAYS;
        };
        let recent: Vec<i64> = history
            .iter()
            .rev()
            .take(ESTIMATE_WINDOW)
            .copied()
            .collect();
        if recent.is_empty() {
            return DEFAULT_ESTIMATE_DAYS;
        }
        let sum: i64 = recent.iter().sum();
        let mean = Decimal::from(sum) / Decimal::from(recent.len() as i64);
        mean.round().to_i64().unwrap_or(DEFAULT_ESTIMATE_DAYS)
    }
}
