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

//! Best-effort collaborators: admin notification and audit logging.
//!
//! Both are fire-and-forget. A failing notifier or audit sink never rolls
//! back a transaction; the processor logs the failure and moves on.

use parking_lot::Mutex;
use serde_json::Value;

/// Admin notification contract, used when a transaction lands in PENDING.
pub trait Notifier: Send + Sync {
    /// Delivers an event to the admins. Errors are the implementation's
    /// problem; the caller ignores the outcome.
    fn notify_admins(&self, event: &str);
}

/// Notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify_admins(&self, _event: &str) {}
}

/// Notifier that records events in memory. Used by tests and by the CLI to
/// surface pending transactions at the end of a run.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl Notifier for MemoryNotifier {
    fn notify_admins(&self, event: &str) {
        self.events.lock().push(event.to_string());
    }
}

/// Append-only audit record sink.
pub trait AuditSink: Send + Sync {
    fn record(&self, action: &str, entity: &str, before: Value, after: Value, actor: &str);
}

/// Audit sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _action: &str, _entity: &str, _before: Value, _after: Value, _actor: &str) {}
}

/// One captured audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub action: String,
    pub entity: String,
    pub before: Value,
    pub after: Value,
    pub actor: String,
}

/// Audit sink that keeps records in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, action: &str, entity: &str, before: Value, after: Value, actor: &str) {
        self.records.lock().push(AuditRecord {
            action: action.to_string(),
            entity: entity.to_string(),
            before,
            after,
            actor: actor.to_string(),
        });
    }
}
