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

//! Approval gating contract.
//!
//! The gate answers one question: does this (transaction kind, actor role)
//! pair need an out-of-band approval before postings may be applied? The
//! workflow that later approves or rejects a pending transaction lives
//! outside this crate.

use crate::transaction::TransactionKind;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Role of the actor submitting an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Operator,
}

/// The person or system submitting an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self::new(name, Role::Admin)
    }
}

/// Yes/no approval contract.
pub trait ApprovalGate: Send + Sync {
    fn requires_approval(&self, kind: TransactionKind, role: Role) -> bool;
}

/// Gate that never requires approval.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl ApprovalGate for AutoApprove {
    fn requires_approval(&self, _kind: TransactionKind, _role: Role) -> bool {
        false
    }
}

/// Table-driven policy: a set of gated kinds per role. Admins are never
/// gated.
#[derive(Debug, Default, Clone)]
pub struct RolePolicy {
    gated: HashMap<Role, HashSet<TransactionKind>>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires approval when `role` submits `kind`.
    pub fn gate(mut self, role: Role, kind: TransactionKind) -> Self {
        self.gated.entry(role).or_default().insert(kind);
        self
    }
}

impl ApprovalGate for RolePolicy {
    fn requires_approval(&self, kind: TransactionKind, role: Role) -> bool {
        if role == Role::Admin {
            return false;
        }
        self.gated
            .get(&role)
            .is_some_and(|kinds| kinds.contains(&kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_approve_never_gates() {
        let gate = AutoApprove;
        assert!(!gate.requires_approval(TransactionKind::OrgWithdraw, Role::Operator));
    }

    #[test]
    fn policy_gates_configured_pairs_only() {
        let policy = RolePolicy::new()
            .gate(Role::Operator, TransactionKind::Withdrawal)
            .gate(Role::Operator, TransactionKind::OrgWithdraw);

        assert!(policy.requires_approval(TransactionKind::Withdrawal, Role::Operator));
        assert!(policy.requires_approval(TransactionKind::OrgWithdraw, Role::Operator));
        assert!(!policy.requires_approval(TransactionKind::Deposit, Role::Operator));
        assert!(!policy.requires_approval(TransactionKind::Withdrawal, Role::Manager));
    }

    #[test]
    fn admins_are_never_gated() {
        let policy = RolePolicy::new().gate(Role::Admin, TransactionKind::Withdrawal);
        assert!(!policy.requires_approval(TransactionKind::Withdrawal, Role::Admin));
    }
}
