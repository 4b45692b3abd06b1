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

//! Core identifier types for economic actors, transactions and blocks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an economic actor (site, financier, partner, ...).
///
/// Identifiers are scoped per [`EntityType`]: site 3 and financier 3 are
/// different actors owning different accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a transaction.
///
/// Allocated by the transaction store; globally unique across all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a balance block (hold) against a financier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of economic actor an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Site,
    Financier,
    Partner,
    Organization,
    ExternalParty,
}

impl EntityType {
    /// Lowercase label used in display output and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityType::Site => "site",
            EntityType::Financier => "financier",
            EntityType::Partner => "partner",
            EntityType::Organization => "organization",
            EntityType::ExternalParty => "external_party",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Composite account key: one account per (entity type, entity id) pair.
///
/// The derived ordering gives posting sets a stable global order in which
/// to take account locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct AccountId {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
}

impl AccountId {
    pub fn new(entity_type: EntityType, entity_id: EntityId) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }

    pub fn site(id: u32) -> Self {
        Self::new(EntityType::Site, EntityId(id))
    }

    pub fn financier(id: u32) -> Self {
        Self::new(EntityType::Financier, EntityId(id))
    }

    pub fn partner(id: u32) -> Self {
        Self::new(EntityType::Partner, EntityId(id))
    }

    pub fn external_party(id: u32) -> Self {
        Self::new(EntityType::ExternalParty, EntityId(id))
    }

    /// The singleton organization account.
    pub fn organization() -> Self {
        Self::new(EntityType::Organization, EntityId(0))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.entity_id)
    }
}
