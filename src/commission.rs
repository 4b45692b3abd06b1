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

//! Commission calculation contract and the rate-table implementation.
//!
//! The calculator is a pure function evaluated once at completion time; the
//! resulting [`CommissionSnapshot`] is stored on the transaction and never
//! re-derived from later rates.

use crate::base::EntityId;
use crate::error::LedgerError;
use crate::transaction::TransactionKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One partner's share of a commission split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerShare {
    pub partner: EntityId,
    pub amount: Decimal,
}

/// Immutable, point-in-time record of how a transaction's commission was
/// split between financier, site, partners and the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionSnapshot {
    pub financier_amount: Decimal,
    pub site_amount: Decimal,
    pub organization_amount: Decimal,
    pub partners: Vec<PartnerShare>,
}

impl CommissionSnapshot {
    /// A split where nobody earns anything.
    pub fn zero() -> Self {
        Self {
            financier_amount: Decimal::ZERO,
            site_amount: Decimal::ZERO,
            organization_amount: Decimal::ZERO,
            partners: Vec::new(),
        }
    }

    pub fn partner_total(&self) -> Decimal {
        self.partners.iter().map(|share| share.amount).sum()
    }

    /// Checks the conservation identity: every component non-negative.
    /// A negative organization remainder means the configured partner and
    /// financier shares exceed the site commission, which is a rate-table
    /// configuration defect.
    pub fn verify(&self) -> Result<(), LedgerError> {
        let non_negative = self.financier_amount >= Decimal::ZERO
            && self.site_amount >= Decimal::ZERO
            && self.organization_amount >= Decimal::ZERO
            && self.partners.iter().all(|share| share.amount >= Decimal::ZERO);
        if non_negative {
            Ok(())
        } else {
            Err(LedgerError::InvalidAmount)
        }
    }
}

/// Pure commission calculation over (kind, site, financier, gross amount).
///
/// Implementations must satisfy the conservation identities encoded in the
/// posting recipes: the breakdown is consumed verbatim when postings are
/// built, and an inconsistent one surfaces as an unbalanced posting set.
pub trait CommissionCalculator: Send + Sync {
    fn calculate(
        &self,
        kind: TransactionKind,
        site: Option<EntityId>,
        financier: EntityId,
        amount: Decimal,
    ) -> Result<CommissionSnapshot, LedgerError>;
}

/// Calculator that never awards commission. Useful as a default and in
/// tests that exercise recipes without splits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCommission;

impl CommissionCalculator for NoCommission {
    fn calculate(
        &self,
        _kind: TransactionKind,
        _site: Option<EntityId>,
        _financier: EntityId,
        _amount: Decimal,
    ) -> Result<CommissionSnapshot, LedgerError> {
        Ok(CommissionSnapshot::zero())
    }
}

/// Percentage-based rate table.
///
/// Rates are fractions of the gross amount (`0.06` = 6%). Per kind:
///
/// - DEPOSIT: financier and site each earn their configured rate; partners
///   take their shares out of the site commission; the organization keeps
///   `site - partners - financier`.
/// - WITHDRAWAL: the organization keeps the entire site commission; the
///   financier rate is treated as zero.
/// - DELIVERY: the delivery commission equals the site rate; partners take
///   their shares; the organization keeps the remainder.
/// - every other kind: zero split.
///
/// All amounts are rounded to 2 decimal places component-wise, and the
/// organization remainder is derived from the rounded components, so the
/// recipe-level balance law holds exactly.
#[derive(Debug, Default, Clone)]
pub struct RateTable {
    site_rates: HashMap<EntityId, Decimal>,
    financier_rates: HashMap<EntityId, Decimal>,
    partner_shares: HashMap<EntityId, Vec<(EntityId, Decimal)>>,
    default_site_rate: Decimal,
    default_financier_rate: Decimal,
}

impl RateTable {
    const SCALE: u32 = 2;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site_rate(mut self, site: EntityId, rate: Decimal) -> Self {
        self.site_rates.insert(site, rate);
        self
    }

    pub fn with_financier_rate(mut self, financier: EntityId, rate: Decimal) -> Self {
        self.financier_rates.insert(financier, rate);
        self
    }

    /// Fallback rate for sites without a configured rate.
    pub fn with_default_site_rate(mut self, rate: Decimal) -> Self {
        self.default_site_rate = rate;
        self
    }

    /// Fallback rate for financiers without a configured rate.
    pub fn with_default_financier_rate(mut self, rate: Decimal) -> Self {
        self.default_financier_rate = rate;
        self
    }

    /// Adds a partner share taken out of the given site's commission.
    pub fn with_partner_share(mut self, site: EntityId, partner: EntityId, rate: Decimal) -> Self {
        self.partner_shares
            .entry(site)
            .or_default()
            .push((partner, rate));
        self
    }

    fn site_rate(&self, site: Option<EntityId>) -> Decimal {
        site.and_then(|id| self.site_rates.get(&id).copied())
            .unwrap_or(self.default_site_rate)
    }

    fn financier_rate(&self, financier: EntityId) -> Decimal {
        self.financier_rates
            .get(&financier)
            .copied()
            .unwrap_or(self.default_financier_rate)
    }

    fn partner_amounts(&self, site: Option<EntityId>, amount: Decimal) -> Vec<PartnerShare> {
        let Some(site) = site else {
            return Vec::new();
        };
        self.partner_shares
            .get(&site)
            .map(|shares| {
                shares
                    .iter()
                    .map(|(partner, rate)| PartnerShare {
                        partner: *partner,
                        amount: (amount * rate).round_dp(Self::SCALE),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl CommissionCalculator for RateTable {
    fn calculate(
        &self,
        kind: TransactionKind,
        site: Option<EntityId>,
        financier: EntityId,
        amount: Decimal,
    ) -> Result<CommissionSnapshot, LedgerError> {
        let site_amount = (amount * self.site_rate(site)).round_dp(Self::SCALE);

        let snapshot = match kind {
            TransactionKind::Deposit => {
                let financier_amount =
                    (amount * self.financier_rate(financier)).round_dp(Self::SCALE);
                let partners = self.partner_amounts(site, amount);
                let partner_total: Decimal = partners.iter().map(|p| p.amount).sum();
                CommissionSnapshot {
                    financier_amount,
                    site_amount,
                    organization_amount: site_amount - partner_total - financier_amount,
                    partners,
                }
            }
            // Withdrawal commission is presumed financier-free; the
            // organization keeps the whole site commission.
            TransactionKind::Withdrawal => CommissionSnapshot {
                financier_amount: Decimal::ZERO,
                site_amount,
                organization_amount: site_amount,
                partners: Vec::new(),
            },
            TransactionKind::Delivery => {
                let partners = self.partner_amounts(site, amount);
                let partner_total: Decimal = partners.iter().map(|p| p.amount).sum();
                CommissionSnapshot {
                    financier_amount: Decimal::ZERO,
                    site_amount,
                    organization_amount: site_amount - partner_total,
                    partners,
                }
            }
            _ => CommissionSnapshot::zero(),
        };

        snapshot.verify()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table() -> RateTable {
        RateTable::new()
            .with_site_rate(EntityId(1), dec!(0.06))
            .with_financier_rate(EntityId(2), dec!(0.025))
            .with_partner_share(EntityId(1), EntityId(5), dec!(0.015))
    }

    #[test]
    fn deposit_split_matches_remainder_identity() {
        let snapshot = table()
            .calculate(
                TransactionKind::Deposit,
                Some(EntityId(1)),
                EntityId(2),
                dec!(100.00),
            )
            .unwrap();

        assert_eq!(snapshot.financier_amount, dec!(2.50));
        assert_eq!(snapshot.site_amount, dec!(6.00));
        assert_eq!(snapshot.partner_total(), dec!(1.50));
        // organization = site - partners - financier
        assert_eq!(snapshot.organization_amount, dec!(2.00));
    }

    #[test]
    fn withdrawal_gives_organization_the_whole_site_commission() {
        let snapshot = table()
            .calculate(
                TransactionKind::Withdrawal,
                Some(EntityId(1)),
                EntityId(2),
                dec!(100.00),
            )
            .unwrap();

        assert_eq!(snapshot.financier_amount, Decimal::ZERO);
        assert_eq!(snapshot.site_amount, dec!(6.00));
        assert_eq!(snapshot.organization_amount, dec!(6.00));
        assert!(snapshot.partners.is_empty());
    }

    #[test]
    fn delivery_splits_between_partner_and_organization() {
        let snapshot = table()
            .calculate(
                TransactionKind::Delivery,
                Some(EntityId(1)),
                EntityId(2),
                dec!(200.00),
            )
            .unwrap();

        assert_eq!(snapshot.site_amount, dec!(12.00));
        assert_eq!(snapshot.partner_total(), dec!(3.00));
        assert_eq!(snapshot.organization_amount, dec!(9.00));
    }

    #[test]
    fn non_commission_kind_yields_zero_split() {
        let snapshot = table()
            .calculate(
                TransactionKind::SiteDelivery,
                Some(EntityId(1)),
                EntityId(2),
                dec!(100.00),
            )
            .unwrap();
        assert_eq!(snapshot, CommissionSnapshot::zero());
    }

    #[test]
    fn negative_remainder_is_rejected() {
        // Partner and financier shares exceed the site commission.
        let table = RateTable::new()
            .with_site_rate(EntityId(1), dec!(0.01))
            .with_financier_rate(EntityId(2), dec!(0.05));
        let result = table.calculate(
            TransactionKind::Deposit,
            Some(EntityId(1)),
            EntityId(2),
            dec!(100.00),
        );
        assert_eq!(result, Err(LedgerError::InvalidAmount));
    }

    #[test]
    fn default_rates_apply_to_unconfigured_entities() {
        let table = RateTable::new()
            .with_default_site_rate(dec!(0.04))
            .with_default_financier_rate(dec!(0.01));
        let snapshot = table
            .calculate(
                TransactionKind::Deposit,
                Some(EntityId(42)),
                EntityId(43),
                dec!(100.00),
            )
            .unwrap();
        assert_eq!(snapshot.site_amount, dec!(4.00));
        assert_eq!(snapshot.financier_amount, dec!(1.00));
        assert_eq!(snapshot.organization_amount, dec!(3.00));
    }

    #[test]
    fn unknown_site_earns_nothing() {
        let snapshot = table()
            .calculate(
                TransactionKind::Withdrawal,
                Some(EntityId(99)),
                EntityId(2),
                dec!(100.00),
            )
            .unwrap();
        assert_eq!(snapshot.site_amount, Decimal::ZERO);
    }
}
