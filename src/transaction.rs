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

//! Transactions and the intents that create them.
//!
//! A [`TransactionIntent`] is what a caller submits: one variant per posting
//! recipe, carrying only the participants and the gross amount. The
//! processor turns an intent into a [`Transaction`] record plus, when the
//! approval gate allows, a balanced posting set.
//!
//! Status transitions:
//! - `Pending` → `Completed` or `Failed` (external approval workflow)
//! - `Completed` → `Reversed` (exactly once, via the reversal handler)

use crate::base::{AccountId, EntityId, TransactionId};
use crate::commission::CommissionSnapshot;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of transaction kinds.
///
/// `Reversal` is never submitted as an intent; it is created by the
/// reversal handler. Adding a kind here forces every recipe match in the
/// processor to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    SiteDelivery,
    PartnerPayment,
    FinancierTransfer,
    ExternalDebtIn,
    ExternalDebtOut,
    ExternalPayment,
    OrgExpense,
    OrgIncome,
    OrgWithdraw,
    Payment,
    TopUp,
    Delivery,
    Reversal,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::SiteDelivery => "site_delivery",
            TransactionKind::PartnerPayment => "partner_payment",
            TransactionKind::FinancierTransfer => "financier_transfer",
            TransactionKind::ExternalDebtIn => "external_debt_in",
            TransactionKind::ExternalDebtOut => "external_debt_out",
            TransactionKind::ExternalPayment => "external_payment",
            TransactionKind::OrgExpense => "org_expense",
            TransactionKind::OrgIncome => "org_income",
            TransactionKind::OrgWithdraw => "org_withdraw",
            TransactionKind::Payment => "payment",
            TransactionKind::TopUp => "top_up",
            TransactionKind::Delivery => "delivery",
            TransactionKind::Reversal => "reversal",
        }
    }

    /// Whether this kind carries a commission split.
    pub fn carries_commission(&self) -> bool {
        matches!(
            self,
            TransactionKind::Deposit | TransactionKind::Withdrawal | TransactionKind::Delivery
        )
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting approval; zero ledger effect.
    Pending,
    /// Postings applied.
    Completed,
    /// Mirrored by a later reversal transaction.
    Reversed,
    /// Rejected by the approval workflow; zero ledger effect.
    Failed,
}

/// One business event, persisted in the transaction store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub gross_amount: Decimal,
    pub net_amount: Decimal,
    pub site: Option<EntityId>,
    pub financier: Option<EntityId>,
    pub partner: Option<EntityId>,
    pub external_party: Option<EntityId>,
    /// For PAYMENT/TOP_UP: the non-financier counterparty account.
    pub source_entity: Option<AccountId>,
    pub transaction_date: DateTime<Utc>,
    pub created_by: String,
    pub original_transaction_id: Option<TransactionId>,
    pub reversal_reason: Option<String>,
    pub reversed_at: Option<DateTime<Utc>>,
    /// Point-in-time commission split; never recomputed from live rates.
    pub commission: Option<CommissionSnapshot>,
}

/// A caller-submitted business intent, one variant per posting recipe.
///
/// Amounts are gross; commission splits are derived by the calculator, not
/// supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TransactionIntent {
    /// Customer handed cash to a financier on behalf of a site.
    Deposit {
        site: EntityId,
        financier: EntityId,
        amount: Decimal,
    },
    /// Financier paid cash out to a site's customer.
    Withdrawal {
        site: EntityId,
        financier: EntityId,
        amount: Decimal,
    },
    /// Financier delivered funds to a site, no commission.
    SiteDelivery {
        site: EntityId,
        financier: EntityId,
        amount: Decimal,
    },
    /// Financier paid out a partner's accumulated commission.
    PartnerPayment {
        partner: EntityId,
        financier: EntityId,
        amount: Decimal,
    },
    /// Cash moved between two financiers.
    FinancierTransfer {
        source: EntityId,
        target: EntityId,
        amount: Decimal,
    },
    /// Financier borrowed from an external party.
    ExternalDebtIn {
        financier: EntityId,
        party: EntityId,
        amount: Decimal,
    },
    /// Financier lent to an external party.
    ExternalDebtOut {
        financier: EntityId,
        party: EntityId,
        amount: Decimal,
    },
    /// Financier settled a debt owed to an external party.
    ExternalPayment {
        financier: EntityId,
        party: EntityId,
        amount: Decimal,
    },
    /// Financier paid an organization expense.
    OrgExpense { financier: EntityId, amount: Decimal },
    /// Financier collected organization income.
    OrgIncome { financier: EntityId, amount: Decimal },
    /// Organization funds withdrawn through a financier.
    OrgWithdraw { financier: EntityId, amount: Decimal },
    /// Financier paid an arbitrary counterparty account.
    Payment {
        source: AccountId,
        financier: EntityId,
        amount: Decimal,
    },
    /// Financier received funds from a counterparty, or from the
    /// organization when the source is unknown.
    TopUp {
        financier: EntityId,
        source: Option<AccountId>,
        amount: Decimal,
    },
    /// Commissioned delivery through a financier.
    Delivery {
        site: EntityId,
        financier: EntityId,
        amount: Decimal,
    },
}

impl TransactionIntent {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionIntent::Deposit { .. } => TransactionKind::Deposit,
            TransactionIntent::Withdrawal { .. } => TransactionKind::Withdrawal,
            TransactionIntent::SiteDelivery { .. } => TransactionKind::SiteDelivery,
            TransactionIntent::PartnerPayment { .. } => TransactionKind::PartnerPayment,
            TransactionIntent::FinancierTransfer { .. } => TransactionKind::FinancierTransfer,
            TransactionIntent::ExternalDebtIn { .. } => TransactionKind::ExternalDebtIn,
            TransactionIntent::ExternalDebtOut { .. } => TransactionKind::ExternalDebtOut,
            TransactionIntent::ExternalPayment { .. } => TransactionKind::ExternalPayment,
            TransactionIntent::OrgExpense { .. } => TransactionKind::OrgExpense,
            TransactionIntent::OrgIncome { .. } => TransactionKind::OrgIncome,
            TransactionIntent::OrgWithdraw { .. } => TransactionKind::OrgWithdraw,
            TransactionIntent::Payment { .. } => TransactionKind::Payment,
            TransactionIntent::TopUp { .. } => TransactionKind::TopUp,
            TransactionIntent::Delivery { .. } => TransactionKind::Delivery,
        }
    }

    pub fn gross_amount(&self) -> Decimal {
        match self {
            TransactionIntent::Deposit { amount, .. }
            | TransactionIntent::Withdrawal { amount, .. }
            | TransactionIntent::SiteDelivery { amount, .. }
            | TransactionIntent::PartnerPayment { amount, .. }
            | TransactionIntent::FinancierTransfer { amount, .. }
            | TransactionIntent::ExternalDebtIn { amount, .. }
            | TransactionIntent::ExternalDebtOut { amount, .. }
            | TransactionIntent::ExternalPayment { amount, .. }
            | TransactionIntent::OrgExpense { amount, .. }
            | TransactionIntent::OrgIncome { amount, .. }
            | TransactionIntent::OrgWithdraw { amount, .. }
            | TransactionIntent::Payment { amount, .. }
            | TransactionIntent::TopUp { amount, .. }
            | TransactionIntent::Delivery { amount, .. } => *amount,
        }
    }

    /// The financier account whose available balance this intent debits, if
    /// any. DEPOSIT, TOP_UP, ORG_INCOME and EXTERNAL_DEBT_IN only add money
    /// and are never balance-checked.
    pub fn checked_account(&self) -> Option<AccountId> {
        match self {
            TransactionIntent::Deposit { .. }
            | TransactionIntent::TopUp { .. }
            | TransactionIntent::OrgIncome { .. }
            | TransactionIntent::ExternalDebtIn { .. } => None,
            TransactionIntent::FinancierTransfer { source, .. } => {
                Some(AccountId::financier(source.0))
            }
            TransactionIntent::Withdrawal { financier, .. }
            | TransactionIntent::SiteDelivery { financier, .. }
            | TransactionIntent::PartnerPayment { financier, .. }
            | TransactionIntent::ExternalDebtOut { financier, .. }
            | TransactionIntent::ExternalPayment { financier, .. }
            | TransactionIntent::OrgExpense { financier, .. }
            | TransactionIntent::OrgWithdraw { financier, .. }
            | TransactionIntent::Payment { financier, .. }
            | TransactionIntent::Delivery { financier, .. } => {
                Some(AccountId::financier(financier.0))
            }
        }
    }

    /// Accounts this intent references directly. Partner accounts coming
    /// from a commission split are resolved separately by the processor.
    pub fn participants(&self) -> Vec<AccountId> {
        match *self {
            TransactionIntent::Deposit {
                site, financier, ..
            }
            | TransactionIntent::Withdrawal {
                site, financier, ..
            }
            | TransactionIntent::SiteDelivery {
                site, financier, ..
            }
            | TransactionIntent::Delivery {
                site, financier, ..
            } => vec![
                AccountId::site(site.0),
                AccountId::financier(financier.0),
                AccountId::organization(),
            ],
            TransactionIntent::PartnerPayment {
                partner, financier, ..
            } => vec![
                AccountId::partner(partner.0),
                AccountId::financier(financier.0),
            ],
            TransactionIntent::FinancierTransfer { source, target, .. } => vec![
                AccountId::financier(source.0),
                AccountId::financier(target.0),
            ],
            TransactionIntent::ExternalDebtIn {
                financier, party, ..
            }
            | TransactionIntent::ExternalDebtOut {
                financier, party, ..
            }
            | TransactionIntent::ExternalPayment {
                financier, party, ..
            } => vec![
                AccountId::financier(financier.0),
                AccountId::external_party(party.0),
            ],
            TransactionIntent::OrgExpense { financier, .. }
            | TransactionIntent::OrgIncome { financier, .. }
            | TransactionIntent::OrgWithdraw { financier, .. } => vec![
                AccountId::financier(financier.0),
                AccountId::organization(),
            ],
            TransactionIntent::Payment {
                source, financier, ..
            } => vec![source, AccountId::financier(financier.0)],
            TransactionIntent::TopUp {
                financier, source, ..
            } => {
                let mut accounts = vec![AccountId::financier(financier.0)];
                accounts.push(source.unwrap_or_else(AccountId::organization));
                accounts
            }
        }
    }
}
