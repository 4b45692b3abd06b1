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

//! Transaction processor: one posting recipe per transaction kind.
//!
//! Every recipe follows the same shape: validate the amount, resolve the
//! referenced accounts, check the debited financier's available balance,
//! calculate the commission split where the kind carries one, consult the
//! approval gate, and either persist a PENDING transaction with zero ledger
//! effect or build the balanced posting set and hand it to the ledger
//! engine.
//!
//! Each recipe's debit total equals its credit total by construction; the
//! ledger engine re-verifies that before applying anything.

use crate::approval::{Actor, ApprovalGate, AutoApprove};
use crate::base::{AccountId, TransactionId};
use crate::commission::{CommissionCalculator, CommissionSnapshot, NoCommission};
use crate::entry::Posting;
use crate::error::LedgerError;
use crate::hooks::{AuditSink, Notifier, NullAudit, NullNotifier};
use crate::ledger::{BalanceCheck, Ledger};
use crate::store::TransactionStore;
use crate::transaction::{Transaction, TransactionIntent, TransactionKind, TransactionStatus};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;

/// Orchestrates recipes over the ledger engine, transaction store and the
/// collaborator contracts.
pub struct Processor {
    ledger: Arc<Ledger>,
    store: Arc<TransactionStore>,
    calculator: Arc<dyn CommissionCalculator>,
    gate: Arc<dyn ApprovalGate>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
}

impl Processor {
    /// Creates a processor with no commission, no approval gating and no
    /// notification/audit delivery. Collaborators are swapped in with the
    /// `with_*` builders.
    pub fn new(ledger: Arc<Ledger>, store: Arc<TransactionStore>) -> Self {
        Self {
            ledger,
            store,
            calculator: Arc::new(NoCommission),
            gate: Arc::new(AutoApprove),
            notifier: Arc::new(NullNotifier),
            audit: Arc::new(NullAudit),
        }
    }

    pub fn with_calculator(mut self, calculator: Arc<dyn CommissionCalculator>) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn with_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    /// Processes a business intent into a transaction.
    ///
    /// Returns the persisted transaction: COMPLETED with its postings
    /// applied, or PENDING with zero ledger effect when the approval gate
    /// requires an out-of-band approval.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - non-positive or over-precise amount.
    /// - [`LedgerError::NotFound`] - a referenced actor is not registered.
    /// - [`LedgerError::InsufficientBalance`] - a debiting kind exceeds the
    ///   financier's `balance - blocked`.
    pub fn process(
        &self,
        intent: TransactionIntent,
        actor: &Actor,
    ) -> Result<Transaction, LedgerError> {
        let amount = intent.gross_amount();
        validate_amount(amount)?;
        let kind = intent.kind();
        let accounts = self.ledger.accounts();

        for account_id in intent.participants() {
            accounts.resolve(account_id)?;
        }

        // Fail fast before commission work. The authoritative check runs
        // again inside the apply lock scope.
        let check = intent.checked_account().map(|account_id| BalanceCheck {
            account_id,
            requested: amount,
        });
        if let Some(check) = &check {
            let available = accounts.resolve(check.account_id)?.available();
            if check.requested > available {
                return Err(LedgerError::InsufficientBalance {
                    available,
                    requested: check.requested,
                });
            }
        }

        let commission = if kind.carries_commission() {
            let (site, financier) = match &intent {
                TransactionIntent::Deposit {
                    site, financier, ..
                }
                | TransactionIntent::Withdrawal {
                    site, financier, ..
                }
                | TransactionIntent::Delivery {
                    site, financier, ..
                } => (Some(*site), *financier),
                _ => (None, crate::base::EntityId(0)),
            };
            let snapshot = self.calculator.calculate(kind, site, financier, amount)?;
            snapshot.verify()?;
            // Partner accounts named by the split are participants too.
            for share in &snapshot.partners {
                accounts.resolve(AccountId::partner(share.partner.0))?;
            }
            Some(snapshot)
        } else {
            None
        };

        let id = self.store.allocate_id();
        let mut transaction = build_record(id, &intent, actor, commission.clone());

        if self.gate.requires_approval(kind, actor.role) {
            transaction.status = TransactionStatus::Pending;
            self.store.insert(transaction.clone())?;
            // Best effort: a failing notifier never rolls the PENDING
            // transaction back.
            self.notifier.notify_admins(&format!(
                "transaction {id} ({kind}, {amount}) awaits approval"
            ));
            self.record_audit("create", &transaction, actor);
            tracing::info!(
                transaction = %id,
                kind = %kind,
                gross = %amount,
                "transaction pending approval"
            );
            return Ok(transaction);
        }

        let (postings, net_amount) = build_postings(&intent, commission.as_ref());
        transaction.net_amount = net_amount;
        let checks: Vec<BalanceCheck> = check.into_iter().collect();
        self.ledger.apply_checked(id, &postings, &checks)?;

        transaction.status = TransactionStatus::Completed;
        self.store.insert(transaction.clone())?;
        self.record_audit("create", &transaction, actor);
        tracing::info!(
            transaction = %id,
            kind = %kind,
            gross = %amount,
            "transaction completed"
        );
        Ok(transaction)
    }

    /// Reverses a completed transaction: appends mirrored postings under a
    /// new REVERSAL transaction and marks the original REVERSED.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - unknown transaction id.
    /// - [`LedgerError::AlreadyReversed`] - the target was reversed before.
    /// - [`LedgerError::NotReversible`] - the target is not COMPLETED, or
    ///   is itself a reversal.
    pub fn reverse(
        &self,
        transaction_id: TransactionId,
        reason: &str,
        actor: &Actor,
    ) -> Result<Transaction, LedgerError> {
        let record = self
            .store
            .get(transaction_id)
            .ok_or_else(|| LedgerError::not_found("transaction", transaction_id))?;

        // The record stays locked across the status check and the mirrored
        // apply, so a concurrent second reversal fails instead of posting
        // twice.
        let mut original = record.lock();
        match original.status {
            TransactionStatus::Reversed => {
                return Err(LedgerError::AlreadyReversed(transaction_id));
            }
            TransactionStatus::Completed if original.kind != TransactionKind::Reversal => {}
            _ => return Err(LedgerError::NotReversible(transaction_id)),
        }

        let postings: Vec<Posting> = self
            .ledger
            .entries_for(transaction_id)
            .iter()
            .map(Posting::mirror_of)
            .collect();
        if postings.is_empty() {
            return Err(LedgerError::NotReversible(transaction_id));
        }

        let reversal_id = self.store.allocate_id();
        self.ledger.apply(reversal_id, &postings)?;

        let now = Utc::now();
        original.status = TransactionStatus::Reversed;
        original.reversed_at = Some(now);
        original.reversal_reason = Some(reason.to_string());

        let reversal = Transaction {
            id: reversal_id,
            kind: TransactionKind::Reversal,
            status: TransactionStatus::Completed,
            gross_amount: original.gross_amount,
            net_amount: original.net_amount,
            site: original.site,
            financier: original.financier,
            partner: original.partner,
            external_party: original.external_party,
            source_entity: original.source_entity,
            transaction_date: now,
            created_by: actor.name.clone(),
            original_transaction_id: Some(transaction_id),
            reversal_reason: Some(reason.to_string()),
            reversed_at: None,
            commission: None,
        };
        self.store.insert(reversal.clone())?;
        drop(original);

        self.record_audit("reverse", &reversal, actor);
        tracing::info!(
            transaction = %reversal_id,
            original = %transaction_id,
            "transaction reversed"
        );
        Ok(reversal)
    }

    fn record_audit(&self, action: &str, transaction: &Transaction, actor: &Actor) {
        let after = serde_json::to_value(transaction).unwrap_or(Value::Null);
        self.audit.record(
            action,
            &format!("transaction:{}", transaction.id),
            Value::Null,
            after,
            &actor.name,
        );
    }
}

/// Positive, at most two decimal places.
fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO || amount.round_dp(2) != amount {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

fn build_record(
    id: TransactionId,
    intent: &TransactionIntent,
    actor: &Actor,
    commission: Option<CommissionSnapshot>,
) -> Transaction {
    let mut transaction = Transaction {
        id,
        kind: intent.kind(),
        status: TransactionStatus::Completed,
        gross_amount: intent.gross_amount(),
        net_amount: intent.gross_amount(),
        site: None,
        financier: None,
        partner: None,
        external_party: None,
        source_entity: None,
        transaction_date: Utc::now(),
        created_by: actor.name.clone(),
        original_transaction_id: None,
        reversal_reason: None,
        reversed_at: None,
        commission,
    };

    match *intent {
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
        } => {
            transaction.site = Some(site);
            transaction.financier = Some(financier);
        }
        TransactionIntent::PartnerPayment {
            partner, financier, ..
        } => {
            transaction.partner = Some(partner);
            transaction.financier = Some(financier);
        }
        TransactionIntent::FinancierTransfer { source, target, .. } => {
            transaction.financier = Some(target);
            transaction.source_entity = Some(AccountId::financier(source.0));
        }
        TransactionIntent::ExternalDebtIn {
            financier, party, ..
        }
        | TransactionIntent::ExternalDebtOut {
            financier, party, ..
        }
        | TransactionIntent::ExternalPayment {
            financier, party, ..
        } => {
            transaction.financier = Some(financier);
            transaction.external_party = Some(party);
        }
        TransactionIntent::OrgExpense { financier, .. }
        | TransactionIntent::OrgIncome { financier, .. }
        | TransactionIntent::OrgWithdraw { financier, .. } => {
            transaction.financier = Some(financier);
        }
        TransactionIntent::Payment {
            source, financier, ..
        } => {
            transaction.financier = Some(financier);
            transaction.source_entity = Some(source);
        }
        TransactionIntent::TopUp {
            financier, source, ..
        } => {
            transaction.financier = Some(financier);
            transaction.source_entity = source;
        }
    }

    transaction
}

/// Builds the posting set for an intent and returns it with the net amount.
///
/// Zero-amount legs (an empty commission, a partner with no share) are
/// omitted; they carry no information and the ledger rejects non-positive
/// amounts.
fn build_postings(
    intent: &TransactionIntent,
    commission: Option<&CommissionSnapshot>,
) -> (Vec<Posting>, Decimal) {
    let zero = CommissionSnapshot::zero();
    let split = commission.unwrap_or(&zero);
    let org = AccountId::organization();

    match *intent {
        // DEBIT financier(gross - financier_commission);
        // CREDIT site(gross - site_commission);
        // CREDIT each partner(share); CREDIT organization(remainder).
        TransactionIntent::Deposit {
            site,
            financier,
            amount,
        } => {
            let site_account = AccountId::site(site.0);
            let financier_account = AccountId::financier(financier.0);
            let net = amount - split.site_amount;
            let mut postings = vec![
                Posting::debit(
                    financier_account,
                    amount - split.financier_amount,
                    format!("deposit at site {site}"),
                ),
                Posting::credit(site_account, net, "deposit"),
            ];
            for share in &split.partners {
                if share.amount > Decimal::ZERO {
                    postings.push(Posting::credit(
                        AccountId::partner(share.partner.0),
                        share.amount,
                        format!("deposit commission, site {site}"),
                    ));
                }
            }
            if split.organization_amount > Decimal::ZERO {
                postings.push(Posting::credit(
                    org,
                    split.organization_amount,
                    format!("deposit commission, site {site}"),
                ));
            }
            (postings, net)
        }

        // DEBIT site(amount + site_commission); CREDIT financier(amount);
        // CREDIT organization(site_commission).
        TransactionIntent::Withdrawal {
            site,
            financier,
            amount,
        } => {
            let mut postings = vec![
                Posting::debit(
                    AccountId::site(site.0),
                    amount + split.site_amount,
                    "withdrawal",
                ),
                Posting::credit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("withdrawal at site {site}"),
                ),
            ];
            if split.site_amount > Decimal::ZERO {
                postings.push(Posting::credit(
                    org,
                    split.site_amount,
                    format!("withdrawal commission, site {site}"),
                ));
            }
            (postings, amount)
        }

        TransactionIntent::SiteDelivery {
            site,
            financier,
            amount,
        } => (
            vec![
                Posting::debit(AccountId::site(site.0), amount, "site delivery"),
                Posting::credit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("delivery to site {site}"),
                ),
            ],
            amount,
        ),

        TransactionIntent::PartnerPayment {
            partner,
            financier,
            amount,
        } => (
            vec![
                Posting::debit(AccountId::partner(partner.0), amount, "partner payment"),
                Posting::credit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("payment to partner {partner}"),
                ),
            ],
            amount,
        ),

        TransactionIntent::FinancierTransfer {
            source,
            target,
            amount,
        } => (
            vec![
                Posting::credit(
                    AccountId::financier(source.0),
                    amount,
                    format!("transfer to financier {target}"),
                ),
                Posting::debit(
                    AccountId::financier(target.0),
                    amount,
                    format!("transfer from financier {source}"),
                ),
            ],
            amount,
        ),

        TransactionIntent::ExternalDebtIn {
            financier,
            party,
            amount,
        } => (
            vec![
                Posting::debit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("debt taken from party {party}"),
                ),
                Posting::credit(AccountId::external_party(party.0), amount, "debt out"),
            ],
            amount,
        ),

        TransactionIntent::ExternalDebtOut {
            financier,
            party,
            amount,
        } => (
            vec![
                Posting::credit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("debt given to party {party}"),
                ),
                Posting::debit(AccountId::external_party(party.0), amount, "debt in"),
            ],
            amount,
        ),

        TransactionIntent::ExternalPayment {
            financier,
            party,
            amount,
        } => (
            vec![
                Posting::debit(AccountId::external_party(party.0), amount, "debt settled"),
                Posting::credit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("payment to party {party}"),
                ),
            ],
            amount,
        ),

        TransactionIntent::OrgExpense { financier, amount } => (
            vec![
                Posting::debit(org, amount, "organization expense"),
                Posting::credit(AccountId::financier(financier.0), amount, "expense paid"),
            ],
            amount,
        ),

        TransactionIntent::OrgIncome { financier, amount } => (
            vec![
                Posting::debit(
                    AccountId::financier(financier.0),
                    amount,
                    "income collected",
                ),
                Posting::credit(org, amount, "organization income"),
            ],
            amount,
        ),

        TransactionIntent::OrgWithdraw { financier, amount } => (
            vec![
                Posting::debit(org, amount, "organization withdrawal"),
                Posting::credit(AccountId::financier(financier.0), amount, "funds paid out"),
            ],
            amount,
        ),

        TransactionIntent::Payment {
            source,
            financier,
            amount,
        } => (
            vec![
                Posting::debit(source, amount, "payment received"),
                Posting::credit(
                    AccountId::financier(financier.0),
                    amount,
                    format!("payment to {source}"),
                ),
            ],
            amount,
        ),

        TransactionIntent::TopUp {
            financier,
            source,
            amount,
        } => {
            let counterparty = source.unwrap_or(org);
            (
                vec![
                    Posting::debit(AccountId::financier(financier.0), amount, "top up"),
                    Posting::credit(counterparty, amount, "top up source"),
                ],
                amount,
            )
        }

        // DEBIT site(net); DEBIT organization(org_commission, if > 0);
        // CREDIT partner(share, if > 0); CREDIT financier(gross).
        // The balance law forces net = gross + partners - organization.
        TransactionIntent::Delivery {
            site,
            financier,
            amount,
        } => {
            let net = amount + split.partner_total() - split.organization_amount;
            let mut postings = vec![Posting::debit(AccountId::site(site.0), net, "delivery")];
            if split.organization_amount > Decimal::ZERO {
                postings.push(Posting::debit(
                    org,
                    split.organization_amount,
                    format!("delivery commission, site {site}"),
                ));
            }
            for share in &split.partners {
                if share.amount > Decimal::ZERO {
                    postings.push(Posting::credit(
                        AccountId::partner(share.partner.0),
                        share.amount,
                        format!("delivery commission, site {site}"),
                    ));
                }
            }
            postings.push(Posting::credit(
                AccountId::financier(financier.0),
                amount,
                format!("delivery for site {site}"),
            ));
            (postings, net)
        }
    }
}
