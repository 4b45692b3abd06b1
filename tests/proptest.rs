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

//! Property-based tests for the ledger engine.
//!
//! These tests verify invariants that should hold for any sequence of
//! valid transactions.

use cashbook::{
    AccountBook, AccountId, Actor, EntityId, EntityType, Ledger, Processor, RateTable,
    TransactionIntent, TransactionKind, TransactionStore,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// =============================================================================
// Arbitrary Strategies
// =============================================================================

/// Generate a positive amount (0.01 to 10000.00, two decimal places).
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Generate a commission rate between 0% and 8% with four decimal places.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (0i64..=800i64).prop_map(|basis| Decimal::new(basis, 4))
}

/// Generate an intent over a small fixed set of actors.
fn arb_intent() -> impl Strategy<Value = TransactionIntent> {
    (0u8..8, arb_amount()).prop_map(|(selector, amount)| match selector {
        0 => TransactionIntent::Deposit {
            site: EntityId(1),
            financier: EntityId(2),
            amount,
        },
        1 => TransactionIntent::Withdrawal {
            site: EntityId(1),
            financier: EntityId(2),
            amount,
        },
        2 => TransactionIntent::SiteDelivery {
            site: EntityId(1),
            financier: EntityId(2),
            amount,
        },
        3 => TransactionIntent::FinancierTransfer {
            source: EntityId(2),
            target: EntityId(3),
            amount,
        },
        4 => TransactionIntent::TopUp {
            financier: EntityId(2),
            source: None,
            amount,
        },
        5 => TransactionIntent::ExternalDebtIn {
            financier: EntityId(3),
            party: EntityId(6),
            amount,
        },
        6 => TransactionIntent::OrgIncome {
            financier: EntityId(2),
            amount,
        },
        _ => TransactionIntent::PartnerPayment {
            partner: EntityId(5),
            financier: EntityId(3),
            amount,
        },
    })
}

fn setup() -> Processor {
    let accounts = Arc::new(AccountBook::new());
    for account_id in [
        AccountId::site(1),
        AccountId::financier(2),
        AccountId::financier(3),
        AccountId::partner(5),
        AccountId::external_party(6),
    ] {
        accounts.register(account_id);
    }
    Processor::new(
        Arc::new(Ledger::new(accounts)),
        Arc::new(TransactionStore::new()),
    )
}

fn total_balance(processor: &Processor) -> Decimal {
    processor
        .ledger()
        .accounts()
        .iter()
        .map(|account| account.balance())
        .sum()
}

// =============================================================================
// Money Conservation
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Balances always sum to zero, whatever sequence of intents runs and
    /// however many of them are rejected.
    #[test]
    fn balances_sum_to_zero(intents in prop::collection::vec(arb_intent(), 1..40)) {
        let processor = setup();
        let actor = Actor::admin("prop");

        for intent in intents {
            let _ = processor.process(intent, &actor);
        }

        prop_assert_eq!(total_balance(&processor), Decimal::ZERO);

        // Debiting recipes are balance-checked, so no financier is ever
        // spent below zero.
        for account in processor.ledger().accounts().iter() {
            if account.account_id().entity_type == EntityType::Financier {
                prop_assert!(account.available() >= Decimal::ZERO);
            }
        }
    }

    /// Every account balance equals the sum of its signed journal entries.
    #[test]
    fn balance_equals_journal_sum(intents in prop::collection::vec(arb_intent(), 1..40)) {
        let processor = setup();
        let actor = Actor::admin("prop");

        for intent in intents {
            let _ = processor.process(intent, &actor);
        }

        let ledger = processor.ledger();
        for account in ledger.accounts().iter() {
            let account_id = account.account_id();
            let entry_sum: Decimal = ledger
                .entries_for_account(account_id)
                .iter()
                .map(|entry| entry.signed_amount())
                .sum();
            prop_assert_eq!(account.balance(), entry_sum);
        }
    }

    /// A rejected intent leaves no trace in the journal.
    #[test]
    fn rejection_writes_nothing(amount in arb_amount()) {
        let processor = setup();
        let actor = Actor::admin("prop");

        // An empty financier can never cover a withdrawal.
        let result = processor.process(
            TransactionIntent::Withdrawal {
                site: EntityId(1),
                financier: EntityId(2),
                amount,
            },
            &actor,
        );

        prop_assert!(result.is_err());
        prop_assert_eq!(processor.ledger().entry_count(), 0);
        prop_assert!(processor.store().is_empty());
    }
}

// =============================================================================
// Commission Splits
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The deposit split always satisfies
    /// `organization = site - partners - financier` after rounding, so the
    /// posting recipe balances exactly.
    #[test]
    fn deposit_split_identity(
        amount in arb_amount(),
        site_rate in arb_rate(),
        financier_rate in arb_rate(),
        partner_rate in arb_rate(),
    ) {
        let rates = RateTable::new()
            .with_site_rate(EntityId(1), site_rate)
            .with_financier_rate(EntityId(2), financier_rate)
            .with_partner_share(EntityId(1), EntityId(5), partner_rate);

        let result = cashbook::CommissionCalculator::calculate(
            &rates,
            TransactionKind::Deposit,
            Some(EntityId(1)),
            EntityId(2),
            amount,
        );

        // Rates drawn independently can make the remainder negative; those
        // configurations are rejected rather than silently unbalancing.
        if let Ok(snapshot) = result {
            prop_assert_eq!(
                snapshot.organization_amount,
                snapshot.site_amount - snapshot.partner_total() - snapshot.financier_amount
            );
            prop_assert!(snapshot.organization_amount >= Decimal::ZERO);
        }
    }

    /// Deposits processed under any accepted rate table conserve money.
    #[test]
    fn commissioned_deposits_conserve(
        amounts in prop::collection::vec(arb_amount(), 1..10),
        site_rate in arb_rate(),
        partner_rate in arb_rate(),
    ) {
        let rates = RateTable::new()
            .with_site_rate(EntityId(1), site_rate)
            .with_partner_share(EntityId(1), EntityId(5), partner_rate);
        let processor = setup().with_calculator(Arc::new(rates));
        let actor = Actor::admin("prop");

        for amount in amounts {
            let _ = processor.process(
                TransactionIntent::Deposit {
                    site: EntityId(1),
                    financier: EntityId(2),
                    amount,
                },
                &actor,
            );
        }

        prop_assert_eq!(total_balance(&processor), Decimal::ZERO);
    }
}

// =============================================================================
// Reversals
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Reversing a deposit restores every balance to its prior state.
    #[test]
    fn reversal_is_an_exact_inverse(
        amount in arb_amount(),
        site_rate in arb_rate(),
    ) {
        let rates = RateTable::new().with_site_rate(EntityId(1), site_rate);
        let processor = setup().with_calculator(Arc::new(rates));
        let actor = Actor::admin("prop");

        let before: Vec<(AccountId, Decimal)> = processor
            .ledger()
            .accounts()
            .iter()
            .map(|account| (account.account_id(), account.balance()))
            .collect();

        let transaction = processor
            .process(
                TransactionIntent::Deposit {
                    site: EntityId(1),
                    financier: EntityId(2),
                    amount,
                },
                &actor,
            )
            .unwrap();
        processor.reverse(transaction.id, "prop", &actor).unwrap();

        for (account_id, balance) in before {
            prop_assert_eq!(processor.ledger().balance_of(account_id), Some(balance));
        }
    }
}
