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

//! Benchmarks for the ledger engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Single-threaded recipe processing
//! - Commissioned deposits against the rate table
//! - Multi-threaded processing over disjoint and overlapping accounts

use cashbook::{
    AccountBook, AccountId, Actor, EntityId, Ledger, Processor, RateTable, TransactionIntent,
    TransactionStore,
};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn engine(financiers: u32, sites: u32) -> Arc<Processor> {
    let accounts = Arc::new(AccountBook::new());
    for id in 1..=sites {
        accounts.register(AccountId::site(id));
    }
    for id in 1..=financiers {
        accounts.register(AccountId::financier(id));
    }
    let processor = Arc::new(Processor::new(
        Arc::new(Ledger::new(accounts)),
        Arc::new(TransactionStore::new()),
    ));
    let actor = Actor::admin("bench");
    for id in 1..=financiers {
        processor
            .process(
                TransactionIntent::TopUp {
                    financier: EntityId(id),
                    source: None,
                    amount: dec!(1000000.00),
                },
                &actor,
            )
            .unwrap();
    }
    processor
}

fn deposit(site: u32, financier: u32, amount: Decimal) -> TransactionIntent {
    TransactionIntent::Deposit {
        site: EntityId(site),
        financier: EntityId(financier),
        amount,
    }
}

// =============================================================================
// Single-Threaded Benchmarks
// =============================================================================

fn bench_single_deposit(c: &mut Criterion) {
    c.bench_function("single_deposit", |b| {
        let processor = engine(1, 1);
        let actor = Actor::admin("bench");
        b.iter(|| {
            processor
                .process(black_box(deposit(1, 1, dec!(100.00))), &actor)
                .unwrap();
        })
    });
}

fn bench_commissioned_deposit(c: &mut Criterion) {
    c.bench_function("commissioned_deposit", |b| {
        let rates = RateTable::new()
            .with_default_site_rate(dec!(0.06))
            .with_default_financier_rate(dec!(0.025));
        let accounts = Arc::new(AccountBook::new());
        accounts.register(AccountId::site(1));
        accounts.register(AccountId::financier(1));
        let processor = Processor::new(
            Arc::new(Ledger::new(accounts)),
            Arc::new(TransactionStore::new()),
        )
        .with_calculator(Arc::new(rates));
        let actor = Actor::admin("bench");
        b.iter(|| {
            processor
                .process(black_box(deposit(1, 1, dec!(100.00))), &actor)
                .unwrap();
        })
    });
}

fn bench_reversal(c: &mut Criterion) {
    c.bench_function("deposit_then_reverse", |b| {
        let processor = engine(1, 1);
        let actor = Actor::admin("bench");
        b.iter(|| {
            let transaction = processor
                .process(deposit(1, 1, dec!(100.00)), &actor)
                .unwrap();
            processor
                .reverse(black_box(transaction.id), "bench", &actor)
                .unwrap();
        })
    });
}

fn bench_deposit_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit_throughput");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let processor = engine(1, 1);
                let actor = Actor::admin("bench");
                for _ in 0..count {
                    processor.process(deposit(1, 1, dec!(10.00)), &actor).unwrap();
                }
            })
        });
    }

    group.finish();
}

// =============================================================================
// Concurrent Benchmarks
// =============================================================================

fn bench_concurrent_disjoint_accounts(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_disjoint");
    group.throughput(Throughput::Elements(1_000));

    group.bench_function("deposits_16_pairs", |b| {
        b.iter(|| {
            let processor = engine(16, 16);
            (0u32..1_000).into_par_iter().for_each(|i| {
                let pair = i % 16 + 1;
                let actor = Actor::admin("bench");
                processor
                    .process(deposit(pair, pair, dec!(10.00)), &actor)
                    .unwrap();
            });
        })
    });

    group.finish();
}

fn bench_concurrent_shared_site(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_shared_site");
    group.throughput(Throughput::Elements(1_000));

    // All recipes contend on site 1 and the organization account.
    group.bench_function("deposits_one_site", |b| {
        b.iter(|| {
            let processor = engine(16, 1);
            (0u32..1_000).into_par_iter().for_each(|i| {
                let financier = i % 16 + 1;
                let actor = Actor::admin("bench");
                processor
                    .process(deposit(1, financier, dec!(10.00)), &actor)
                    .unwrap();
            });
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_deposit,
    bench_commissioned_deposit,
    bench_reversal,
    bench_deposit_throughput,
    bench_concurrent_disjoint_accounts,
    bench_concurrent_shared_site,
);
criterion_main!(benches);
