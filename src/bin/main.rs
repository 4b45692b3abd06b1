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

use cashbook::{
    AccountBook, AccountId, Actor, CommissionCalculator, EntityId, Ledger, Processor, RateTable,
    TransactionIntent, TransactionStore,
};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Cashbook - Process transaction CSV files
///
/// Reads business transactions from a CSV file, applies them through the
/// double-entry ledger and outputs account states to stdout.
#[derive(Parser, Debug)]
#[command(name = "cashbook")]
#[command(about = "A double-entry ledger that processes transaction CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with transactions
    ///
    /// Expected format: type,amount,site,financier,partner,party,source,target
    /// Example: cargo run -- transactions.csv > accounts.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Site commission rate as a fraction of the gross amount (0.06 = 6%)
    #[arg(long, default_value = "0")]
    site_rate: Decimal,

    /// Financier commission rate as a fraction of the gross amount
    #[arg(long, default_value = "0")]
    financier_rate: Decimal,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let rates = RateTable::new()
        .with_default_site_rate(args.site_rate)
        .with_default_financier_rate(args.financier_rate);

    let processor = match process_transactions(BufReader::new(file), Arc::new(rates)) {
        Ok(processor) => processor,
        Err(e) => {
            eprintln!("Error processing transactions: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_accounts(&processor, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, amount, site, financier, partner, party, source, target`.
/// Only the fields a kind needs have to be filled in; `source` is either a
/// financier id (financier_transfer) or an `entity_type:id` account
/// reference (payment, top_up).
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    site: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    financier: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    partner: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    party: Option<u32>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    target: Option<u32>,
}

impl CsvRecord {
    /// Converts a CSV record to a transaction intent.
    ///
    /// Returns `None` for unknown kinds or missing required fields.
    fn into_intent(self) -> Option<TransactionIntent> {
        let amount = self.amount?;

        match self.kind.to_lowercase().as_str() {
            "deposit" => Some(TransactionIntent::Deposit {
                site: EntityId(self.site?),
                financier: EntityId(self.financier?),
                amount,
            }),
            "withdrawal" => Some(TransactionIntent::Withdrawal {
                site: EntityId(self.site?),
                financier: EntityId(self.financier?),
                amount,
            }),
            "site_delivery" => Some(TransactionIntent::SiteDelivery {
                site: EntityId(self.site?),
                financier: EntityId(self.financier?),
                amount,
            }),
            "partner_payment" => Some(TransactionIntent::PartnerPayment {
                partner: EntityId(self.partner?),
                financier: EntityId(self.financier?),
                amount,
            }),
            "financier_transfer" => {
                let source: u32 = self.source.as_deref()?.trim().parse().ok()?;
                Some(TransactionIntent::FinancierTransfer {
                    source: EntityId(source),
                    target: EntityId(self.target?),
                    amount,
                })
            }
            "external_debt_in" => Some(TransactionIntent::ExternalDebtIn {
                financier: EntityId(self.financier?),
                party: EntityId(self.party?),
                amount,
            }),
            "external_debt_out" => Some(TransactionIntent::ExternalDebtOut {
                financier: EntityId(self.financier?),
                party: EntityId(self.party?),
                amount,
            }),
            "external_payment" => Some(TransactionIntent::ExternalPayment {
                financier: EntityId(self.financier?),
                party: EntityId(self.party?),
                amount,
            }),
            "org_expense" => Some(TransactionIntent::OrgExpense {
                financier: EntityId(self.financier?),
                amount,
            }),
            "org_income" => Some(TransactionIntent::OrgIncome {
                financier: EntityId(self.financier?),
                amount,
            }),
            "org_withdraw" => Some(TransactionIntent::OrgWithdraw {
                financier: EntityId(self.financier?),
                amount,
            }),
            "payment" => Some(TransactionIntent::Payment {
                source: parse_account(self.source.as_deref()?)?,
                financier: EntityId(self.financier?),
                amount,
            }),
            "top_up" => Some(TransactionIntent::TopUp {
                financier: EntityId(self.financier?),
                source: self.source.as_deref().and_then(parse_account),
                amount,
            }),
            "delivery" => Some(TransactionIntent::Delivery {
                site: EntityId(self.site?),
                financier: EntityId(self.financier?),
                amount,
            }),
            _ => None,
        }
    }
}

/// Parses an `entity_type:id` account reference, e.g. `site:3`.
fn parse_account(text: &str) -> Option<AccountId> {
    let (kind, id) = text.trim().split_once(':')?;
    let id: u32 = id.parse().ok()?;
    match kind {
        "site" => Some(AccountId::site(id)),
        "financier" => Some(AccountId::financier(id)),
        "partner" => Some(AccountId::partner(id)),
        "external_party" => Some(AccountId::external_party(id)),
        "organization" => Some(AccountId::organization()),
        _ => None,
    }
}

/// Process transactions from a CSV reader.
///
/// Streaming: rows are processed as they are read. Accounts are registered
/// on first reference, since the CSV carries no separate registration step.
/// Malformed rows and rejected transactions are skipped; rejections are
/// logged through tracing.
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_transactions<R: Read>(
    reader: R,
    calculator: Arc<dyn CommissionCalculator>,
) -> Result<Processor, csv::Error> {
    let accounts = Arc::new(AccountBook::new());
    let ledger = Arc::new(Ledger::new(accounts.clone()));
    let store = Arc::new(TransactionStore::new());
    let processor = Processor::new(ledger, store).with_calculator(calculator);
    let actor = Actor::admin("cli");

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some(intent) = record.into_intent() else {
                    tracing::warn!("skipping invalid transaction record");
                    continue;
                };

                for account_id in intent.participants() {
                    accounts.register(account_id);
                }

                if let Err(e) = processor.process(intent, &actor) {
                    tracing::warn!(error = %e, "skipping rejected transaction");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed row");
                continue;
            }
        }
    }

    Ok(processor)
}

/// Write account states to a CSV writer.
///
/// Columns: `entity_type, entity_id, balance, blocked, available`, one row
/// per account in ascending account id order.
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_accounts<W: Write>(processor: &Processor, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut accounts: Vec<_> = processor.ledger().accounts().iter().collect();
    accounts.sort_by_key(|account| account.account_id());

    for account in accounts {
        wtr.serialize(&*account)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashbook::NoCommission;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn run(csv: &str) -> Processor {
        process_transactions(Cursor::new(csv), Arc::new(NoCommission)).unwrap()
    }

    #[test]
    fn parse_simple_deposit() {
        let processor = run(
            "type,amount,site,financier,partner,party,source,target\n\
             deposit,100.00,1,2,,,,\n",
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(2)),
            Some(dec!(100.00))
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::site(1)),
            Some(dec!(-100.00))
        );
    }

    #[test]
    fn parse_deposit_and_site_delivery() {
        let processor = run(
            "type,amount,site,financier,partner,party,source,target\n\
             deposit,100.00,1,2,,,,\n\
             site_delivery,40.00,1,2,,,,\n",
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(2)),
            Some(dec!(60.00))
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::site(1)),
            Some(dec!(-60.00))
        );
    }

    #[test]
    fn parse_financier_transfer() {
        let processor = run(
            "type,amount,site,financier,partner,party,source,target\n\
             deposit,100.00,1,2,,,,\n\
             financier_transfer,30.00,,,,,2,4\n",
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(2)),
            Some(dec!(70.00))
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(4)),
            Some(dec!(30.00))
        );
    }

    #[test]
    fn parse_top_up_with_account_reference() {
        let processor = run(
            "type,amount,site,financier,partner,party,source,target\n\
             top_up,25.00,,7,,,organization:0,\n",
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(7)),
            Some(dec!(25.00))
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::organization()),
            Some(dec!(-25.00))
        );
    }

    #[test]
    fn skip_malformed_and_rejected_rows() {
        let processor = run(
            "type,amount,site,financier,partner,party,source,target\n\
             deposit,100.00,1,2,,,,\n\
             nonsense,1.00,,,,,,\n\
             withdrawal,500.00,1,2,,,,\n",
        );
        // The over-balance withdrawal is rejected; the deposit stands.
        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(2)),
            Some(dec!(100.00))
        );
        assert_eq!(processor.store().len(), 1);
    }

    #[test]
    fn commission_rates_flow_through() {
        let rates = RateTable::new()
            .with_default_site_rate(dec!(0.06))
            .with_default_financier_rate(dec!(0.025));
        let processor = process_transactions(
            Cursor::new(
                "type,amount,site,financier,partner,party,source,target\n\
                 deposit,100.00,1,2,,,,\n",
            ),
            Arc::new(rates),
        )
        .unwrap();

        assert_eq!(
            processor.ledger().balance_of(AccountId::financier(2)),
            Some(dec!(97.50))
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::site(1)),
            Some(dec!(-94.00))
        );
        assert_eq!(
            processor.ledger().balance_of(AccountId::organization()),
            Some(dec!(-3.50))
        );
    }

    #[test]
    fn write_accounts_to_csv() {
        let processor = run(
            "type,amount,site,financier,partner,party,source,target\n\
             deposit,100.50,1,2,,,,\n",
        );

        let mut output = Vec::new();
        write_accounts(&processor, &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("entity_type,entity_id,balance,blocked,available"));
        assert!(output_str.contains("financier,2,100.50,0,100.50"));
    }

    #[test]
    fn parse_account_references() {
        assert_eq!(parse_account("site:3"), Some(AccountId::site(3)));
        assert_eq!(parse_account(" financier:1 "), Some(AccountId::financier(1)));
        assert_eq!(parse_account("organization:0"), Some(AccountId::organization()));
        assert_eq!(parse_account("nonsense:1"), None);
        assert_eq!(parse_account("site"), None);
    }
}
