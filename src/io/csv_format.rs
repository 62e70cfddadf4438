//! CSV format handling for journal commands and report output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to journal commands
//! - Report row types and their CSV serialization
//!
//! All functions are pure (no file I/O) for easy testing.
//!
//! # Journal columns
//!
//! `type,user,other,group,amount,split,shares,note`. Unused columns may be
//! left empty or omitted at the end of a row.

use crate::types::money::format_money;
use crate::types::{JournalCommand, JournalShare, LedgerError, Money, SplitPolicy};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Separator between the entries of the `shares` column
pub const SHARE_SEPARATOR: char = ';';

/// Separator between a username and its value inside one share
pub const VALUE_SEPARATOR: char = ':';

/// Raw journal row as it appears in the CSV
///
/// Every column after `type` is optional so rows may stop early; a missing
/// trailing column reads as `None`, the same as an empty one.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: Option<String>,
    pub other: Option<String>,
    pub group: Option<String>,
    pub amount: Option<String>,
    pub split: Option<String>,
    pub shares: Option<String>,
    pub note: Option<String>,
}

/// Convert a raw row into a journal command
///
/// # Errors
///
/// Returns a message naming the row type and the offending field when the
/// type is unknown, a required column is empty, or an amount, share value or
/// split policy cannot be parsed.
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<JournalCommand, String> {
    let kind = csv_record.kind.trim().to_lowercase();

    match kind.as_str() {
        "user" => {
            let username = required(column(&csv_record.user), "user", &kind)?;
            let email = match column(&csv_record.other) {
                "" => format!("{}@localhost", username),
                other => other.to_string(),
            };
            let full_name = match column(&csv_record.note) {
                "" => username.clone(),
                note => note.to_string(),
            };
            Ok(JournalCommand::RegisterUser {
                username,
                email,
                full_name,
            })
        }
        "friend" | "unfriend" => {
            let user = required(column(&csv_record.user), "user", &kind)?;
            let friend = required(column(&csv_record.other), "other", &kind)?;
            Ok(if kind == "friend" {
                JournalCommand::AddFriend { user, friend }
            } else {
                JournalCommand::RemoveFriend { user, friend }
            })
        }
        "group" => Ok(JournalCommand::CreateGroup {
            name: required(column(&csv_record.group), "group", &kind)?,
            creator: required(column(&csv_record.user), "user", &kind)?,
            members: parse_names(column(&csv_record.shares)),
            description: column(&csv_record.note).to_string(),
        }),
        "member" => Ok(JournalCommand::AddMember {
            group: required(column(&csv_record.group), "group", &kind)?,
            user: required(column(&csv_record.user), "user", &kind)?,
        }),
        "expense" => {
            let policy = match column(&csv_record.split) {
                "" => SplitPolicy::Equal,
                split => SplitPolicy::from_str(split).map_err(|e| e.to_string())?,
            };
            Ok(JournalCommand::Expense {
                group: required(column(&csv_record.group), "group", &kind)?,
                payer: required(column(&csv_record.user), "user", &kind)?,
                amount: parse_amount(column(&csv_record.amount), &kind)?,
                policy,
                participants: parse_shares(column(&csv_record.shares))?,
                description: column(&csv_record.note).to_string(),
            })
        }
        "settle" => {
            let note = column(&csv_record.note);
            Ok(JournalCommand::Settle {
                group: required(column(&csv_record.group), "group", &kind)?,
                debtor: required(column(&csv_record.user), "user", &kind)?,
                creditor: required(column(&csv_record.other), "other", &kind)?,
                amount: parse_amount(column(&csv_record.amount), &kind)?,
                note: (!note.is_empty()).then(|| note.to_string()),
            })
        }
        _ => Err(format!("Invalid command type: '{}'", csv_record.kind)),
    }
}

/// Trimmed text of an optional column, empty when absent
fn column(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or_default()
}

fn required(value: &str, name: &str, kind: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("'{}' row is missing the '{}' column", kind, name))
    } else {
        Ok(value.to_string())
    }
}

fn parse_amount(amount: &str, kind: &str) -> Result<Money, String> {
    if amount.is_empty() {
        return Err(format!("'{}' row requires an amount", kind));
    }
    Decimal::from_str(amount).map_err(|_| format!("Invalid amount '{}' for '{}' row", amount, kind))
}

fn parse_names(names: &str) -> Vec<String> {
    names
        .split(SHARE_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `a;b;c` or `a:30.00;b:60.00`
pub fn parse_shares(shares: &str) -> Result<Vec<JournalShare>, String> {
    shares
        .split(SHARE_SEPARATOR)
        .map(str::trim)
        .filter(|share| !share.is_empty())
        .map(|share| match share.split_once(VALUE_SEPARATOR) {
            None => Ok((share.to_string(), None)),
            Some((name, value)) => {
                let value = Decimal::from_str(value.trim())
                    .map_err(|_| format!("Invalid share value '{}' for '{}'", value, name))?;
                Ok((name.trim().to_string(), Some(value)))
            }
        })
        .collect()
}

/// One line of the `balances` report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    pub group: String,
    pub user: String,
    pub balance: Money,
}

/// One line of the `debts` report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtRow {
    pub group: String,
    pub debtor: String,
    pub creditor: String,
    pub amount: Money,
}

/// One line of the `wallets` report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletRow {
    pub user: String,
    pub balance: Money,
}

fn write_error(what: &str, e: impl std::fmt::Display) -> LedgerError {
    LedgerError::IoError {
        message: format!("Failed to write {}: {}", what, e),
    }
}

/// Write group balances, sorted by group name then username
pub fn write_balances_csv(rows: &[BalanceRow], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["group", "user", "balance"])
        .map_err(|e| write_error("CSV header", e))?;

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.user.cmp(&b.user)));

    for row in sorted {
        writer
            .write_record([row.group, row.user, format_money(row.balance)])
            .map_err(|e| write_error("balance record", e))?;
    }

    writer.flush().map_err(|e| write_error("output", e))?;
    Ok(())
}

/// Write settlement plans in the order given
pub fn write_debts_csv(rows: &[DebtRow], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["group", "debtor", "creditor", "amount"])
        .map_err(|e| write_error("CSV header", e))?;

    for row in rows {
        writer
            .write_record([
                row.group.as_str(),
                row.debtor.as_str(),
                row.creditor.as_str(),
                format_money(row.amount).as_str(),
            ])
            .map_err(|e| write_error("debt record", e))?;
    }

    writer.flush().map_err(|e| write_error("output", e))?;
    Ok(())
}

/// Write wallet balances, sorted by username
pub fn write_wallets_csv(rows: &[WalletRow], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["user", "balance"])
        .map_err(|e| write_error("CSV header", e))?;

    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| a.user.cmp(&b.user));

    for row in sorted {
        writer
            .write_record([row.user, format_money(row.balance)])
            .map_err(|e| write_error("wallet record", e))?;
    }

    writer.flush().map_err(|e| write_error("output", e))?;
    Ok(())
}
