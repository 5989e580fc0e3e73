//! Alipay statement export: a CSV table preceded by a fixed preamble whose
//! checkpoint line carries the provider's receipt banner. The file encoding
//! varies by export channel, so several are tried in order.

use std::path::Path;

use tally_core::{fields, Bill, Bills, ImportSettings, Money};

use crate::error::ImportError;
use crate::refund;
use crate::statement::{self, StatementRow};
use crate::warning::Warnings;

pub fn parse_file(path: &Path, settings: &ImportSettings) -> Result<Vec<StatementRow>, ImportError> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, settings)
}

/// Decodes and validates the export, returning its rows sorted by id.
pub fn parse_bytes(bytes: &[u8], settings: &ImportSettings) -> Result<Vec<StatementRow>, ImportError> {
    let cfg = &settings.alipay;
    for label in &cfg.encodings {
        let Some(text) = statement::decode_strict(bytes, label) else {
            continue;
        };
        let Some(table) = statement::after_checkpoint(&text, cfg.checkpoint_line, &cfg.marker)
        else {
            continue;
        };
        match statement::read_table(table, &cfg.id_column) {
            Ok(rows) => {
                tracing::debug!("alipay statement decoded as {label}: {} rows", rows.len());
                return Ok(rows);
            }
            Err(e) => tracing::debug!("alipay table unreadable as {label}: {e}"),
        }
    }
    Err(ImportError::Format(format!(
        "no supported encoding ({}) yields an Alipay statement",
        cfg.encodings.join(", ")
    )))
}

/// Converts rows to bills: parses amounts, applies the meal-subsidy
/// deduction and drops near-zero rows. Duplicate ids are fatal.
pub fn structure(rows: Vec<StatementRow>, settings: &ImportSettings) -> Result<Bills, ImportError> {
    statement::ensure_unique(&rows)?;

    let mut bills = Bills::new();
    for row in rows {
        let raw_amount = row.get(fields::AMOUNT);
        let mut amount = Money::parse(raw_amount).map_err(|_| ImportError::InvalidAmount {
            id: row.id.clone(),
            value: raw_amount.to_string(),
        })?;

        let payment = row.get(fields::PAYMENT_METHOD);
        if settings.subsidy.keywords.iter().any(|kw| payment.contains(kw.as_str())) {
            amount = amount.saturating_sub(settings.subsidy.deduction);
        }

        if amount < settings.min_amount {
            continue;
        }

        let StatementRow { id, mut fields } = row;
        fields.remove(&settings.alipay.id_column);
        bills.insert(id, Bill::from_fields(amount, fields));
    }
    Ok(bills)
}

/// Whether a reconciled bill is out of scope: closed trades, income,
/// wealth-management transfers and fund purchases.
pub fn is_excluded(bill: &Bill, settings: &ImportSettings) -> bool {
    let cfg = &settings.alipay;
    bill.extra_or_empty(fields::STATUS) == cfg.closed_status
        || bill.extra_or_empty(fields::DIRECTION) == cfg.income_direction
        || cfg
            .investment_keywords
            .iter()
            .any(|kw| bill.goods.contains(kw.as_str()))
        || bill.counterparty.contains(cfg.fund_sales_keyword.as_str())
}

pub fn filter(bills: Bills, settings: &ImportSettings) -> Bills {
    bills
        .into_iter()
        .filter(|(_, bill)| !is_excluded(bill, settings))
        .collect()
}

/// Full Alipay pipeline short of tagging.
pub fn process(
    bytes: &[u8],
    settings: &ImportSettings,
    warnings: &mut Warnings,
) -> Result<Bills, ImportError> {
    let rows = parse_bytes(bytes, settings)?;
    let bills = structure(rows, settings)?;
    let reconciled = refund::reconcile(bills, settings, warnings)?;
    Ok(filter(reconciled, settings))
}
