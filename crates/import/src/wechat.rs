//! WeChat Pay statement export. Always UTF-8; partial refunds are reported
//! inline in the status column rather than as separate records.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use tally_core::{fields, Bill, Bills, ImportSettings, Money};

use crate::error::ImportError;
use crate::mapping;
use crate::statement::{self, StatementRow};

fn partial_refund_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"已退款\([￥¥]([\d.]+)\)").expect("static regex"))
}

/// Amount already refunded according to a status such as `已退款(¥9.90)`.
pub fn refunded_amount(status: &str) -> Option<Money> {
    partial_refund_re()
        .captures(status)
        .and_then(|caps| Money::parse(&caps[1]).ok())
}

pub fn parse_file(path: &Path, settings: &ImportSettings) -> Result<Vec<StatementRow>, ImportError> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes, settings)
}

pub fn parse_bytes(bytes: &[u8], settings: &ImportSettings) -> Result<Vec<StatementRow>, ImportError> {
    let cfg = &settings.wechat;
    let text = statement::decode_strict(bytes, "utf-8")
        .ok_or_else(|| ImportError::Format("WeChat statement is not valid UTF-8".to_string()))?;

    if statement::line_count(&text) < cfg.checkpoint_line {
        return Err(ImportError::Format(format!(
            "WeChat statement has fewer than {} lines",
            cfg.checkpoint_line
        )));
    }
    let table = statement::after_checkpoint(&text, cfg.checkpoint_line, &cfg.marker).ok_or_else(
        || {
            ImportError::Format(format!(
                "line {} is not the WeChat statement marker",
                cfg.checkpoint_line
            ))
        },
    )?;

    statement::read_table(table, &cfg.id_column)
}

/// Builds expense bills from rows, settling inline refunds and dropping
/// near-zero amounts.
pub fn structure(rows: Vec<StatementRow>, settings: &ImportSettings) -> Result<Bills, ImportError> {
    let cfg = &settings.wechat;
    statement::ensure_unique(&rows)?;

    let mut bills = Bills::new();
    for row in rows {
        let raw_amount = row.get(&cfg.amount_column);
        let mut amount = Money::parse(raw_amount).map_err(|_| ImportError::InvalidAmount {
            id: row.id.clone(),
            value: raw_amount.to_string(),
        })?;

        if row.get(fields::DIRECTION) != cfg.expense_direction {
            continue;
        }

        let status = row.get(&cfg.status_column);
        if status == cfg.full_refund_status {
            continue;
        }
        if let Some(refunded) = refunded_amount(status) {
            amount = amount - refunded;
        }

        if amount <= settings.min_amount {
            continue;
        }

        let StatementRow { id, mut fields } = row;
        fields.remove(&cfg.id_column);
        let mut bill = Bill::from_fields(amount, fields);
        mapping::apply_field_mapping(&mut bill, &cfg.field_mapping);
        bills.insert(id, bill);
    }
    Ok(bills)
}

pub fn process(bytes: &[u8], settings: &ImportSettings) -> Result<Bills, ImportError> {
    let rows = parse_bytes(bytes, settings)?;
    structure(rows, settings)
}
