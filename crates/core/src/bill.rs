use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::Money;

/// Canonical field names, shared by statement headers, persisted bills and
/// rule selectors.
pub mod fields {
    pub const ID: &str = "交易订单号";
    pub const COUNTERPARTY: &str = "交易对方";
    pub const GOODS: &str = "商品说明";
    pub const TIME: &str = "交易时间";
    pub const AMOUNT: &str = "金额";
    pub const CATEGORY: &str = "类别";
    pub const TAG: &str = "标签";
    pub const NOTE: &str = "备注";
    pub const MATCHED_RULE: &str = "命中规则";
    pub const BOOK: &str = "账本";
    pub const STATUS: &str = "交易状态";
    pub const DIRECTION: &str = "收/支";
    pub const PAYMENT_METHOD: &str = "收/付款方式";
    pub const CLASSIFICATION: &str = "交易分类";
}

/// Tag written when a category matched but no sub-tag resolved.
pub const NO_SUB_TAG: &str = "—";

/// Placeholder written by older progress files.
pub const LEGACY_NO_SUB_TAG: &str = "-";

/// One canonical transaction. Provider columns without a canonical slot are
/// kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "交易对方", default)]
    pub counterparty: String,
    #[serde(rename = "商品说明", default)]
    pub goods: String,
    #[serde(rename = "交易时间", default)]
    pub time: String,
    #[serde(rename = "金额", default)]
    pub amount: Money,
    #[serde(rename = "类别", default)]
    pub category: String,
    #[serde(rename = "标签", default)]
    pub tag: String,
    #[serde(rename = "备注", default)]
    pub note: String,
    #[serde(rename = "命中规则", default)]
    pub matched_rule: String,
    #[serde(rename = "账本", default)]
    pub book: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Bills keyed by provider transaction id.
pub type Bills = BTreeMap<String, Bill>;

impl Bill {
    pub fn new(amount: Money) -> Self {
        Bill {
            amount,
            ..Default::default()
        }
    }

    /// Builds a bill from a statement row. The amount column is parsed by the
    /// caller and never lands in `extra`.
    pub fn from_fields<I>(amount: Money, row: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut bill = Bill::new(amount);
        for (name, value) in row {
            bill.set_field(&name, value);
        }
        bill
    }

    /// Text value of a field by canonical or provider name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            fields::COUNTERPARTY => Some(&self.counterparty),
            fields::GOODS => Some(&self.goods),
            fields::TIME => Some(&self.time),
            fields::CATEGORY => Some(&self.category),
            fields::TAG => Some(&self.tag),
            fields::NOTE => Some(&self.note),
            fields::MATCHED_RULE => Some(&self.matched_rule),
            fields::BOOK => Some(&self.book),
            fields::AMOUNT | fields::ID => None,
            other => self.extra.get(other).map(String::as_str),
        }
    }

    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            fields::COUNTERPARTY => self.counterparty = value,
            fields::GOODS => self.goods = value,
            fields::TIME => self.time = value,
            fields::CATEGORY => self.category = value,
            fields::TAG => self.tag = value,
            fields::NOTE => self.note = value,
            fields::MATCHED_RULE => self.matched_rule = value,
            fields::BOOK => self.book = value,
            fields::AMOUNT | fields::ID => {}
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }

    /// Passthrough lookup that treats a missing column as empty.
    pub fn extra_or_empty(&self, name: &str) -> &str {
        self.field(name).unwrap_or_default()
    }

    pub fn is_categorized(&self) -> bool {
        !self.category.trim().is_empty()
    }

    /// Time-of-day part of a `date time` timestamp.
    pub fn clock(&self) -> Option<&str> {
        let (_, rest) = self.time.split_once(' ')?;
        rest.split(' ').next()
    }

    pub fn clear_tagging(&mut self) {
        self.category.clear();
        self.tag.clear();
        self.note.clear();
        self.matched_rule.clear();
    }

    /// Overwrites the tagging fields from an external source.
    pub fn assign(&mut self, assignment: &TagAssignment, source: &str) {
        self.category = assignment.category.clone();
        self.tag = assignment.tag.clone();
        self.note = assignment.note.clone();
        self.matched_rule = source.to_string();
    }
}

/// An externally decided tagging for one bill (e.g. an accepted AI suggestion).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagAssignment {
    #[serde(rename = "交易订单号")]
    pub id: String,
    #[serde(rename = "类别", default)]
    pub category: String,
    #[serde(rename = "标签", default)]
    pub tag: String,
    #[serde(rename = "备注", default)]
    pub note: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillStats {
    pub total: usize,
    pub category_tagged: usize,
    pub category_percentage: f64,
    pub tag_tagged: usize,
    pub tag_percentage: f64,
}

impl BillStats {
    /// `placeholder` is the configured no-sub-tag marker; it never counts as a
    /// tag, nor do the built-in and legacy markers.
    pub fn from_bills(bills: &Bills, placeholder: &str) -> Self {
        let total = bills.len();
        let category_tagged = bills.values().filter(|b| b.is_categorized()).count();
        let tag_tagged = bills
            .values()
            .filter(|b| {
                let tag = b.tag.trim();
                !tag.is_empty()
                    && tag != placeholder.trim()
                    && tag != NO_SUB_TAG
                    && tag != LEGACY_NO_SUB_TAG
            })
            .count();
        BillStats {
            total,
            category_tagged,
            category_percentage: percentage(category_tagged, total),
            tag_tagged,
            tag_percentage: percentage(tag_tagged, total),
        }
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Bills ordered newest first by their raw timestamp.
pub fn sorted_by_time_desc(bills: &Bills) -> Vec<(&String, &Bill)> {
    let mut sorted: Vec<_> = bills.iter().collect();
    sorted.sort_by(|a, b| b.1.time.cmp(&a.1.time));
    sorted
}
