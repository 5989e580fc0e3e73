pub mod alipay;
pub mod error;
pub mod mapping;
pub mod refund;
pub mod rules;
pub mod statement;
pub mod warning;
pub mod wechat;

pub use error::ImportError;
pub use rules::{apply_rules, resolve_tag, RuleEngine, RuleMatch};
pub use statement::StatementRow;
pub use warning::{ImportWarning, Warnings};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tally_core::{Bills, ImportSettings, Rule};

/// Statement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Alipay,
    Wechat,
}

impl Provider {
    /// Book label stamped on every bill from this provider.
    pub fn book<'a>(&self, settings: &'a ImportSettings) -> &'a str {
        match self {
            Provider::Alipay => &settings.alipay.book,
            Provider::Wechat => &settings.wechat.book,
        }
    }
}

impl FromStr for Provider {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alipay" => Ok(Provider::Alipay),
            "wechat" => Ok(Provider::Wechat),
            _ => Err(ImportError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Alipay => write!(f, "alipay"),
            Provider::Wechat => write!(f, "wechat"),
        }
    }
}

/// Result of a successful import: tagged bills plus non-fatal findings.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub bills: Bills,
    pub warnings: Vec<ImportWarning>,
}

/// Runs a raw statement through parsing, refund reconciliation, filtering and
/// rule tagging.
pub fn process_bytes(
    bytes: &[u8],
    provider: Provider,
    rules: &[Rule],
    settings: &ImportSettings,
) -> Result<ImportOutcome, ImportError> {
    let mut warnings = Warnings::new();
    let mut bills = match provider {
        Provider::Alipay => alipay::process(bytes, settings, &mut warnings)?,
        Provider::Wechat => wechat::process(bytes, settings)?,
    };

    let book = provider.book(settings);
    for bill in bills.values_mut() {
        bill.book = book.to_string();
    }

    let engine = RuleEngine::new(rules.to_vec(), settings.tagging.clone());
    warnings.extend(engine.invalid_patterns().iter().cloned());
    let tagged = engine.apply(&mut bills);

    tracing::info!(
        "imported {} {provider} bills, {tagged} tagged by rules",
        bills.len()
    );
    Ok(ImportOutcome {
        bills,
        warnings: warnings.into_vec(),
    })
}

pub fn process_statement(
    path: &Path,
    provider: Provider,
    rules: &[Rule],
    settings: &ImportSettings,
) -> Result<ImportOutcome, ImportError> {
    let bytes = std::fs::read(path)?;
    process_bytes(&bytes, provider, rules, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Alipay".parse::<Provider>().unwrap(), Provider::Alipay);
        assert_eq!("wechat".parse::<Provider>().unwrap(), Provider::Wechat);
        assert!(matches!(
            "unionpay".parse::<Provider>(),
            Err(ImportError::UnsupportedProvider(p)) if p == "unionpay"
        ));
    }

    #[test]
    fn provider_books() {
        let settings = ImportSettings::default();
        assert_eq!(Provider::Alipay.book(&settings), "支付宝");
        assert_eq!(Provider::Wechat.book(&settings), "微信");
    }

    fn alipay_statement(body: &str) -> String {
        let settings = ImportSettings::default();
        let mut text = String::new();
        for i in 1..settings.alipay.checkpoint_line {
            text.push_str(&format!("导出信息 {i}\n"));
        }
        text.push_str(&settings.alipay.marker);
        text.push_str("\n交易时间,交易分类,交易对方,商品说明,收/支,金额,收/付款方式,交易状态,交易订单号\n");
        text.push_str(body);
        text
    }

    #[test]
    fn alipay_statement_end_to_end() {
        let text = alipay_statement(concat!(
            "2024-01-15 08:10:00,餐饮美食,早餐店,包子,支出,6.00,余额,交易成功,2024011501\n",
            "2024-01-15 12:05:00,餐饮美食,美团外卖,午餐,支出,2.00,花呗,交易成功,2024011502\n",
            "2024-01-15 12:30:00,退款,美团外卖,退款-午餐,不计收支,1.27,花呗,退款成功,2024011502_R1\n",
            "2024-01-15 13:00:00,转账红包,张三,红包,收入,100.00,余额,交易成功,2024011503\n",
            "2024-01-15 14:00:00,日用百货,便利店,矿泉水,支出,3.00,余额,交易关闭,2024011504\n",
        ));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, text.as_bytes()).unwrap();

        let mut breakfast = Rule::new(
            tally_core::FieldSelector::field(tally_core::fields::COUNTERPARTY),
            &["早餐店"],
            "食",
            "",
        );
        breakfast.time_based = tally_core::TimeBased::all_periods();
        let rules = vec![
            breakfast,
            Rule::new(tally_core::FieldSelector::Any, &["外卖"], "食", "外卖"),
        ];

        let outcome = process_statement(
            file.path(),
            Provider::Alipay,
            &rules,
            &ImportSettings::default(),
        )
        .unwrap();
        assert!(outcome.warnings.is_empty());

        let ids: Vec<&str> = outcome.bills.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["2024011501", "2024011502"]);

        let morning = &outcome.bills["2024011501"];
        assert_eq!(morning.tag, "早餐");
        assert_eq!(morning.book, "支付宝");

        let lunch = &outcome.bills["2024011502"];
        assert_eq!(lunch.amount, tally_core::Money::from_parts(73, 2));
        assert_eq!(lunch.category, "食");
        assert_eq!(lunch.tag, "外卖");
        assert_eq!(lunch.matched_rule, "ANY: 外卖");
    }

    #[test]
    fn invalid_patterns_surface_as_warnings() {
        let text = alipay_statement(
            "2024-01-15 08:10:00,餐饮美食,早餐店,包子,支出,6.00,余额,交易成功,2024011501\n",
        );
        let mut rule = Rule::new(tally_core::FieldSelector::Any, &["(["], "食", "");
        rule.match_mode = tally_core::MatchMode::Regex;
        let outcome = process_bytes(
            text.as_bytes(),
            Provider::Alipay,
            &[rule],
            &ImportSettings::default(),
        )
        .unwrap();
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.bills["2024011501"].category, "");
    }

    #[test]
    fn unreadable_bytes_fail_for_both_providers() {
        let settings = ImportSettings::default();
        for provider in [Provider::Alipay, Provider::Wechat] {
            assert!(matches!(
                process_bytes(b"garbage", provider, &[], &settings),
                Err(ImportError::Format(_))
            ));
        }
    }
}
