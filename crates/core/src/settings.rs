use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::bill::{fields, NO_SUB_TAG};
use super::money::Money;
use super::period::MealSchedule;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to parse settings: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Every tunable constant of the import pipeline. `Default` matches the
/// statement formats as exported today; a TOML document may override any key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Amounts below this are treated as noise.
    pub min_amount: Money,
    pub subsidy: SubsidySettings,
    pub alipay: AlipaySettings,
    pub wechat: WechatSettings,
    pub tagging: TaggingSettings,
}

impl Default for ImportSettings {
    fn default() -> Self {
        ImportSettings {
            min_amount: Money::from_parts(1, 3),
            subsidy: SubsidySettings::default(),
            alipay: AlipaySettings::default(),
            wechat: WechatSettings::default(),
            tagging: TaggingSettings::default(),
        }
    }
}

impl ImportSettings {
    pub fn from_toml(toml_content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(toml_content)?)
    }
}

/// Employer-paid meal allowance deducted from matching payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsidySettings {
    pub keywords: Vec<String>,
    pub deduction: Money,
}

impl Default for SubsidySettings {
    fn default() -> Self {
        SubsidySettings {
            keywords: vec!["因公付".to_string()],
            deduction: Money::from_parts(20, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlipaySettings {
    /// 1-indexed line holding the marker; the CSV header follows it.
    pub checkpoint_line: usize,
    pub marker: String,
    /// Tried in order, first decoding whose marker line matches wins.
    pub encodings: Vec<String>,
    pub id_column: String,
    pub closed_status: String,
    pub income_direction: String,
    pub income_classification: String,
    /// Wealth-management and transfer keywords excluded via goods description.
    pub investment_keywords: Vec<String>,
    pub fund_sales_keyword: String,
    pub book: String,
}

impl Default for AlipaySettings {
    fn default() -> Self {
        let rule = "-".repeat(24);
        AlipaySettings {
            checkpoint_line: 24,
            marker: format!("{rule}支付宝支付科技有限公司  电子客户回单{rule}"),
            encodings: ["utf-8", "gbk", "gb2312", "utf-16"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            id_column: fields::ID.to_string(),
            closed_status: "交易关闭".to_string(),
            income_direction: "收入".to_string(),
            income_classification: "收入".to_string(),
            investment_keywords: [
                "蚂蚁财富",
                "余额宝",
                "基金销售",
                "蚂蚁合花-转入",
                "支付宝小荷包-转入",
                "自动攒",
                "实时提现",
                "余利宝转入",
                "转出到网商银行",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fund_sales_keyword: "基金销售".to_string(),
            book: "支付宝".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WechatSettings {
    pub checkpoint_line: usize,
    pub marker: String,
    pub id_column: String,
    pub amount_column: String,
    pub status_column: String,
    pub expense_direction: String,
    pub full_refund_status: String,
    /// Provider column → canonical column, copied additively.
    pub field_mapping: BTreeMap<String, String>,
    pub book: String,
}

impl Default for WechatSettings {
    fn default() -> Self {
        WechatSettings {
            checkpoint_line: 16,
            marker: "----------------------微信支付账单明细列表--------------------".to_string(),
            id_column: "交易单号".to_string(),
            amount_column: "金额(元)".to_string(),
            status_column: "当前状态".to_string(),
            expense_direction: "支出".to_string(),
            full_refund_status: "已全额退款".to_string(),
            field_mapping: BTreeMap::from([("商品".to_string(), fields::GOODS.to_string())]),
            book: "微信".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggingSettings {
    /// Only rules of this category resolve tags by meal time.
    pub food_category: String,
    pub no_sub_tag: String,
    pub meal_schedule: MealSchedule,
}

impl Default for TaggingSettings {
    fn default() -> Self {
        TaggingSettings {
            food_category: "食".to_string(),
            no_sub_tag: NO_SUB_TAG.to_string(),
            meal_schedule: MealSchedule::default(),
        }
    }
}
