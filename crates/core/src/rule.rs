use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::bill::fields;

/// Category name → allowed tags.
pub type Categories = BTreeMap<String, Vec<String>>;

pub const ANY_FIELD: &str = "ANY";
pub const ALL_PERIODS: &str = "全部";
pub const NO_PERIOD: &str = "无";
pub const SUGGESTED_RULE_COMMENT: &str = "AI 建议";

/// Which bill fields a rule inspects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldSelector {
    /// Counterparty, then goods description.
    Any,
    Field(String),
}

impl FieldSelector {
    pub fn field(name: &str) -> Self {
        FieldSelector::from(name.to_string())
    }

    pub fn targets(&self) -> Vec<&str> {
        match self {
            FieldSelector::Any => vec![fields::COUNTERPARTY, fields::GOODS],
            FieldSelector::Field(name) => vec![name.as_str()],
        }
    }
}

impl Default for FieldSelector {
    fn default() -> Self {
        FieldSelector::Field(fields::COUNTERPARTY.to_string())
    }
}

impl From<String> for FieldSelector {
    fn from(s: String) -> Self {
        if s == ANY_FIELD {
            FieldSelector::Any
        } else {
            FieldSelector::Field(s)
        }
    }
}

impl From<FieldSelector> for String {
    fn from(sel: FieldSelector) -> Self {
        sel.to_string()
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSelector::Any => write!(f, "{ANY_FIELD}"),
            FieldSelector::Field(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Substring containment.
    #[default]
    Keyword,
    /// Unanchored regular-expression search.
    Regex,
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyword" => Ok(MatchMode::Keyword),
            "regex" => Ok(MatchMode::Regex),
            other => Err(format!("Unknown match mode: '{other}'")),
        }
    }
}

/// Meal-time override of a rule's static tag, kept exactly as stored: a list
/// of period labels where `全部` (or `ALL`) means every period and `无` (or
/// `NONE`) means never. Every-period outranks never. An empty list is off.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeBased(Vec<String>);

impl TimeBased {
    pub fn new<I, S>(periods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TimeBased(periods.into_iter().map(Into::into).collect())
    }

    pub fn all_periods() -> Self {
        TimeBased::new([ALL_PERIODS])
    }

    pub fn is_off(&self) -> bool {
        self.0.is_empty()
    }

    fn has(&self, sentinel: &str, alias: &str) -> bool {
        self.0.iter().any(|p| p == sentinel || p == alias)
    }

    pub fn allows_all(&self) -> bool {
        self.has(ALL_PERIODS, "ALL")
    }

    pub fn is_never(&self) -> bool {
        !self.allows_all() && self.has(NO_PERIOD, "NONE")
    }

    /// Whether a bill classified into `period` takes the period as its tag.
    pub fn allows(&self, period: &str) -> bool {
        self.allows_all() || (!self.is_never() && self.0.iter().any(|p| p == period))
    }
}

impl From<Vec<String>> for TimeBased {
    fn from(list: Vec<String>) -> Self {
        TimeBased(list)
    }
}

/// A user-maintained classification rule. Rules are evaluated in list order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub key: FieldSelector,
    #[serde(rename = "rule", default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub match_mode: MatchMode,
    pub category: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub time_based: TimeBased,
    #[serde(default)]
    pub comment: String,
    /// Keys this crate does not interpret, written back unchanged.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Rule {
    pub fn new(key: FieldSelector, patterns: &[&str], category: &str, tag: &str) -> Self {
        Rule {
            key,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            category: category.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// `"<selector>: <pattern>"`, recorded on bills this rule tags.
    pub fn descriptor(&self, pattern: &str) -> String {
        format!("{}: {}", self.key, pattern)
    }

    fn same_target(&self, other: &Rule) -> bool {
        self.key == other.key
            && self.category == other.category
            && self.tag == other.tag
            && self.match_mode == other.match_mode
    }
}

/// Folds suggested rules into an existing list. A suggestion sharing key,
/// category, tag and match mode with an existing rule contributes its new
/// patterns to the front of that rule; otherwise it is inserted first.
pub fn merge_suggested_rules(existing: &mut Vec<Rule>, suggested: Vec<Rule>) {
    for mut suggestion in suggested {
        if let Some(target) = existing.iter_mut().find(|r| r.same_target(&suggestion)) {
            for pattern in suggestion.patterns {
                if !target.patterns.contains(&pattern) {
                    target.patterns.insert(0, pattern);
                }
            }
        } else {
            if suggestion.comment.is_empty() {
                suggestion.comment = SUGGESTED_RULE_COMMENT.to_string();
            }
            existing.insert(0, suggestion);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_persisted_rule() {
        let json = r#"{
            "category": "食",
            "tag": "外卖",
            "key": "交易对方",
            "rule": ["美团外卖", "饿了么"],
            "time_based": [],
            "comment": "外卖消费"
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.key, FieldSelector::field(fields::COUNTERPARTY));
        assert_eq!(rule.patterns, vec!["美团外卖", "饿了么"]);
        assert_eq!(rule.match_mode, MatchMode::Keyword);
        assert!(rule.time_based.is_off());
        assert_eq!(rule.comment, "外卖消费");
    }

    #[test]
    fn any_selector_targets_counterparty_then_goods() {
        let sel: FieldSelector = serde_json::from_str("\"ANY\"").unwrap();
        assert_eq!(sel, FieldSelector::Any);
        assert_eq!(sel.targets(), vec![fields::COUNTERPARTY, fields::GOODS]);
        assert_eq!(serde_json::to_string(&sel).unwrap(), "\"ANY\"");
    }

    #[test]
    fn time_based_sentinels() {
        assert!(TimeBased::default().is_off());
        assert!(TimeBased::new(["全部"]).allows("午餐"));
        assert!(TimeBased::new(["ALL"]).allows("夜宵"));
        assert!(TimeBased::new(["无"]).is_never());
        assert!(!TimeBased::new(["NONE"]).allows("早餐"));
        // The all-periods sentinel outranks never.
        assert!(TimeBased::new(["无", "全部"]).allows("晚餐"));
        let listed = TimeBased::new(["早餐", "午餐"]);
        assert!(listed.allows("早餐"));
        assert!(!listed.allows("晚餐"));
        assert!(!listed.is_never());
    }

    #[test]
    fn stored_rule_is_written_back_unchanged() {
        let json = r#"{"id":null,"key":"ANY","rule":["早点"],"match_mode":"keyword","category":"食","tag":"","time_based":["早餐","ALL"],"comment":""}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(rule.time_based.allows("夜宵"));
        let back = serde_json::to_value(&rule).unwrap();
        assert_eq!(back, serde_json::from_str::<serde_json::Value>(json).unwrap());
    }

    #[test]
    fn match_mode_parses() {
        assert_eq!("regex".parse::<MatchMode>().unwrap(), MatchMode::Regex);
        assert_eq!("Keyword".parse::<MatchMode>().unwrap(), MatchMode::Keyword);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }

    #[test]
    fn descriptor_format() {
        let rule = Rule::new(FieldSelector::Any, &["test"], "其他", "");
        assert_eq!(rule.descriptor("test"), "ANY: test");
    }

    #[test]
    fn merge_prepends_new_patterns_to_matching_rule() {
        let mut existing = vec![Rule::new(
            FieldSelector::field(fields::COUNTERPARTY),
            &["瑞幸"],
            "食",
            "咖啡",
        )];
        let suggested = vec![Rule::new(
            FieldSelector::field(fields::COUNTERPARTY),
            &["星巴克", "瑞幸", "Manner"],
            "食",
            "咖啡",
        )];
        merge_suggested_rules(&mut existing, suggested);
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].patterns, vec!["Manner", "星巴克", "瑞幸"]);
    }

    #[test]
    fn merge_inserts_unmatched_suggestion_first() {
        let mut existing = vec![Rule::new(FieldSelector::Any, &["地铁"], "行", "地铁")];
        let mut regex_rule = Rule::new(FieldSelector::Any, &["地铁"], "行", "地铁");
        regex_rule.match_mode = MatchMode::Regex;
        merge_suggested_rules(&mut existing, vec![regex_rule]);
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[0].match_mode, MatchMode::Regex);
        assert_eq!(existing[0].comment, SUGGESTED_RULE_COMMENT);
    }
}
