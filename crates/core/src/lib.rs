pub mod bill;
pub mod money;
pub mod period;
pub mod rule;
pub mod settings;

pub use bill::{fields, sorted_by_time_desc, Bill, BillStats, Bills, TagAssignment, LEGACY_NO_SUB_TAG, NO_SUB_TAG};
pub use money::{Money, MoneyError};
pub use period::{classify_time, parse_clock, MealSchedule, MealWindow};
pub use rule::{
    merge_suggested_rules, Categories, FieldSelector, MatchMode, Rule, TimeBased, ALL_PERIODS,
    ANY_FIELD, NO_PERIOD,
};
pub use settings::{
    AlipaySettings, ImportSettings, SettingsError, SubsidySettings, TaggingSettings,
    WechatSettings,
};
