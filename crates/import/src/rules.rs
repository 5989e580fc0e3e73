use regex::Regex;

use tally_core::{Bill, Bills, MatchMode, Rule, TaggingSettings};

use crate::warning::ImportWarning;

/// Internal pairing of a rule with its precompiled patterns. A regex that
/// fails to compile is kept as `None` and never matches.
struct CompiledRule {
    rule: Rule,
    regexes: Vec<Option<Regex>>,
}

impl CompiledRule {
    fn new(rule: Rule) -> Self {
        let regexes = match rule.match_mode {
            MatchMode::Regex => rule.patterns.iter().map(|p| Regex::new(p).ok()).collect(),
            MatchMode::Keyword => Vec::new(),
        };
        CompiledRule { rule, regexes }
    }

    /// First pattern matching any target field, fields checked in order.
    fn matched_pattern(&self, bill: &Bill) -> Option<&str> {
        for field in self.rule.key.targets() {
            let value = bill.field(field).unwrap_or_default();
            for (idx, pattern) in self.rule.patterns.iter().enumerate() {
                let hit = match self.rule.match_mode {
                    MatchMode::Keyword => value.contains(pattern.as_str()),
                    MatchMode::Regex => self
                        .regexes
                        .get(idx)
                        .and_then(Option::as_ref)
                        .is_some_and(|re| re.is_match(value)),
                };
                if hit {
                    return Some(pattern);
                }
            }
        }
        None
    }
}

/// The first rule that matched a bill and the pattern that triggered it.
#[derive(Debug, Clone, Copy)]
pub struct RuleMatch<'a> {
    pub rule: &'a Rule,
    pub pattern: &'a str,
}

/// Ordered first-match rule evaluation. Rule order is the user's priority.
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
    tagging: TaggingSettings,
    invalid: Vec<ImportWarning>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>, tagging: TaggingSettings) -> Self {
        let rules: Vec<CompiledRule> = rules.into_iter().map(CompiledRule::new).collect();
        let invalid = rules
            .iter()
            .flat_map(|cr| {
                cr.regexes
                    .iter()
                    .zip(&cr.rule.patterns)
                    .filter(|(re, _)| re.is_none())
                    .map(|(_, pattern)| ImportWarning::InvalidPattern {
                        selector: cr.rule.key.to_string(),
                        pattern: pattern.clone(),
                    })
            })
            .collect();
        Self {
            rules,
            tagging,
            invalid,
        }
    }

    /// Regex patterns that will never match because they do not compile.
    pub fn invalid_patterns(&self) -> &[ImportWarning] {
        &self.invalid
    }

    pub fn find_matching_rule(&self, bill: &Bill) -> Option<RuleMatch<'_>> {
        self.rules.iter().find_map(|cr| {
            cr.matched_pattern(bill).map(|pattern| RuleMatch {
                rule: &cr.rule,
                pattern,
            })
        })
    }

    /// Tags one bill if its category is still empty. Returns whether a rule
    /// matched.
    pub fn tag_bill(&self, bill: &mut Bill) -> bool {
        if bill.is_categorized() {
            return false;
        }
        bill.clear_tagging();

        let matched = match self.find_matching_rule(bill) {
            Some(m) => {
                let tag = resolve_tag(m.rule, bill, &self.tagging);
                bill.matched_rule = m.rule.descriptor(m.pattern);
                bill.category = m.rule.category.clone();
                bill.tag = tag;
                bill.note = m.rule.comment.clone();
                true
            }
            None => false,
        };

        if !bill.category.is_empty() && bill.tag.is_empty() {
            bill.tag = self.tagging.no_sub_tag.clone();
        }
        matched
    }

    /// Tags every uncategorized bill; returns how many were matched.
    pub fn apply(&self, bills: &mut Bills) -> usize {
        let mut tagged = 0;
        for bill in bills.values_mut() {
            if self.tag_bill(bill) {
                tagged += 1;
            }
        }
        tracing::debug!("rules tagged {tagged} of {} bills", bills.len());
        tagged
    }
}

/// Applies `rules` in order to every uncategorized bill.
pub fn apply_rules(bills: &mut Bills, rules: &[Rule], tagging: &TaggingSettings) -> usize {
    RuleEngine::new(rules.to_vec(), tagging.clone()).apply(bills)
}

/// The tag a matching rule assigns. Food rules with a meal-time list take
/// the bill's meal period when allowed, falling back to the static tag.
pub fn resolve_tag(rule: &Rule, bill: &Bill, tagging: &TaggingSettings) -> String {
    if rule.time_based.is_off() || rule.category != tagging.food_category {
        return rule.tag.clone();
    }

    let period = bill
        .clock()
        .and_then(|clock| tagging.meal_schedule.classify_str(clock));
    let Some(period) = period else {
        return rule.tag.clone();
    };

    if rule.time_based.allows(period) {
        period.to_string()
    } else {
        rule.tag.clone()
    }
}
