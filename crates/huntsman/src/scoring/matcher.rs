//! Template matcher: scores a posting against loaded templates.
//!
//! Keywords match on word boundaries, case-insensitively, with the
//! keyword text regex-escaped. "java" never matches "javascript".
//! Patterns are compiled once at construction.

use std::collections::BTreeSet;

use regex::Regex;

use super::template::{ScoringDefaults, ScoringTemplate, TemplateSet};
use super::ScoringError;

/// Outcome of scoring one posting against one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    pub template_name: String,
    pub total: i64,
    pub matched_triggers: BTreeSet<String>,
    pub matched_support: BTreeSet<String>,
    pub matched_negative: BTreeSet<String>,
    pub passed: bool,
}

impl ScoreResult {
    fn empty() -> Self {
        Self {
            template_name: "none".to_string(),
            total: 0,
            matched_triggers: BTreeSet::new(),
            matched_support: BTreeSet::new(),
            matched_negative: BTreeSet::new(),
            passed: false,
        }
    }
}

struct CompiledTemplate {
    template: ScoringTemplate,
    triggers: Vec<(String, Regex)>,
    support: Vec<(String, Regex)>,
    negative: Vec<(String, Regex)>,
}

/// Scores postings against a set of templates.
pub struct TemplateMatcher {
    defaults: ScoringDefaults,
    templates: Vec<CompiledTemplate>,
}

impl TemplateMatcher {
    pub fn new(set: TemplateSet) -> Result<Self, ScoringError> {
        let defaults = set.defaults;
        let mut templates = Vec::with_capacity(set.templates.len());

        for template in set.templates {
            templates.push(CompiledTemplate {
                triggers: compile_keywords(&template.trigger_keywords)?,
                support: compile_keywords(&template.support_keywords)?,
                negative: compile_keywords(&template.negative_keywords)?,
                template,
            });
        }

        Ok(Self {
            defaults,
            templates,
        })
    }

    pub fn template_names(&self) -> Vec<&str> {
        self.templates
            .iter()
            .map(|c| c.template.name.as_str())
            .collect()
    }

    /// Scores against every template and returns the best total.
    /// Ties go to the template appearing first in the file.
    pub fn score_best(&self, title: &str, description: &str) -> ScoreResult {
        let mut best: Option<ScoreResult> = None;
        for compiled in &self.templates {
            let result = self.score_one(compiled, title, description);
            let better = match best {
                Some(ref b) => result.total > b.total,
                None => true,
            };
            if better {
                best = Some(result);
            }
        }
        best.unwrap_or_else(ScoreResult::empty)
    }

    /// Scores against a single named template.
    pub fn score_named(
        &self,
        name: &str,
        title: &str,
        description: &str,
    ) -> Option<ScoreResult> {
        self.templates
            .iter()
            .find(|c| c.template.name == name)
            .map(|c| self.score_one(c, title, description))
    }

    fn score_one(&self, compiled: &CompiledTemplate, title: &str, description: &str) -> ScoreResult {
        let template = &compiled.template;

        let title_triggers = find_matches(&compiled.triggers, title);
        let mut matched_triggers = find_matches(&compiled.triggers, description);
        matched_triggers.extend(title_triggers.iter().cloned());

        let mut matched_support = find_matches(&compiled.support, description);
        matched_support.extend(find_matches(&compiled.support, title));

        let mut matched_negative = find_matches(&compiled.negative, description);
        matched_negative.extend(find_matches(&compiled.negative, title));

        // Each trigger counts once no matter how often it appears;
        // triggers found in the title add a flat half-weight bonus.
        // The halving truncates over the whole product, so odd weights
        // lose at most one point regardless of how many title matches.
        let trigger_score = template.trigger_weight * matched_triggers.len() as i64;
        let title_bonus = (template.trigger_weight * title_triggers.len() as i64) / 2;
        let support_score = template.support_weight * matched_support.len() as i64;
        let negative_score = template.negative_weight * matched_negative.len() as i64;

        let total = (trigger_score + title_bonus + support_score + negative_score).max(0);
        let passed = matched_triggers.len() >= template.min_triggers(&self.defaults)
            && total >= template.min_score(&self.defaults);

        ScoreResult {
            template_name: template.name.clone(),
            total,
            matched_triggers,
            matched_support,
            matched_negative,
            passed,
        }
    }
}

fn compile_keywords(keywords: &[String]) -> Result<Vec<(String, Regex)>, ScoringError> {
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|keyword| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(keyword.trim()));
            Ok((keyword.clone(), Regex::new(&pattern)?))
        })
        .collect()
}

fn find_matches(keywords: &[(String, Regex)], text: &str) -> BTreeSet<String> {
    keywords
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(keyword, _)| keyword.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::template::TemplateSet;

    fn matcher(yaml: &str) -> TemplateMatcher {
        TemplateMatcher::new(TemplateSet::from_yaml(yaml).unwrap()).unwrap()
    }

    fn default_matcher() -> TemplateMatcher {
        matcher(
            r#"
templates:
  security:
    trigger_keywords: [siem, incident response, soc]
    support_keywords: [python, linux, splunk]
    negative_keywords: [sales, unpaid]
"#,
        )
    }

    #[test]
    fn test_score_just_below_threshold_fails() {
        let m = default_matcher();
        // 2 triggers (20) + 1 title trigger bonus (5) + 1 support (4) = 29.
        let result = m.score_best(
            "SIEM Engineer",
            "Run our SIEM and incident response process. Python a plus.",
        );
        assert_eq!(result.total, 29);
        assert_eq!(result.matched_triggers.len(), 2);
        assert!(!result.passed);
    }

    #[test]
    fn test_score_at_threshold_passes() {
        let m = default_matcher();
        // As above plus one more support keyword: 29 + 4 = 33.
        let result = m.score_best(
            "SIEM Engineer",
            "Run our SIEM and incident response process. Python and Linux.",
        );
        assert_eq!(result.total, 33);
        assert!(result.passed);
    }

    #[test]
    fn test_min_triggers_gate() {
        let m = default_matcher();
        // One trigger in the title plus lots of support still fails:
        // 10 + 5 + 12 = 27 < 30, and only one distinct trigger anyway.
        let result = m.score_best("SIEM Lead", "Python, Linux and Splunk daily.");
        assert_eq!(result.matched_triggers.len(), 1);
        assert!(!result.passed);
    }

    #[test]
    fn test_repeated_trigger_counts_once() {
        let m = default_matcher();
        let result = m.score_best("Engineer", "SIEM siem SIEM everywhere, siem.");
        assert_eq!(result.matched_triggers.len(), 1);
        assert_eq!(result.total, 10);
    }

    #[test]
    fn test_word_boundary_matching() {
        let m = matcher("templates:\n  t:\n    trigger_keywords: [java]\n");
        assert!(m.score_best("Java developer", "").matched_triggers.contains("java"));
        assert!(m
            .score_best("Javascript developer", "")
            .matched_triggers
            .is_empty());
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let m = default_matcher();
        let result = m.score_best("engineer", "SiEm and INCIDENT RESPONSE work");
        assert_eq!(result.matched_triggers.len(), 2);
    }

    #[test]
    fn test_multi_word_keyword() {
        let m = default_matcher();
        let result = m.score_best("engineer", "incident response team");
        assert!(result.matched_triggers.contains("incident response"));
        // The phrase must appear contiguously.
        let result = m.score_best("engineer", "incident and crisis response");
        assert!(!result.matched_triggers.contains("incident response"));
    }

    #[test]
    fn test_negative_keywords_drag_score_to_floor() {
        let m = default_matcher();
        // 2 triggers (20) - 2 negatives (30) = -10, floored at 0.
        let result = m.score_best("engineer", "siem and soc, but unpaid sales role");
        assert_eq!(result.total, 0);
        assert_eq!(result.matched_negative.len(), 2);
        assert!(!result.passed);
    }

    #[test]
    fn test_empty_description_matches_via_title() {
        let m = default_matcher();
        let result = m.score_best("SIEM SOC Analyst", "");
        // 2 triggers (20) + 2 title bonuses (10) = 30.
        assert_eq!(result.total, 30);
        assert!(result.passed);
    }

    #[test]
    fn test_best_template_wins_and_ties_keep_file_order() {
        let m = matcher(
            r#"
templates:
  first:
    trigger_keywords: [rust]
  second:
    trigger_keywords: [rust]
  third:
    trigger_keywords: [rust, tokio]
"#,
        );
        // third scores higher when tokio is present.
        let result = m.score_best("Rust engineer", "async with tokio");
        assert_eq!(result.template_name, "third");

        // first and second tie; file order wins.
        let result = m.score_best("Rust engineer", "no async here");
        assert_eq!(result.template_name, "first");
    }

    #[test]
    fn test_templates_do_not_bleed() {
        let m = matcher(
            r#"
templates:
  a:
    trigger_keywords: [siem]
    negative_keywords: [sales]
  b:
    trigger_keywords: [kubernetes]
"#,
        );
        // b knows nothing about sales; its score is unaffected.
        let result = m.score_named("b", "engineer", "kubernetes and sales").unwrap();
        assert!(result.matched_negative.is_empty());
        assert_eq!(result.total, 10);
    }

    #[test]
    fn test_score_named_unknown_template() {
        let m = default_matcher();
        assert!(m.score_named("missing", "t", "d").is_none());
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let m = default_matcher();
        let a = m.score_best("SIEM Engineer", "siem, soc, python, sales");
        let b = m.score_best("SIEM Engineer", "siem, soc, python, sales");
        assert_eq!(a, b);
    }

    #[test]
    fn test_title_bonus_truncates_over_the_product() {
        let m = matcher(
            r#"
templates:
  t:
    trigger_keywords: [siem, soc]
    trigger_weight: 5
"#,
        );
        // Two title triggers at weight 5: bonus is 5*2/2 = 5, not
        // (5/2)*2 = 4. Total 10 + 5.
        let result = m.score_best("SIEM SOC Analyst", "");
        assert_eq!(result.total, 15);
    }

    #[test]
    fn test_regex_metacharacters_in_keywords_are_literal() {
        let m = matcher("templates:\n  t:\n    trigger_keywords: [\"node.js\"]\n");
        let result = m.score_best("Node.js developer", "");
        assert_eq!(result.matched_triggers.len(), 1);
        // The dot is literal, not a wildcard.
        let result = m.score_best("nodexjs developer", "");
        assert!(result.matched_triggers.is_empty());
    }
}
