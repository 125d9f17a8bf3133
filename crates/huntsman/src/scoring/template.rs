//! Scoring template definitions and YAML loading.
//!
//! A template file holds global scoring defaults plus any number of
//! named templates. Template order in the file is preserved; it breaks
//! score ties downstream.
//!
//! ```yaml
//! scoring:
//!   min_score: 30
//!   min_triggers: 2
//! templates:
//!   security_engineer:
//!     trigger_keywords: [siem, incident response]
//!     support_keywords: [python, linux]
//!     negative_keywords: [sales]
//! ```

use std::path::Path;

use serde::Deserialize;

use super::ScoringError;

/// Global pass thresholds, overridable per template.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringDefaults {
    #[serde(default = "default_min_score")]
    pub min_score: i64,
    #[serde(default = "default_min_triggers")]
    pub min_triggers: usize,
}

impl Default for ScoringDefaults {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            min_triggers: default_min_triggers(),
        }
    }
}

fn default_min_score() -> i64 {
    30
}

fn default_min_triggers() -> usize {
    2
}

fn default_trigger_weight() -> i64 {
    10
}

fn default_support_weight() -> i64 {
    4
}

fn default_negative_weight() -> i64 {
    -15
}

/// One named scoring template.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringTemplate {
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    #[serde(default)]
    pub support_keywords: Vec<String>,
    #[serde(default)]
    pub negative_keywords: Vec<String>,

    #[serde(default = "default_trigger_weight")]
    pub trigger_weight: i64,
    #[serde(default = "default_support_weight")]
    pub support_weight: i64,
    #[serde(default = "default_negative_weight")]
    pub negative_weight: i64,

    /// Per-template threshold overrides.
    #[serde(default)]
    pub min_score: Option<i64>,
    #[serde(default)]
    pub min_triggers: Option<usize>,
}

impl ScoringTemplate {
    pub fn min_score(&self, defaults: &ScoringDefaults) -> i64 {
        self.min_score.unwrap_or(defaults.min_score)
    }

    pub fn min_triggers(&self, defaults: &ScoringDefaults) -> usize {
        self.min_triggers.unwrap_or(defaults.min_triggers)
    }
}

/// A loaded and validated template file.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub defaults: ScoringDefaults,
    /// Templates in file order.
    pub templates: Vec<ScoringTemplate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTemplateFile {
    #[serde(default)]
    scoring: ScoringDefaults,
    #[serde(default)]
    templates: serde_yaml::Mapping,
}

impl TemplateSet {
    /// Loads a template file from disk.
    pub fn load(path: &Path) -> Result<Self, ScoringError> {
        let content = std::fs::read_to_string(path).map_err(|e| ScoringError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let set = Self::from_yaml(&content)?;
        log::info!(
            "Loaded {} scoring templates from {}",
            set.templates.len(),
            path.display()
        );
        Ok(set)
    }

    /// Parses and validates template YAML.
    pub fn from_yaml(content: &str) -> Result<Self, ScoringError> {
        let raw: RawTemplateFile = serde_yaml::from_str(content)?;

        // serde_yaml mappings keep insertion order, which fixes the
        // tie-break order for score_best.
        let mut templates = Vec::with_capacity(raw.templates.len());
        for (key, value) in raw.templates {
            let name = key.as_str().unwrap_or_default().to_string();
            let mut template: ScoringTemplate = serde_yaml::from_value(value)?;
            template.name = name;
            templates.push(template);
        }

        let set = Self {
            defaults: raw.scoring,
            templates,
        };
        set.validate()?;
        Ok(set)
    }

    fn validate(&self) -> Result<(), ScoringError> {
        if self.templates.is_empty() {
            return Err(ScoringError::Invalid {
                template: "<file>".to_string(),
                reason: "no templates defined".to_string(),
            });
        }

        for template in &self.templates {
            let fail = |reason: &str| ScoringError::Invalid {
                template: template.name.clone(),
                reason: reason.to_string(),
            };

            if template.name.is_empty() {
                return Err(fail("template name must be a non-empty string"));
            }
            if template.trigger_keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(fail("at least one trigger keyword is required"));
            }
            if template.trigger_weight <= 0 {
                return Err(fail("trigger_weight must be positive"));
            }
            if template.support_weight <= 0 {
                return Err(fail("support_weight must be positive"));
            }
            if template.negative_weight > 0 {
                return Err(fail("negative_weight must not be positive"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
scoring:
  min_score: 25
  min_triggers: 1
templates:
  security:
    trigger_keywords: [siem, soc]
    support_keywords: [python]
    negative_keywords: [sales]
  devops:
    trigger_keywords: [kubernetes]
    trigger_weight: 12
    min_score: 40
"#;

    #[test]
    fn test_parses_defaults_and_templates_in_order() {
        let set = TemplateSet::from_yaml(SAMPLE).unwrap();
        assert_eq!(set.defaults.min_score, 25);
        assert_eq!(set.defaults.min_triggers, 1);

        let names: Vec<&str> = set.templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["security", "devops"]);

        let security = &set.templates[0];
        assert_eq!(security.trigger_weight, 10);
        assert_eq!(security.support_weight, 4);
        assert_eq!(security.negative_weight, -15);
        assert_eq!(security.min_score(&set.defaults), 25);

        let devops = &set.templates[1];
        assert_eq!(devops.trigger_weight, 12);
        assert_eq!(devops.min_score(&set.defaults), 40);
        assert_eq!(devops.min_triggers(&set.defaults), 1);
    }

    #[test]
    fn test_missing_scoring_block_uses_defaults() {
        let set = TemplateSet::from_yaml(
            "templates:\n  t:\n    trigger_keywords: [rust]\n",
        )
        .unwrap();
        assert_eq!(set.defaults.min_score, 30);
        assert_eq!(set.defaults.min_triggers, 2);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let err = TemplateSet::from_yaml("templates: {}\n").unwrap_err();
        assert!(matches!(err, ScoringError::Invalid { .. }));
    }

    #[test]
    fn test_template_without_triggers_is_rejected() {
        let err = TemplateSet::from_yaml(
            "templates:\n  t:\n    support_keywords: [python]\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScoringError::Invalid { ref template, .. } if template == "t"));
    }

    #[test]
    fn test_positive_negative_weight_is_rejected() {
        let err = TemplateSet::from_yaml(
            "templates:\n  t:\n    trigger_keywords: [rust]\n    negative_weight: 5\n",
        )
        .unwrap_err();
        assert!(matches!(err, ScoringError::Invalid { .. }));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = TemplateSet::from_yaml(
            "templates:\n  t:\n    trigger_keywords: [rust]\n    bogus: 1\n",
        );
        assert!(err.is_err());
    }
}
