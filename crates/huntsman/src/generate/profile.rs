//! Applicant profile, loaded from YAML.
//!
//! The profile is the static input to document generation: who the
//! applicant is and what goes on the resume.

use std::path::Path;

use serde::Deserialize;

use super::GenerateError;

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Experience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub period: Option<String>,
}

impl Profile {
    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let content = std::fs::read_to_string(path).map_err(|e| GenerateError::ProfileIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let profile: Profile = serde_yaml::from_str(&content)?;
        profile.validate()?;
        log::info!("Loaded profile for {} from {}", profile.name, path.display());
        Ok(profile)
    }

    fn validate(&self) -> Result<(), GenerateError> {
        if self.name.trim().is_empty() {
            return Err(GenerateError::ProfileInvalid(
                "name must not be empty".to_string(),
            ));
        }
        if self.email.trim().is_empty() {
            return Err(GenerateError::ProfileInvalid(
                "email must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
