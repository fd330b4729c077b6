use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{PortalError, PortalResult};
use crate::models::{Company, InterviewExperience};

const BUNDLED_COMPANIES: &str = include_str!("../data/companies.json");
const BUNDLED_EXPERIENCES: &str = include_str!("../data/experiences.json");

const SUGGESTION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Default)]
pub struct Directory {
    companies: Vec<Company>,
}

/// Index of a company in the directory. Only the directory hands these out,
/// so a key always names a real entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyKey(usize);

impl Directory {
    pub fn new(companies: Vec<Company>) -> Self {
        Self { companies }
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn get(&self, key: CompanyKey) -> &Company {
        &self.companies[key.0]
    }

    pub fn resolve(&self, name: &str) -> PortalResult<CompanyKey> {
        self.companies
            .iter()
            .position(|c| c.company_name == name)
            .map(CompanyKey)
            .ok_or_else(|| PortalError::CompanyNotFound {
                name: name.to_string(),
                suggestion: self.closest_name(name),
            })
    }

    fn closest_name(&self, name: &str) -> Option<String> {
        let needle = name.to_lowercase();
        self.companies
            .iter()
            .map(|c| {
                let score = strsim::jaro_winkler(&needle, &c.company_name.to_lowercase());
                (score, &c.company_name)
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, n)| n.clone())
    }

    pub fn unique_criteria(&self) -> Vec<String> {
        distinct(self.companies.iter().flat_map(|c| c.criteria.iter()))
    }

    pub fn unique_kinds(&self) -> Vec<String> {
        distinct(self.companies.iter().map(|c| &c.kind))
    }

    pub fn unique_categories(&self) -> Vec<String> {
        distinct(self.companies.iter().map(|c| &c.category))
    }
}

// First-seen order.
fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

pub struct Seed {
    pub companies: Vec<Company>,
    pub experiences: Vec<InterviewExperience>,
}

impl Seed {
    pub fn load(data_dir: Option<&Path>) -> Result<Self> {
        let companies = match data_dir.map(|d| d.join("companies.json")) {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading companies");
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                parse_companies(&raw).with_context(|| format!("Invalid company data in {}", path.display()))?
            }
            _ => parse_companies(BUNDLED_COMPANIES).context("Invalid bundled company data")?,
        };

        let experiences = match data_dir.map(|d| d.join("experiences.json")) {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading experiences");
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                parse_experiences(&raw)
                    .with_context(|| format!("Invalid experience data in {}", path.display()))?
            }
            _ => parse_experiences(BUNDLED_EXPERIENCES).context("Invalid bundled experience data")?,
        };

        debug!(
            companies = companies.len(),
            experiences = experiences.len(),
            "seed loaded"
        );
        Ok(Self {
            companies,
            experiences,
        })
    }
}

pub fn parse_companies(raw: &str) -> Result<Vec<Company>> {
    let companies: Vec<Company> = serde_json::from_str(raw)?;
    Ok(companies)
}

pub fn parse_experiences(raw: &str) -> Result<Vec<InterviewExperience>> {
    let experiences: Vec<InterviewExperience> = serde_json::from_str(raw)?;
    let mut seen = std::collections::HashSet::new();
    for exp in &experiences {
        if !seen.insert(exp.id) {
            anyhow::bail!("Duplicate experience id {}", exp.id);
        }
    }
    Ok(experiences)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_parses() {
        let seed = Seed::load(None).unwrap();
        assert!(seed.companies.len() > 12, "directory should span more than one page");
        assert!(!seed.experiences.is_empty());
    }

    #[test]
    fn test_resolve_exact_name_and_suggestion() {
        let seed = Seed::load(None).unwrap();
        let directory = Directory::new(seed.companies);
        let first = directory.companies()[0].company_name.clone();

        let key = directory.resolve(&first).unwrap();
        assert_eq!(directory.get(key).company_name, first);

        let typo = format!("{}x", first.to_lowercase());
        match directory.resolve(&typo) {
            Err(PortalError::CompanyNotFound { suggestion, .. }) => {
                assert_eq!(suggestion, Some(first));
            }
            other => panic!("expected CompanyNotFound, got {:?}", other),
        }

        assert!(matches!(
            directory.resolve("zzzzzzzzzzzz"),
            Err(PortalError::CompanyNotFound { suggestion: None, .. })
        ));
    }

    #[test]
    fn test_duplicate_names_resolve_to_first_entry() {
        let raw = r#"[
            {"company_name": "Acme", "type": "Product", "category": "A", "criteria": [],
             "placement_open": null, "registration_date": null, "start_date": "2024-01-01", "end_date": null},
            {"company_name": "Acme", "type": "Product", "category": "A1", "criteria": [],
             "placement_open": null, "registration_date": null, "start_date": "2024-06-01", "end_date": null}
        ]"#;
        let directory = Directory::new(parse_companies(raw).unwrap());
        let key = directory.resolve("Acme").unwrap();
        assert_eq!(directory.get(key).category, "A");
    }

    #[test]
    fn test_unique_option_lists_keep_first_seen_order() {
        let raw = r#"[
            {"company_name": "A", "type": "Product", "category": "A1", "criteria": ["CSE", "IT"]},
            {"company_name": "B", "type": "Service", "category": "A", "criteria": ["IT", "ECE"]},
            {"company_name": "C", "type": "Product", "category": "A1", "criteria": ["CSE"]}
        ]"#;
        let directory = Directory::new(parse_companies(raw).unwrap());
        assert_eq!(directory.unique_criteria(), vec!["CSE", "IT", "ECE"]);
        assert_eq!(directory.unique_kinds(), vec!["Product", "Service"]);
        assert_eq!(directory.unique_categories(), vec!["A1", "A"]);
    }

    #[test]
    fn test_duplicate_experience_ids_rejected() {
        let raw = r#"[
            {"id": 1, "company_name": "A", "role": "SDE", "interview_date": "2024-01-01", "difficulty": "Easy"},
            {"id": 1, "company_name": "B", "role": "SDE", "interview_date": "2024-01-02", "difficulty": "Hard"}
        ]"#;
        assert!(parse_experiences(raw).is_err());
    }

    #[test]
    fn test_data_dir_overrides_bundled_seed() {
        let dir = std::env::temp_dir().join(format!("placement-seed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("companies.json"),
            r#"[{"company_name": "Only", "type": "Product", "category": "A", "criteria": []}]"#,
        )
        .unwrap();

        let seed = Seed::load(Some(&dir)).unwrap();
        assert_eq!(seed.companies.len(), 1);
        assert_eq!(seed.companies[0].company_name, "Only");
        // experiences.json absent: bundled experiences are used
        assert!(!seed.experiences.is_empty());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
