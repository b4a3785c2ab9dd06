//! Filtering trials and matching them against discovered biomarkers.

use super::catalog::{ClinicalTrial, TrialSource};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Case-insensitive substring filter on condition and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialQuery {
    pub condition: String,
    /// `None` keeps every status.
    pub status: Option<String>,
}

impl Default for TrialQuery {
    fn default() -> Self {
        Self {
            condition: "Infection".to_string(),
            status: None,
        }
    }
}

impl TrialQuery {
    pub fn matches(&self, trial: &ClinicalTrial) -> bool {
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };
        contains(&trial.condition, &self.condition)
            && self
                .status
                .as_deref()
                .map_or(true, |s| contains(&trial.status, s))
    }
}

/// Trials of `source` passing `query`, in source order.
pub fn search_trials<S: TrialSource + ?Sized>(source: &S, query: &TrialQuery) -> Vec<ClinicalTrial> {
    let trials: Vec<ClinicalTrial> = source
        .trials()
        .into_iter()
        .filter(|t| query.matches(t))
        .collect();
    log::info!(
        "{} trial(s) from '{}' match condition '{}' (status: {})",
        trials.len(),
        source.name(),
        query.condition,
        query.status.as_deref().unwrap_or("all")
    );
    trials
}

/// A trial sharing at least one biomarker with the query set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMatch {
    pub nct_id: String,
    pub title: String,
    /// Shared biomarkers, in the trial's order.
    pub matching_biomarkers: Vec<String>,
    /// Shared biomarkers as a percentage of the (deduplicated) query set.
    pub match_percentage: f64,
    pub phase: String,
    pub status: String,
    pub sponsor: String,
    pub enrollment: u32,
    pub url: String,
}

/// Match trials against biomarkers; best matches first, ties in trial order.
pub fn match_trials(trials: &[ClinicalTrial], biomarkers: &[String]) -> Vec<TrialMatch> {
    let query: HashSet<&str> = biomarkers.iter().map(String::as_str).collect();
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<TrialMatch> = trials
        .iter()
        .filter_map(|t| {
            let mut seen = HashSet::new();
            let shared: Vec<String> = t
                .biomarkers
                .iter()
                .filter(|b| query.contains(b.as_str()) && seen.insert(b.as_str()))
                .cloned()
                .collect();
            if shared.is_empty() {
                return None;
            }
            Some(TrialMatch {
                nct_id: t.nct_id.clone(),
                title: t.title.clone(),
                match_percentage: shared.len() as f64 / query.len() as f64 * 100.0,
                matching_biomarkers: shared,
                phase: t.phase.clone(),
                status: t.status.clone(),
                sponsor: t.sponsor.clone(),
                enrollment: t.enrollment,
                url: t.url.clone(),
            })
        })
        .collect();

    matches.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));
    matches
}

pub fn write_matches_csv<P: AsRef<Path>>(path: P, matches: &[TrialMatch]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "nct_id",
        "title",
        "matching_biomarkers",
        "match_percentage",
        "phase",
        "status",
        "sponsor",
        "enrollment",
        "url",
    ])?;
    for m in matches {
        writer.write_record([
            m.nct_id.as_str(),
            m.title.as_str(),
            &m.matching_biomarkers.join(", "),
            &format!("{:.2}", m.match_percentage),
            m.phase.as_str(),
            m.status.as_str(),
            m.sponsor.as_str(),
            &m.enrollment.to_string(),
            m.url.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trials::StaticTrialCatalog;
    use approx::assert_relative_eq;

    fn markers(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_filters() {
        let catalog = StaticTrialCatalog::builtin().unwrap();
        assert_eq!(search_trials(&catalog, &TrialQuery::default()).len(), 5);

        let completed = TrialQuery {
            condition: "infection".into(),
            status: Some("completed".into()),
        };
        assert_eq!(search_trials(&catalog, &completed).len(), 3);

        // "Recruiting" is a substring of "Active, not recruiting"
        let recruiting = TrialQuery {
            condition: "Infection".into(),
            status: Some("Recruiting".into()),
        };
        assert_eq!(search_trials(&catalog, &recruiting).len(), 2);

        let cancer = TrialQuery {
            condition: "Cancer".into(),
            status: None,
        };
        assert!(search_trials(&catalog, &cancer).is_empty());
    }

    #[test]
    fn test_match_percentages() {
        let trials = StaticTrialCatalog::builtin().unwrap().trials();
        let biomarkers = markers(&[
            "IL6", "TNF", "IFNG", "IL1B", "IL12A", "CXCL10", "CD8A", "CD4", "NFKB1", "STAT1",
            "JAK1", "JAK2",
        ]);
        let matches = match_trials(&trials, &biomarkers);
        assert_eq!(matches.len(), 5);

        // Three shared markers out of twelve
        assert_relative_eq!(matches[0].match_percentage, 25.0);
        assert_eq!(matches[0].nct_id, "NCT03799133");
        assert_eq!(matches[0].matching_biomarkers, markers(&["IL6", "TNF", "NFKB1"]));

        let last = matches.last().unwrap();
        assert_relative_eq!(last.match_percentage, 2.0 / 12.0 * 100.0, epsilon = 1e-12);
        for w in matches.windows(2) {
            assert!(w[0].match_percentage >= w[1].match_percentage);
        }
    }

    #[test]
    fn test_no_overlap_or_empty_query() {
        let trials = StaticTrialCatalog::builtin().unwrap().trials();
        assert!(match_trials(&trials, &markers(&["GAPDH"])).is_empty());
        assert!(match_trials(&trials, &[]).is_empty());
    }

    #[test]
    fn test_duplicate_query_markers_counted_once() {
        let trials = StaticTrialCatalog::builtin().unwrap().trials();
        let matches = match_trials(&trials, &markers(&["CRP", "CRP"]));
        assert_eq!(matches.len(), 1);
        assert_relative_eq!(matches[0].match_percentage, 100.0);
    }
}
