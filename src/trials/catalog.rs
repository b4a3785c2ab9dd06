//! Clinical trial records and the sources that provide them.

use crate::error::{OmicsError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// One registered clinical trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalTrial {
    pub nct_id: String,
    pub title: String,
    pub condition: String,
    pub status: String,
    pub sponsor: String,
    pub phase: String,
    pub enrollment: u32,
    pub start_date: NaiveDate,
    pub completion_date: NaiveDate,
    /// Gene or protein symbols the trial measures or targets.
    pub biomarkers: Vec<String>,
    pub url: String,
}

/// A provider of clinical trial records.
pub trait TrialSource {
    fn name(&self) -> &str;

    /// Every trial the source knows about.
    fn trials(&self) -> Vec<ClinicalTrial>;
}

/// A fixed list of trials, either built in or loaded from JSON.
#[derive(Debug, Clone)]
pub struct StaticTrialCatalog {
    name: String,
    trials: Vec<ClinicalTrial>,
}

/// (nct_id, title, status, sponsor, phase, enrollment, start, completion, biomarkers)
type TrialRecord = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    u32,
    &'static str,
    &'static str,
    &'static [&'static str],
);

const BUILTIN: &[TrialRecord] = &[
    (
        "NCT04287686",
        "Study of JAK Inhibitor in Hospitalized Patients With COVID-19",
        "Completed",
        "NIAID",
        "Phase 2/3",
        1033,
        "2020-03-17",
        "2021-06-28",
        &["JAK", "STAT1", "IL6"],
    ),
    (
        "NCT03799133",
        "Efficacy and Safety of IL-6 Receptor Antagonist in Patients With Sepsis",
        "Recruiting",
        "University Medical Center",
        "Phase 2",
        500,
        "2018-12-15",
        "2024-12-31",
        &["IL6", "TNF", "NFKB1"],
    ),
    (
        "NCT04643236",
        "Study of Interferon-Beta in Hospitalized Patients With Severe COVID-19",
        "Active, not recruiting",
        "National Institute of Allergy and Infectious Diseases",
        "Phase 2/3",
        615,
        "2020-07-01",
        "2023-12-31",
        &["IFNG", "JAK1", "STAT1"],
    ),
    (
        "NCT04660331",
        "TNF-Alpha Inhibition for Moderate to Severe COVID-19",
        "Completed",
        "Massachusetts General Hospital",
        "Phase 2",
        88,
        "2020-08-01",
        "2021-12-15",
        &["TNF", "IL1B", "NFKB1"],
    ),
    (
        "NCT04362813",
        "Safety and Efficacy of Tocilizumab (IL-6 Inhibitor) in COVID-19",
        "Completed",
        "Genentech, Inc.",
        "Phase 3",
        452,
        "2020-03-24",
        "2021-06-30",
        &["IL6", "CRP", "NFKB1"],
    ),
];

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| OmicsError::InvalidParameter(format!("invalid date '{}': {}", s, e)))
}

impl StaticTrialCatalog {
    pub fn new(name: impl Into<String>, trials: Vec<ClinicalTrial>) -> Self {
        Self {
            name: name.into(),
            trials,
        }
    }

    /// Infection and immune-response trials bundled with the crate.
    pub fn builtin() -> Result<Self> {
        let trials = BUILTIN
            .iter()
            .map(|(id, title, status, sponsor, phase, enrollment, start, end, markers)| {
                Ok(ClinicalTrial {
                    nct_id: id.to_string(),
                    title: title.to_string(),
                    condition: "Infection".to_string(),
                    status: status.to_string(),
                    sponsor: sponsor.to_string(),
                    phase: phase.to_string(),
                    enrollment: *enrollment,
                    start_date: parse_date(start)?,
                    completion_date: parse_date(end)?,
                    biomarkers: markers.iter().map(|m| m.to_string()).collect(),
                    url: format!("https://clinicaltrials.gov/ct2/show/{}", id),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new("builtin", trials))
    }

    /// Load a JSON array of trials (dates as `YYYY-MM-DD`).
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let name = path.as_ref().display().to_string();
        let reader = BufReader::new(File::open(path)?);
        let trials: Vec<ClinicalTrial> = serde_json::from_reader(reader)?;
        Ok(Self::new(name, trials))
    }

    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &self.trials)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl TrialSource for StaticTrialCatalog {
    fn name(&self) -> &str {
        &self.name
    }

    fn trials(&self) -> Vec<ClinicalTrial> {
        self.trials.clone()
    }
}

/// Write trials to CSV; biomarkers are joined with ", ".
pub fn write_trials_csv<P: AsRef<Path>>(path: P, trials: &[ClinicalTrial]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "nct_id",
        "title",
        "condition",
        "status",
        "sponsor",
        "phase",
        "enrollment",
        "start_date",
        "completion_date",
        "biomarkers",
        "url",
    ])?;
    for t in trials {
        writer.write_record([
            t.nct_id.as_str(),
            t.title.as_str(),
            t.condition.as_str(),
            t.status.as_str(),
            t.sponsor.as_str(),
            t.phase.as_str(),
            &t.enrollment.to_string(),
            &t.start_date.to_string(),
            &t.completion_date.to_string(),
            &t.biomarkers.join(", "),
            t.url.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_catalog() {
        let catalog = StaticTrialCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 5);
        let trials = catalog.trials();
        assert_eq!(trials[0].nct_id, "NCT04287686");
        assert_eq!(trials[0].start_date, NaiveDate::from_ymd_opt(2020, 3, 17).unwrap());
        assert!(trials[0].url.ends_with("NCT04287686"));
        assert!(trials.iter().all(|t| t.condition == "Infection"));
    }

    #[test]
    fn test_json_roundtrip() {
        let catalog = StaticTrialCatalog::builtin().unwrap();
        let file = NamedTempFile::new().unwrap();
        catalog.to_json(file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.contains("\"2018-12-15\""));

        let loaded = StaticTrialCatalog::from_json(file.path()).unwrap();
        assert_eq!(loaded.trials(), catalog.trials());
    }

    #[test]
    fn test_trials_csv() {
        let catalog = StaticTrialCatalog::builtin().unwrap();
        let file = NamedTempFile::new().unwrap();
        write_trials_csv(file.path(), &catalog.trials()).unwrap();
        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(&rows[1][9], "IL6, TNF, NFKB1");
    }
}
