//! Plain-text summary of a set of clinical trials.

use super::catalog::ClinicalTrial;
use chrono::{DateTime, Utc};

const RULE_WIDTH: usize = 80;

/// Count occurrences, most frequent first; ties keep first-appearance order.
fn distribution<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for v in values {
        match counts.iter_mut().find(|(k, _)| *k == v) {
            Some((_, n)) => *n += 1,
            None => counts.push((v, 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Format an integer with comma thousands separators.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Render the trial summary report.
///
/// Trial details are listed newest start date first.
pub fn trial_report(trials: &[ClinicalTrial], generated: DateTime<Utc>) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "CLINICAL TRIALS SUMMARY REPORT".to_string(),
        "Infection/Immune Response Studies".to_string(),
        format!("Generated: {}", generated.format("%Y-%m-%d %H:%M:%S")),
        rule.clone(),
        String::new(),
    ];

    let total_enrollment: u64 = trials.iter().map(|t| u64::from(t.enrollment)).sum();
    lines.push(format!("Total Trials: {}", trials.len()));
    lines.push(format!("Total Enrollment: {} patients", thousands(total_enrollment)));
    lines.push(String::new());

    lines.push("Status Distribution:".to_string());
    for (status, count) in distribution(trials.iter().map(|t| t.status.as_str())) {
        lines.push(format!("  {}: {} trials", status, count));
    }
    lines.push(String::new());
    lines.push("Phase Distribution:".to_string());
    for (phase, count) in distribution(trials.iter().map(|t| t.phase.as_str())) {
        lines.push(format!("  {}: {} trials", phase, count));
    }

    lines.push(String::new());
    lines.push(rule.clone());
    lines.push("TRIAL DETAILS".to_string());
    lines.push(rule);
    lines.push(String::new());

    let mut ordered: Vec<&ClinicalTrial> = trials.iter().collect();
    ordered.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    for t in ordered {
        lines.push(format!("Trial ID: {}", t.nct_id));
        lines.push(format!("Title: {}", t.title));
        lines.push(format!("Status: {}", t.status));
        lines.push(format!("Phase: {}", t.phase));
        lines.push(format!("Sponsor: {}", t.sponsor));
        lines.push(format!("Enrollment: {} patients", t.enrollment));
        lines.push(format!(
            "Start: {} | Completion: {}",
            t.start_date, t.completion_date
        ));
        lines.push(format!("Key Biomarkers: {}", t.biomarkers.join(", ")));
        lines.push(format!("Link: {}", t.url));
        lines.push(String::new());
    }

    lines.join("\n")
}
