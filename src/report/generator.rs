//! Report generation.
//!
//! This module is the presentation boundary: it formats confidences as
//! percentages and renders the diagnosis as Markdown or JSON.

use crate::analysis::ranked;
use crate::models::{Candidate, DiagnosisReport, ErrorReport, ImagePaths, Modality};
use crate::pipeline::Outcome;
use anyhow::Result;
use chrono::Utc;

/// Render a `[0, 1]` confidence as a two-decimal percentage, e.g. `80.00%`.
///
/// Values outside the range are clamped.
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.2}%", confidence.clamp(0.0, 1.0) * 100.0)
}

/// Build the serializable report for a successful outcome.
pub fn build_report(outcome: &Outcome, images: ImagePaths) -> DiagnosisReport {
    let candidates = ranked(&outcome.ledger)
        .into_iter()
        .map(|entry| Candidate {
            label: entry.label(),
            confidence: format_confidence(entry.confidence()),
            modalities: entry.contributors().iter().copied().collect(),
        })
        .collect();

    DiagnosisReport {
        prediction: outcome.diagnosis.label,
        confidence: format_confidence(outcome.diagnosis.confidence),
        used_models: outcome
            .diagnosis
            .contributing_modalities
            .iter()
            .copied()
            .collect(),
        explanation: outcome.explanation.to_string(),
        images,
        candidates,
        modality_errors: outcome
            .failures
            .iter()
            .map(|(modality, e)| (*modality, e.to_string()))
            .collect(),
        generated_at: Utc::now(),
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DiagnosisReport) -> String {
    let mut output = String::new();

    output.push_str("# RetinaDx Report\n\n");
    output.push_str(&generate_diagnosis_section(report));
    output.push_str(&generate_explanation_section(&report.explanation));
    output.push_str(&generate_candidates_section(&report.candidates));
    output.push_str(&generate_inputs_section(report));
    output.push_str(&generate_footer(report));

    output
}

fn generate_diagnosis_section(report: &DiagnosisReport) -> String {
    let mut section = String::new();

    section.push_str("## Diagnosis\n\n");
    section.push_str("| Prediction | Confidence | Based on |\n");
    section.push_str("|:---|:---:|:---|\n");
    section.push_str(&format!(
        "| **{}** | {} | {} |\n\n",
        report.prediction,
        report.confidence,
        join_modalities(&report.used_models)
    ));

    section
}

fn generate_explanation_section(explanation: &str) -> String {
    format!("## Explanation\n\n{}\n\n", explanation)
}

/// Every label either model voted for.
fn generate_candidates_section(candidates: &[Candidate]) -> String {
    if candidates.len() < 2 {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Candidates\n\n");
    section.push_str("| Label | Confidence | Models |\n");
    section.push_str("|:---|:---:|:---|\n");
    for candidate in candidates {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            candidate.label,
            candidate.confidence,
            join_modalities(&candidate.modalities)
        ));
    }
    section.push('\n');

    section
}

fn generate_inputs_section(report: &DiagnosisReport) -> String {
    let mut section = String::new();

    section.push_str("## Inputs\n\n");
    for modality in Modality::ALL {
        let path = match modality {
            Modality::Oct => &report.images.oct,
            Modality::Fundus => &report.images.fundus,
        };
        let status = match report.modality_errors.get(&modality) {
            Some(error) => format!("⚠️ ignored: {}", error),
            None => "✅ classified".to_string(),
        };
        section.push_str(&format!("- **{}:** `{}` ({})\n", modality, path, status));
    }
    section.push('\n');

    section
}

fn generate_footer(report: &DiagnosisReport) -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated {} by RetinaDx. Not a substitute for examination by an ophthalmologist.*\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    footer
}

fn join_modalities(modalities: &[Modality]) -> String {
    modalities
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DiagnosisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Generate a JSON error body, `{"error": "..."}`.
pub fn generate_json_error(message: &str) -> Result<String> {
    let body = ErrorReport {
        error: message.to_string(),
    };
    serde_json::to_string_pretty(&body).map_err(Into::into)
}

/// Generate a Markdown error report.
pub fn generate_markdown_error(message: &str) -> String {
    format!("# RetinaDx Report\n\n## Error\n\n{}\n", message)
}
