use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::error::CatalogResult;
use crate::models::{ImportReport, LineOutcome};

const HEADER: [&str; 8] = [
    "tenant_id",
    "invoice_id",
    "line_number",
    "outcome",
    "entry_id",
    "internal_code",
    "confidence",
    "detail",
];

/// 将导入结果逐行导出为 CSV (每个发票行一条记录)
pub fn export_outcomes_csv(reports: &[ImportReport], output_path: &Path) -> CatalogResult<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);
    writer.write_record(HEADER)?;

    for report in reports {
        for line in &report.lines {
            let (entry_id, internal_code, confidence, detail) = outcome_columns(&line.outcome);
            writer.write_record([
                report.tenant_id.clone(),
                report.invoice_id.clone(),
                line.line_number.to_string(),
                line.outcome.kind().to_string(),
                entry_id,
                internal_code,
                confidence,
                detail,
            ])?;
        }
    }

    writer.flush()?;
    tracing::info!(
        "[Import] 导出 {} 张发票的匹配结果到 {}",
        reports.len(),
        output_path.display()
    );
    Ok(())
}

fn outcome_columns(outcome: &LineOutcome) -> (String, String, String, String) {
    match outcome {
        LineOutcome::Consolidated {
            entry_id,
            internal_code,
            confidence,
            method,
        } => (
            entry_id.to_string(),
            internal_code.clone(),
            format!("{:.4}", confidence),
            method.as_str().to_string(),
        ),
        LineOutcome::Created {
            entry_id,
            internal_code,
        } => (
            entry_id.to_string(),
            internal_code.clone(),
            String::new(),
            String::new(),
        ),
        LineOutcome::PendingReview { suggestion, reason } => match suggestion {
            Some(s) => (
                s.entry_id.to_string(),
                s.internal_code.clone(),
                format!("{:.4}", s.confidence),
                reason.clone(),
            ),
            None => (String::new(), String::new(), String::new(), reason.clone()),
        },
        LineOutcome::Skipped { reason } => {
            (String::new(), String::new(), String::new(), reason.clone())
        }
        LineOutcome::AlreadyProcessed { status } => (
            String::new(),
            String::new(),
            String::new(),
            status.as_str().to_string(),
        ),
        LineOutcome::Failed { error } => {
            (String::new(), String::new(), String::new(), error.clone())
        }
    }
}
