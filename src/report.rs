use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::config::ReportFormat;
use crate::error::Result;
use crate::matcher::MatchMethod;
use crate::resolver::{Resolution, ResolutionStatus};

const CSV_HEADER: [&str; 9] = [
    "file",
    "stem",
    "number",
    "catalog_id",
    "method",
    "status",
    "query",
    "colors",
    "note",
];

/// One CSV line per resolution, in `CSV_HEADER` order
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    file: String,
    stem: &'a str,
    number: Option<u64>,
    catalog_id: &'a str,
    method: &'static str,
    status: &'static str,
    query: &'a str,
    colors: String,
    note: &'a str,
}

impl<'a> From<&'a Resolution> for CsvRow<'a> {
    fn from(resolution: &'a Resolution) -> Self {
        Self {
            file: resolution.file.display().to_string(),
            stem: &resolution.stem,
            number: resolution.number,
            catalog_id: resolution.catalog_id.as_deref().unwrap_or(""),
            method: resolution.method.as_str(),
            status: resolution.status.as_str(),
            query: resolution.query.as_deref().unwrap_or(""),
            colors: format_colors(resolution),
            note: resolution.note.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    summary: &'a Summary,
    resolutions: &'a [Resolution],
}

/// `ID:Name:#RRGGBB` entries joined by `;`
pub fn format_colors(resolution: &Resolution) -> String {
    resolution
        .colors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// Counts per status and per match method
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_status: BTreeMap<ResolutionStatus, usize>,
    pub by_method: BTreeMap<MatchMethod, usize>,
}

impl Summary {
    pub fn from_resolutions(resolutions: &[Resolution]) -> Self {
        let mut summary = Summary {
            total: resolutions.len(),
            ..Default::default()
        };
        for resolution in resolutions {
            *summary.by_status.entry(resolution.status).or_insert(0) += 1;
            if resolution.status == ResolutionStatus::Resolved {
                *summary.by_method.entry(resolution.method).or_insert(0) += 1;
            }
        }
        summary
    }

    pub fn count(&self, status: ResolutionStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

pub struct ReportWriter<W: Write> {
    out: W,
    format: ReportFormat,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self { out, format }
    }

    pub fn write(self, resolutions: &[Resolution]) -> Result<W> {
        match self.format {
            ReportFormat::Csv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(self.out);
                writer.write_record(CSV_HEADER)?;
                for resolution in resolutions {
                    writer.serialize(CsvRow::from(resolution))?;
                }
                writer.flush()?;
                writer
                    .into_inner()
                    .map_err(|e| crate::error::PartMatchError::Io(e.into_error()))
            }
            ReportFormat::Json => {
                let summary = Summary::from_resolutions(resolutions);
                let report = JsonReport {
                    generated_at: Utc::now(),
                    summary: &summary,
                    resolutions,
                };
                let mut out = self.out;
                serde_json::to_writer_pretty(&mut out, &report)?;
                writeln!(out)?;
                Ok(out)
            }
        }
    }
}
