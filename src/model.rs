use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{PartMatchError, Result};

static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]+)").unwrap());
static KEYWORDS_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^0 !KEYWORDS (.+)$").unwrap());
static BRICKLINK_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bBricklink\b(.*)$").unwrap());
static CATALOG_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b([0-9]+[a-z0-9]*)\b").unwrap());

/// A local part-model file reduced to the metadata used for catalog matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartModel {
    pub path: PathBuf,
    /// File name up to the first `.`
    pub stem: String,
    /// Leading digits of the stem
    pub number: u64,
    /// Title line without its line-type token
    pub title: String,
    /// Payloads of all `0 !KEYWORDS` lines
    pub keyword_lines: Vec<String>,
    /// Catalog ID declared in the keywords, if any
    pub embedded_id: Option<String>,
}

impl PartModel {
    pub async fn load(path: &Path) -> Result<Self> {
        let source = tokio::fs::read_to_string(path).await?;
        Self::parse(path, &source)
    }

    pub fn parse(path: &Path, source: &str) -> Result<Self> {
        let stem = file_stem(path)
            .ok_or_else(|| PartMatchError::invalid_model(path.display().to_string(), "no file name"))?;

        let number = numeric_prefix(&stem).ok_or_else(|| {
            PartMatchError::invalid_model(
                path.display().to_string(),
                format!("'{}' has no numeric prefix", stem),
            )
        })?;

        let title = source
            .lines()
            .next()
            .map(|line| {
                line.split(' ')
                    .skip(1)
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim_end()
                    .to_string()
            })
            .unwrap_or_default();

        let keyword_lines: Vec<String> = KEYWORDS_LINE
            .captures_iter(source)
            .map(|caps| caps[1].trim_end().to_string())
            .collect();

        let embedded_id = embedded_catalog_id(&keyword_lines, number, path);

        debug!(
            "Parsed model {} (number {}, {} keyword lines, embedded id {:?})",
            stem,
            number,
            keyword_lines.len(),
            embedded_id
        );

        Ok(Self {
            path: path.to_path_buf(),
            stem,
            number,
            title,
            keyword_lines,
            embedded_id,
        })
    }
}

/// File name up to the first `.`
pub fn file_stem(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let stem = name.split('.').next().unwrap_or(name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// First catalog ID after a `Bricklink` marker that shares the model's prefix.
///
/// Every keyword line is searched; IDs with another prefix are skipped.
fn embedded_catalog_id(keyword_lines: &[String], number: u64, path: &Path) -> Option<String> {
    for line in keyword_lines {
        let Some(tail) = BRICKLINK_TAIL.captures(line).and_then(|caps| caps.get(1)) else {
            continue;
        };
        for caps in CATALOG_ID.captures_iter(tail.as_str()) {
            let id = caps[1].to_lowercase();
            if numeric_prefix(&id) == Some(number) {
                return Some(id);
            }
            warn!(
                "Ignoring embedded catalog ID {} in {}: prefix does not match {}",
                id,
                path.display(),
                number
            );
        }
    }
    None
}

/// Leading decimal digits of an item number, e.g. `3626` for `3626bpb0123`
pub fn numeric_prefix(text: &str) -> Option<u64> {
    NUMERIC_PREFIX
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}
