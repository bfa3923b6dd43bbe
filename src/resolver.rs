use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::catalog::{parse_known_colors, parse_search_results, CatalogSource, KnownColor, SearchHit};
use crate::config::MatchingConfig;
use crate::error::{PartMatchError, Result};
use crate::inventory::Inventory;
use crate::keywords::{build_query, model_keywords};
use crate::matcher::{candidates_from_hits, select_best, MatchMethod};
use crate::model::{file_stem, numeric_prefix, PartModel};
use crate::storage::CatalogCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Catalog ID found and its page fetched
    Resolved,
    /// Transient failure; retry in a later run
    Deferred,
    /// Nothing in the catalog matched
    Unmatched,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::Deferred => "deferred",
            ResolutionStatus::Unmatched => "unmatched",
        }
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching one local model against the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub file: PathBuf,
    pub stem: String,
    /// Numeric prefix of the stem; `None` when the file could not be read as a model
    pub number: Option<u64>,
    pub catalog_id: Option<String>,
    pub method: MatchMethod,
    pub status: ResolutionStatus,
    pub query: Option<String>,
    pub colors: Vec<KnownColor>,
    pub note: Option<String>,
}

impl Resolution {
    pub fn for_model(model: &PartModel) -> Self {
        Self {
            file: model.path.clone(),
            stem: model.stem.clone(),
            number: Some(model.number),
            catalog_id: None,
            method: MatchMethod::None,
            status: ResolutionStatus::Unmatched,
            query: None,
            colors: Vec::new(),
            note: None,
        }
    }

    /// Row for a file that could not be loaded as a part model
    pub fn unreadable(path: &Path, reason: impl std::fmt::Display) -> Self {
        let stem = file_stem(path).unwrap_or_default();
        Self {
            file: path.to_path_buf(),
            number: numeric_prefix(&stem),
            stem,
            catalog_id: None,
            method: MatchMethod::None,
            status: ResolutionStatus::Unmatched,
            query: None,
            colors: Vec::new(),
            note: Some(format!("unreadable model: {}", reason)),
        }
    }

    fn resolved(mut self, catalog_id: &str, method: MatchMethod, colors: Vec<KnownColor>) -> Self {
        self.catalog_id = Some(catalog_id.to_string());
        self.method = method;
        self.status = ResolutionStatus::Resolved;
        self.colors = colors;
        self
    }

    pub fn deferred(mut self, catalog_id: Option<&str>, method: MatchMethod, note: impl Into<String>) -> Self {
        self.catalog_id = catalog_id.map(str::to_string);
        self.method = method;
        self.status = ResolutionStatus::Deferred;
        self.note = Some(note.into());
        self
    }

    fn unmatched(mut self, note: impl Into<String>) -> Self {
        self.status = ResolutionStatus::Unmatched;
        self.note = Some(note.into());
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}

/// Runs the per-model pipeline: direct lookup, embedded ID, then search and ranking
pub struct Resolver<C: CatalogSource> {
    catalog: C,
    matching: MatchingConfig,
    inventory: Option<Inventory>,
    cache: CatalogCache,
}

impl<C: CatalogSource> Resolver<C> {
    pub fn new(catalog: C, matching: MatchingConfig) -> Self {
        Self {
            catalog,
            matching,
            inventory: None,
            cache: CatalogCache::new(),
        }
    }

    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_cache(mut self, cache: CatalogCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn cache(&self) -> &CatalogCache {
        &self.cache
    }

    /// Transport failures end the pipeline as `Deferred`, keeping whatever
    /// query and catalog ID had been worked out so far.
    pub async fn resolve(&mut self, model: &PartModel) -> Resolution {
        let mut resolution = Resolution::for_model(model);
        info!("Resolving {} (number {})", model.stem, model.number);

        match self.known_colors(&model.stem).await {
            Ok(Some(colors)) => return resolution.resolved(&model.stem, MatchMethod::Direct, colors),
            Ok(None) => {}
            Err(e) => return lookup_failed(resolution, None, MatchMethod::None, &e),
        }

        if let Some(embedded_id) = &model.embedded_id {
            info!("Model source specifies catalog ID {}", embedded_id);
            return match self.known_colors(embedded_id).await {
                Ok(Some(colors)) => resolution.resolved(embedded_id, MatchMethod::EmbeddedId, colors),
                Ok(None) => resolution.deferred(
                    Some(embedded_id.as_str()),
                    MatchMethod::EmbeddedId,
                    "catalog page unavailable, try again later",
                ),
                Err(e) => lookup_failed(resolution, Some(embedded_id.as_str()), MatchMethod::EmbeddedId, &e),
            };
        }

        let query = build_query(&model.title, &self.matching);
        resolution.query = Some(query.clone());
        if query.is_empty() {
            return resolution.unmatched("model title yields no search terms");
        }

        let hits = match self.search_hits(&query).await {
            Ok(Some(hits)) => hits,
            Ok(None) => {
                return resolution.deferred(
                    None,
                    MatchMethod::None,
                    "search unavailable, try again later",
                )
            }
            Err(e) if is_payload_error(&e) => {
                warn!("Unexpected search payload for '{}': {}", query, e);
                return resolution.unmatched(format!("unexpected search payload: {}", e));
            }
            Err(e) => return lookup_failed(resolution, None, MatchMethod::None, &e),
        };

        let keywords = model_keywords(&query, model);
        debug!("Keywords for {}: {:?}", model.stem, keywords);

        let candidates = candidates_from_hits(&hits);
        let Some(selection) = select_best(
            &candidates,
            &keywords,
            model.number,
            self.inventory.as_ref(),
            &self.matching,
        ) else {
            return resolution.unmatched(format!("no eligible match among {} hits", hits.len()));
        };

        info!(
            "Best match for {} is {} via {} (overlap {})",
            model.stem, selection.item_no, selection.method, selection.overlap
        );

        match self.known_colors(&selection.item_no).await {
            Ok(Some(colors)) => resolution.resolved(&selection.item_no, selection.method, colors),
            Ok(None) => resolution.deferred(
                Some(selection.item_no.as_str()),
                selection.method,
                "catalog page unavailable, try again later",
            ),
            Err(e) => lookup_failed(resolution, Some(selection.item_no.as_str()), selection.method, &e),
        }
    }

    /// Known colors of `item_no`, or `None` when its page is unavailable
    pub async fn known_colors(&mut self, item_no: &str) -> Result<Option<Vec<KnownColor>>> {
        if let Some(colors) = self.cache.get_page(item_no) {
            debug!("Cache hit for page {}", item_no);
            return Ok(Some(colors));
        }

        let Some(html) = self.catalog.part_page(item_no).await? else {
            return Ok(None);
        };

        let colors = parse_known_colors(&html);
        debug!("{} lists {} known colors", item_no, colors.len());
        self.cache.put_page(item_no, colors.clone());
        Ok(Some(colors))
    }

    async fn search_hits(&mut self, query: &str) -> Result<Option<Vec<SearchHit>>> {
        if let Some(hits) = self.cache.get_search(query) {
            debug!("Cache hit for search '{}'", query);
            return Ok(Some(hits));
        }

        let Some(body) = self.catalog.search(query).await? else {
            return Ok(None);
        };

        let hits = parse_search_results(&body)?;
        self.cache.put_search(query, hits.clone());
        Ok(Some(hits))
    }
}

fn is_payload_error(error: &PartMatchError) -> bool {
    matches!(
        error,
        PartMatchError::Json(_) | PartMatchError::UnexpectedResponse(_)
    )
}

fn lookup_failed(
    resolution: Resolution,
    catalog_id: Option<&str>,
    method: MatchMethod,
    error: &PartMatchError,
) -> Resolution {
    warn!("Lookup for {} failed: {}", resolution.stem, error);
    resolution.deferred(catalog_id, method, format!("lookup failed: {}", error))
}
