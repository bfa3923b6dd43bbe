pub mod error;
pub mod config;
pub mod model;
pub mod keywords;
pub mod catalog;
pub mod inventory;
pub mod matcher;
pub mod resolver;
pub mod storage;
pub mod report;
pub mod scanner;
pub mod ui;
pub mod cli;
pub mod cli_types;

// Re-export commonly used types
pub use catalog::{CatalogClient, CatalogSource, KnownColor, SearchHit};
pub use config::{CliConfig, ReportFormat};
pub use error::{PartMatchError, Result};
pub use inventory::Inventory;
pub use matcher::{select_best, Candidate, MatchMethod, Selection};
pub use model::PartModel;
pub use report::{ReportWriter, Summary};
pub use resolver::{Resolution, ResolutionStatus, Resolver};
pub use storage::memory::CatalogCache;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
