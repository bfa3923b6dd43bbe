use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::{Duration, Instant};
use tracing::info;

use crate::{
    catalog::CatalogClient,
    cli_types::{ColorsArgs, InspectArgs, ResolveArgs},
    config::CliConfig,
    inventory::Inventory,
    keywords::{build_query, model_keywords},
    model::PartModel,
    report::{ReportWriter, Summary},
    resolver::{Resolution, Resolver},
    scanner::ModelScanner,
    storage::CatalogCache,
    ui::UIManager,
};

pub struct CliApp {
    config: CliConfig,
    scanner: ModelScanner,
    verbose: bool,
    ui: UIManager,
}

impl CliApp {
    pub fn new(config: CliConfig, verbose: bool, colors_enabled: bool) -> Result<Self> {
        info!("Initializing partmatch CLI");

        let ui = UIManager::new(colors_enabled && config.output.colors).quiet(config.output.quiet);
        let scanner = ModelScanner::new(&config.scan).context("Failed to create model scanner")?;

        Ok(Self {
            config,
            scanner,
            verbose,
            ui,
        })
    }

    pub async fn resolve(&self, args: ResolveArgs) -> Result<Vec<Resolution>> {
        let start_time = Instant::now();
        self.ui.print_header("Catalog Resolution");

        let paths = self
            .scanner
            .collect(&args.files, args.list.as_deref(), &args.dirs)
            .await
            .context("Failed to collect model files")?;

        if paths.is_empty() {
            self.ui.print_warning("No model files given. Pass files, --list or --dir.");
            return Ok(Vec::new());
        }

        if self.verbose {
            self.ui.print_info(&format!("Resolving {} model files", paths.len()));
        }

        let client = CatalogClient::new(&self.config.catalog).context("Failed to create catalog client")?;
        let mut resolver = Resolver::new(client, self.config.matching.clone())
            .with_cache(CatalogCache::from_config(&self.config.cache));

        if let Some(inventory_path) = &args.inventory {
            let inventory = Inventory::load(inventory_path)
                .await
                .with_context(|| format!("Failed to load inventory: {}", inventory_path.display()))?;
            self.ui.print_info(&format!("Inventory holds {} catalog IDs", inventory.len()));
            resolver = resolver.with_inventory(inventory);
        }

        let delay = args
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.request_delay());

        let progress = self.ui.create_progress(paths.len() as u64);
        let mut resolutions = Vec::with_capacity(paths.len());

        for (index, path) in paths.iter().enumerate() {
            progress.set_message(path.display().to_string());

            let resolution = match PartModel::load(path).await {
                Ok(model) => resolver.resolve(&model).await,
                Err(e) => {
                    progress.suspend(|| {
                        self.ui.print_warning(&format!("Cannot read {}: {}", path.display(), e))
                    });
                    Resolution::unreadable(path, e)
                }
            };

            progress.suspend(|| self.ui.print_info(&self.ui.format_resolution(&resolution)));
            resolutions.push(resolution);
            progress.inc(1);

            if index + 1 < paths.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        progress.finish_and_clear();

        let format = args.format.unwrap_or(self.config.output.format);
        match &args.output {
            Some(output) => {
                let file = File::create(output)
                    .with_context(|| format!("Failed to create report: {}", output.display()))?;
                ReportWriter::new(BufWriter::new(file), format)
                    .write(&resolutions)
                    .context("Failed to write report")?
                    .flush()?;
                self.ui.print_success(&format!("Report written to {}", output.display()));
            }
            None => {
                let stdout = io::stdout();
                ReportWriter::new(stdout.lock(), format)
                    .write(&resolutions)
                    .context("Failed to write report")?
                    .flush()?;
            }
        }

        let summary = Summary::from_resolutions(&resolutions);
        self.ui.print_info(&self.ui.format_summary(&summary));

        if self.verbose {
            let cache = resolver.cache().get_metadata();
            self.ui.print_info(&format!(
                "Cache: {} hits, {} misses",
                cache.cache_hits, cache.cache_misses
            ));
        }
        self.ui.print_success(&format!("Total time: {:?}", start_time.elapsed()));

        Ok(resolutions)
    }

    pub async fn inspect(&self, args: InspectArgs) -> Result<()> {
        self.ui.print_header("Model");

        let model = PartModel::load(&args.file)
            .await
            .with_context(|| format!("Failed to read model: {}", args.file.display()))?;
        let query = build_query(&model.title, &self.config.matching);
        let keywords = model_keywords(&query, &model);

        println!("file:        {}", model.path.display());
        println!("stem:        {}", model.stem);
        println!("number:      {}", model.number);
        println!("title:       {}", model.title);
        println!(
            "embedded id: {}",
            model.embedded_id.as_deref().unwrap_or("-")
        );
        println!("query:       {}", query);
        println!(
            "keywords:    {}",
            keywords.iter().cloned().collect::<Vec<_>>().join(" ")
        );

        Ok(())
    }

    pub async fn colors(&self, args: ColorsArgs) -> Result<()> {
        self.ui.print_header(&format!("Known colors of {}", args.item_no));

        let client = CatalogClient::new(&self.config.catalog).context("Failed to create catalog client")?;
        let mut resolver = Resolver::new(client, self.config.matching.clone())
            .with_cache(CatalogCache::from_config(&self.config.cache));

        match resolver
            .known_colors(&args.item_no)
            .await
            .with_context(|| format!("Failed to fetch {}", args.item_no))?
        {
            Some(colors) if colors.is_empty() => {
                self.ui.print_warning("The catalog page lists no colors");
            }
            Some(colors) => {
                println!("{}", self.ui.format_colors(&colors));
            }
            None => {
                self.ui.print_error(&format!(
                    "No catalog page for {}; try again later or check the item number",
                    args.item_no
                ));
            }
        }

        Ok(())
    }

    pub fn show_config(&self) -> Result<()> {
        self.ui.print_header("Configuration");
        println!("{}", self.config.to_toml()?);

        match CliConfig::user_config_path() {
            Some(path) => self.ui.print_info(&format!("User config file: {}", path.display())),
            None => self.ui.print_info("User config file: unavailable on this platform"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolutionStatus;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(base_url: &str) -> CliConfig {
        let mut config = CliConfig::default();
        config.catalog.base_url = base_url.to_string();
        config.catalog.request_delay_ms = 0;
        config.catalog.initial_backoff_ms = 1;
        config.catalog.max_backoff_ms = 2;
        config
    }

    fn create_test_model(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let file_path = dir.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    const PAGE: &str = r##"<table class="pciColorInfoTable"><tr><td>
        <span class="pciColorTabListItem" style="background-color: #F2CD37;"></span>
        <a href="?colorID=3">Yellow</a>
    </td></tr></table>"##;

    #[test]
    fn test_cli_app_creation() {
        let app = CliApp::new(CliConfig::default(), false, false);
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_without_inputs() {
        let app = CliApp::new(CliConfig::default(), false, false).unwrap();
        let resolutions = app.resolve(ResolveArgs::default()).await.unwrap();
        assert!(resolutions.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_writes_csv_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/catalog/catalogitem.page"))
            .and(query_param("P", "3626bp01"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/catalog/catalogitem.page"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let temp_dir = TempDir::new().unwrap();
        let found = create_test_model(&temp_dir, "3626bp01.dat", "0 Minifig Head Smile\n");
        let invalid = create_test_model(&temp_dir, "head.dat", "0 Minifig Head\n");
        let report = temp_dir.path().join("report.csv");

        let app = CliApp::new(create_test_config(&server.uri()), false, false).unwrap();
        let resolutions = app
            .resolve(ResolveArgs {
                files: vec![found, invalid],
                output: Some(report.clone()),
                ..ResolveArgs::default()
            })
            .await
            .unwrap();

        // the model without a numeric prefix still gets a row
        assert_eq!(resolutions.len(), 2);
        assert!(resolutions[0].is_resolved());
        assert_eq!(resolutions[1].status, ResolutionStatus::Unmatched);
        assert_eq!(resolutions[1].number, None);

        let csv = fs::read_to_string(&report).unwrap();
        assert!(csv.starts_with("file,stem,number,catalog_id,method,status,query,colors,note\n"));
        assert!(csv.contains("3626bp01,3626,3626bp01,direct,resolved,,3:Yellow:#F2CD37,"));
        assert!(csv.contains("head,,,none,unmatched,,,unreadable model:"));
    }

    #[tokio::test]
    async fn test_resolve_report_for_unreadable_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("3626gone.dat");
        let report = temp_dir.path().join("report.csv");

        let mut config = create_test_config("http://127.0.0.1:9");
        config.output.quiet = true;
        let app = CliApp::new(config, false, false).unwrap();
        let resolutions = app
            .resolve(ResolveArgs {
                files: vec![missing],
                output: Some(report.clone()),
                ..ResolveArgs::default()
            })
            .await
            .unwrap();

        assert_eq!(resolutions.len(), 1);
        assert_eq!(resolutions[0].number, Some(3626));
        assert!(resolutions[0].note.as_deref().unwrap().starts_with("unreadable model: I/O error"));

        let csv = fs::read_to_string(&report).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "file,stem,number,catalog_id,method,status,query,colors,note");
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn test_inspect_model() {
        let temp_dir = TempDir::new().unwrap();
        let file = create_test_model(
            &temp_dir,
            "3626bp01.dat",
            "0 Minifig Head Smile Pattern\n0 !KEYWORDS Bricklink 3626bpb0001\n",
        );
        let app = CliApp::new(CliConfig::default(), false, false).unwrap();
        assert!(app.inspect(InspectArgs { file }).await.is_ok());
    }

    #[tokio::test]
    async fn test_inspect_missing_file() {
        let app = CliApp::new(CliConfig::default(), false, false).unwrap();
        let result = app
            .inspect(InspectArgs {
                file: PathBuf::from("nonexistent/3626bp01.dat"),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_colors_for_missing_item() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let app = CliApp::new(create_test_config(&server.uri()), false, false).unwrap();
        let result = app
            .colors(ColorsArgs {
                item_no: "3626zz".to_string(),
            })
            .await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_config_display() {
        let app = CliApp::new(CliConfig::default(), false, false).unwrap();
        assert!(app.show_config().is_ok());
    }
}
