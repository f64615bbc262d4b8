use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use funda_scraper::{
    FetchStrategy, ListingCollector, LogObserver, OutputFormat, PageFetcher, ScraperConfig, output,
};

#[derive(Debug, Parser)]
#[command(
    name = "funda-scraper",
    version,
    about = "Scrape funda.nl listings into a CSV or JSON file"
)]
struct Cli {
    /// Listing-search page to start from
    #[arg(value_name = "INDEX_URL")]
    index_url: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// How to fetch the index page
    #[arg(long, value_enum)]
    index_strategy: Option<FetchStrategy>,

    /// Number of listing pages fetched at once
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Show the browser window while loading the index page
    #[arg(long)]
    headed: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<ScraperConfig> {
        let mut config = match &self.config {
            Some(path) => ScraperConfig::from_file(path)?,
            None => ScraperConfig::default(),
        };

        if let Some(index_url) = self.index_url {
            config.index_url = index_url;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(strategy) = self.index_strategy {
            config.index_strategy = strategy;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.headed {
            config.browser.headless = false;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config = cli.into_config()?;
    log::info!("Starting funda scraper for {}", config.index_url);

    let fetcher = Arc::new(PageFetcher::from_config(&config)?);
    let collector =
        ListingCollector::from_config(fetcher, &config).with_observer(Arc::new(LogObserver));

    let records = match collector.collect(&config.index_url).await {
        Ok(records) => records,
        Err(e) => {
            log::error!("Failed to load the main page: {}", e);
            std::process::exit(1);
        }
    };

    output::save(&records, &config.index_url, &config.output, config.format)?;
    log::info!("Data saved to {}", config.output.display());

    Ok(())
}
