//! Command-line entry points.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::config::CrawlConfig;
use crate::summary::RunSummary;
use crate::testkit::{assemble_crawl, demo_site};

#[derive(Parser, Debug)]
#[command(name = "webrover", about = "Multi-agent exhaustive site crawler", version)]
pub struct Cli {
    /// Configuration file (YAML); defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Log level (error, warn, info, debug, trace). RUST_LOG overrides.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the built-in scripted demo site and print the run summary.
    Demo,
    /// Print the effective configuration as YAML.
    Config,
}

impl Cli {
    fn load_config(&self) -> Result<CrawlConfig> {
        Ok(match &self.config {
            Some(path) => CrawlConfig::from_file(path)?,
            None => CrawlConfig::default(),
        })
    }

    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;
        match self.command {
            Command::Demo => run_demo(config, self.output).await,
            Command::Config => {
                print!("{}", serde_yaml::to_string(&config)?);
                Ok(())
            }
        }
    }
}

async fn run_demo(mut config: CrawlConfig, output: OutputFormat) -> Result<()> {
    config.start_url = "https://demo.rover/home".into();

    let run_id = RunSummary::new_run_id();
    let started_at = Utc::now();
    info!(run_id = %run_id, start_url = %config.start_url, "starting demo crawl");

    let harness = assemble_crawl(demo_site(), config).await;
    let report = harness.driver.run().await;

    let summary = RunSummary::build(run_id, started_at, &harness.memory, &report);
    match output {
        OutputFormat::Text => print!("{}", summary.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if !summary.completed() {
        anyhow::bail!("crawl did not run to completion");
    }
    Ok(())
}
