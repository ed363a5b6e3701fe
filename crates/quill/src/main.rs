use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quill::cli::commands::{self, Calculation};
use quill::config::Config;
use quill::models::Filter;

#[derive(Parser)]
#[command(name = "quill")]
#[command(
  about = "Quill - Product Catalog Q&A\nCitation-backed answers about audio equipment specifications"
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
  /// Config file (defaults to .quill.json, quill.json, ~/.quill/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Ollama base URL
  #[arg(long, global = true, env = "QUILL_OLLAMA_URL")]
  ollama_url: Option<String>,

  /// Catalog JSON file
  #[arg(long, global = true, env = "QUILL_CATALOG")]
  catalog: Option<PathBuf>,

  /// Print machine-readable JSON instead of formatted text
  #[arg(long, global = true)]
  json: bool,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ask a free-text question about the catalog
  Ask {
    /// Question words (space-separated)
    #[arg(required = true)]
    question: Vec<String>,
  },
  /// Show the full specifications for one model
  Specs {
    /// Model name, e.g. AM10/60
    model: String,
  },
  /// Semantic search with explicit filters
  Search {
    /// Query words (space-separated)
    #[arg(required = true)]
    query: Vec<String>,
    /// Minimum power in watts
    #[arg(long)]
    min_watts: Option<i64>,
    /// Maximum power in watts
    #[arg(long)]
    max_watts: Option<i64>,
    /// 70V, 100V, 70V/100V or Low-Z
    #[arg(long)]
    voltage: Option<String>,
    #[arg(short, long)]
    category: Option<String>,
    #[arg(long)]
    series: Option<String>,
    #[arg(short, long, default_value_t = 10)]
    limit: usize,
  },
  /// Find products similar to a model
  Similar {
    model: String,
    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,
  },
  /// List model names
  Models {
    /// Only models in this category
    #[arg(short, long)]
    category: Option<String>,
    #[arg(short, long)]
    limit: Option<usize>,
  },
  /// Compare two or more models side by side
  Compare {
    #[arg(required = true, num_args = 2..)]
    models: Vec<String>,
  },
  /// Show catalog counts
  Stats,
  /// Run an electrical calculation directly
  Calc {
    #[command(subcommand)]
    calculation: CalcCommand,
  },
}

#[derive(Subcommand)]
enum CalcCommand {
  /// Check speaker load against transformer or amplifier capacity
  Compat {
    /// Capacity in watts
    #[arg(long)]
    capacity: i64,
    /// Speaker tap wattages
    #[arg(required = true)]
    speakers: Vec<i64>,
  },
  /// Combine speaker impedances
  Impedance {
    /// series or parallel
    #[arg(long, default_value = "parallel")]
    connection: String,
    /// Impedances in ohms
    #[arg(required = true)]
    values: Vec<f64>,
  },
  /// Recommend a standard transformer size for a speaker load
  Transformer {
    #[arg(required = true)]
    speakers: Vec<i64>,
  },
  /// Pick the speaker tap for a level reduction
  Tap {
    /// Speaker full power in watts
    #[arg(long)]
    full_power: f64,
    /// Reduction in dB
    #[arg(long, allow_negative_numbers = true)]
    reduction_db: f64,
  },
  /// How many speakers of one wattage a capacity supports
  Units {
    #[arg(long)]
    capacity: i64,
    /// Watts per speaker
    #[arg(long)]
    unit_watts: i64,
    /// Spare capacity to keep, percent
    #[arg(long, default_value_t = quill::calculator::RECOMMENDED_HEADROOM_PERCENT)]
    headroom: f64,
  },
}

impl From<CalcCommand> for Calculation {
  fn from(command: CalcCommand) -> Self {
    match command {
      CalcCommand::Compat { capacity, speakers } => Calculation::Compatibility { speakers, capacity },
      CalcCommand::Impedance { connection, values } => Calculation::Impedance { values, connection },
      CalcCommand::Transformer { speakers } => Calculation::Transformer { speakers },
      CalcCommand::Tap { full_power, reduction_db } => Calculation::Tap { full_power, reduction_db },
      CalcCommand::Units { capacity, unit_watts, headroom } => {
        Calculation::Units { capacity, unit_watts, headroom_percent: headroom }
      }
    }
  }
}

fn load_config(cli: &Cli) -> Result<Config> {
  let mut config = match &cli.config {
    Some(path) => Config::load_from_file(path)?,
    None => Config::load()?,
  };
  if let Some(url) = &cli.ollama_url {
    config.ollama_base_url = url.clone();
  }
  if let Some(catalog) = &cli.catalog {
    config.catalog_path = catalog.clone();
  }
  config.validate()?;
  Ok(config)
}

async fn dispatch(command: Command, config: &Config, json: bool) -> Result<()> {
  if let Command::Calc { calculation } = command {
    return commands::calculate(calculation.into(), json);
  }

  let engine = commands::build_engine(config).await?;
  match command {
    Command::Ask { question } => commands::ask(&engine, &question.join(" "), json).await,
    Command::Specs { model } => commands::specs(&engine, &model, json).await,
    Command::Search { query, min_watts, max_watts, voltage, category, series, limit } => {
      let filter = Filter { min_watts, max_watts, voltage_type: voltage, category, series };
      commands::search(&engine, &query.join(" "), filter, limit, json).await
    }
    Command::Similar { model, limit } => commands::similar(&engine, &model, limit, json).await,
    Command::Models { category, limit } => {
      commands::models(&engine, category.as_deref(), limit, json).await
    }
    Command::Compare { models } => commands::compare(&engine, &models, json).await,
    Command::Stats => commands::stats(&engine, json).await,
    Command::Calc { calculation } => commands::calculate(calculation.into(), json),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  bentley::init_tracing(cli.verbose);

  let config = load_config(&cli)?;
  dispatch(cli.command, &config, cli.json).await
}
