use anyhow::Result;
use bassline_search::{render, SearchEngine, DEFAULT_MAX_RESULTS};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "bassline-search")]
#[command(about = "Query the full-text index for an exact phrase", long_about = None)]
struct Args {
    /// Index artifact path
    #[arg(long, default_value = "./search_index.json")]
    index: PathBuf,
    /// Maximum number of results
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,
    /// Print the raw JSON response instead of the readable rendering
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Phrase words, joined with spaces
    #[arg(required = true, trailing_var_arg = true)]
    phrase: Vec<String>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let engine = SearchEngine::open(&args.index)?;
    let query = args.phrase.join(" ");
    let response = engine.search(&query, args.max_results)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", render(&response));
    }
    Ok(())
}
