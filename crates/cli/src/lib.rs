use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use jsoncheck_core::{
    check_staged, CheckSummary, ConcurrencyLimit, Coordinator, CoordinatorConfig,
    ValidatorOptions,
};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "json-precommit")]
#[command(about = "Reject commits that stage malformed JSON files", long_about = None)]
#[command(version)]
struct Cli {
    /// Check these paths instead of the staged files (non-.json paths are skipped)
    #[arg(conflicts_with = "stdin")]
    paths: Vec<String>,

    /// Read candidate paths from stdin, one per line
    #[arg(long)]
    stdin: bool,

    /// Run as if started in DIR
    #[arg(short = 'C', long = "repo", value_name = "DIR")]
    repo: Option<PathBuf>,

    /// Reject trailing data after the first JSON value
    #[arg(long)]
    strict: bool,

    /// Maximum concurrent validations (overrides JSONCHECK_JOBS; default: unbounded)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Parses arguments, runs the check and returns the process exit code.
pub async fn main_entry() -> i32 {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(summary) => summary.exit_code(),
        Err(err) => {
            log::error!("{err:#}");
            1
        }
    }
}

async fn run(cli: Cli) -> Result<CheckSummary> {
    let limit = match cli.jobs {
        Some(jobs) => ConcurrencyLimit::bounded(jobs),
        None => ConcurrencyLimit::from_env(),
    };
    if let Some(jobs) = limit.jobs() {
        log::debug!("validating with at most {jobs} concurrent job(s)");
    }
    let config = CoordinatorConfig {
        base_dir: cli.repo.clone(),
        validator: ValidatorOptions { strict: cli.strict },
        limit,
    };

    if cli.stdin {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        return Coordinator::new(config)
            .run(stdin)
            .await
            .context("Failed to check paths from stdin");
    }
    if !cli.paths.is_empty() {
        return Coordinator::new(config)
            .run_paths(&cli.paths)
            .await
            .context("Failed to check paths");
    }
    check_staged(config, cli.repo.as_deref())
        .await
        .context("Failed to check staged files")
}

fn init_logger(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format(|buf, record| {
        let timestamp = buf.timestamp();
        let file = record
            .file()
            .map(|f| f.rsplit(['/', '\\']).next().unwrap_or(f))
            .unwrap_or("?");
        let message = record.args().to_string();
        // Multi-line diagnostics carry their own terminator.
        let newline = if message.ends_with('\n') { "" } else { "\n" };
        write!(
            buf,
            "{timestamp} {} {file}:{}: {message}{newline}",
            record.level(),
            record.line().unwrap_or(0)
        )
    });
    builder.target(env_logger::Target::Stderr).init();
}
