use chrono::{Local, Utc};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use votewatch::cache::CachedResult;
use votewatch::cli::{Cli, Command, HistoryArgs};
use votewatch::config::Config;
use votewatch::fetch::Fetcher;
use votewatch::record::DiffRow;
use votewatch::refresh::{self, RefreshOutcome};
use votewatch::report::{self, SortKey, TOP_N};
use votewatch::store::Store;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "votewatch=debug" } else { "warn" })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run the pipeline against the live site and cache the outcome.
/// Exits when the listing page cannot be loaded.
fn run_refresh(config: &Config) -> CachedResult<RefreshOutcome> {
    let fetcher = match Fetcher::new(config.timeout, config.delay) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut store = match Store::open(&config.db_path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(path = %config.db_path.display(), error = %e, "history database unavailable");
            None
        }
    };

    let now = Utc::now();
    match refresh::refresh(&fetcher, store.as_mut(), config, now) {
        Ok(outcome) => {
            let cached = CachedResult::new(outcome, now);
            if let Err(e) = cached.save(&config.cache_path) {
                warn!(path = %config.cache_path.display(), error = %e, "failed to cache refresh result");
            }
            cached
        }
        Err(e) => {
            eprintln!("Could not load data, the site may be unavailable.");
            eprintln!("  {e}");
            std::process::exit(1);
        }
    }
}

fn print_footer(cached: &CachedResult<RefreshOutcome>) {
    let updated = cached.computed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    println!("\nupdated: {updated} ({:.2}s)", cached.value.duration_ms as f64 / 1000.0);
}

fn print_history(config: &Config, args: &HistoryArgs) {
    let store = match Store::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening history {}: {e}", config.db_path.display());
            std::process::exit(1);
        }
    };

    if let Some(date) = args.date {
        match store.rows_on(date) {
            Ok(rows) => {
                if args.json {
                    println!("{}", report::json::render_snapshot(&rows));
                } else {
                    print!("{}", report::table::render_snapshot(&rows));
                }
            }
            Err(e) => {
                eprintln!("Error loading snapshot for {date}: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    match store.list_captures() {
        Ok(captures) => {
            if args.json {
                println!("{}", report::json::render_captures(&captures));
            } else {
                print!("{}", report::table::render_captures(&captures));
            }
        }
        Err(e) => {
            eprintln!("Error listing snapshots: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Refresh(args) => {
            let cached = run_refresh(&config);
            let rows: Vec<&DiffRow> = cached.value.rows.iter().collect();

            if args.json {
                println!("{}", report::json::render(&rows));
            } else {
                println!("Loaded {} projects.", rows.len());
                if !rows.is_empty() {
                    println!("\nTop {TOP_N} by votes");
                    print!("{}", report::table::render(&report::top_by_votes(&rows, TOP_N)));
                    println!("\nAll projects");
                    print!("{}", report::table::render(&rows));
                }
                print_footer(&cached);
            }

            report::print_notices(&cached.value, config.verbose);
        }
        Command::Show(args) => {
            let now = Utc::now();
            let fresh = CachedResult::<RefreshOutcome>::load(&config.cache_path)
                .filter(|cached| !cached.is_stale(now, config.cache_ttl));
            let refreshed = fresh.is_none();
            let cached = fresh.unwrap_or_else(|| run_refresh(&config));

            let query = args.search.as_deref().unwrap_or("");
            let mut rows = report::filter_by_title(&cached.value.rows, query);
            match args.top {
                Some(n) => rows = report::top_by_votes(&rows, n),
                None => report::sort_rows(&mut rows, args.sort),
            }

            if args.json {
                println!("{}", report::json::render(&rows));
            } else {
                if rows.is_empty() && !query.trim().is_empty() {
                    println!("No projects match '{query}'.");
                } else {
                    if args.top.is_none() && args.sort == SortKey::Delta {
                        println!("Projects by vote gain");
                    }
                    print!("{}", report::table::render(&rows));
                }
                print_footer(&cached);
            }

            // a cache hit already reported its notices when it was computed
            if refreshed {
                report::print_notices(&cached.value, config.verbose);
            }
        }
        Command::History(args) => print_history(&config, &args),
    }
}
