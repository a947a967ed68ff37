use std::path::PathBuf;

use tracing::info;

use serp_scout::{config, SearchEngine, SearchOptions, SearchQuery};

struct CliArgs {
    query: String,
    limit: usize,
    timeout_ms: u64,
    state_file: Option<PathBuf>,
    no_save_state: bool,
    locale: Option<String>,
    headed: bool,
}

fn print_usage() {
    eprintln!(
        "serp-scout: adaptive SERP retrieval\n\n\
         Usage: serp-scout <query…> [options]\n\n\
         Options:\n\
         \x20 --limit <N>          max results (default {})\n\
         \x20 --timeout <MS>       per-operation timeout in ms (default {})\n\
         \x20 --state-file <PATH>  state file path (default {})\n\
         \x20 --no-save-state      do not persist session state\n\
         \x20 --locale <TAG>       locale hint for fingerprint synthesis\n\
         \x20 --headed             deprecated: start with a visible window\n\
         \x20 --help               show this help",
        config::DEFAULT_RESULT_LIMIT,
        config::CLI_DEFAULT_TIMEOUT_MS,
        config::default_state_file().display(),
    );
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        query: String::new(),
        limit: config::DEFAULT_RESULT_LIMIT,
        timeout_ms: config::CLI_DEFAULT_TIMEOUT_MS,
        state_file: None,
        no_save_state: false,
        locale: None,
        headed: false,
    };

    let mut query_parts: Vec<&str> = Vec::new();
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut take_value = |inline: Option<&str>, name: &str| -> Result<String, String> {
            match inline {
                Some(v) => Ok(v.to_string()),
                None => it
                    .next()
                    .map(|v| v.to_string())
                    .ok_or_else(|| format!("missing value for {name}")),
            }
        };

        if arg == "--help" || arg == "-h" {
            return Err(String::new());
        } else if arg == "--no-save-state" {
            parsed.no_save_state = true;
        } else if arg == "--headed" {
            parsed.headed = true;
        } else if arg == "--limit" || arg.starts_with("--limit=") {
            let v = take_value(arg.strip_prefix("--limit="), "--limit")?;
            parsed.limit = v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("--limit must be a positive integer, got '{v}'"))?;
        } else if arg == "--timeout" || arg.starts_with("--timeout=") {
            let v = take_value(arg.strip_prefix("--timeout="), "--timeout")?;
            parsed.timeout_ms = v
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("--timeout must be a positive integer, got '{v}'"))?;
        } else if arg == "--state-file" || arg.starts_with("--state-file=") {
            let v = take_value(arg.strip_prefix("--state-file="), "--state-file")?;
            parsed.state_file = Some(PathBuf::from(v));
        } else if arg == "--locale" || arg.starts_with("--locale=") {
            parsed.locale = Some(take_value(arg.strip_prefix("--locale="), "--locale")?);
        } else if arg.starts_with("--") {
            return Err(format!("unknown option '{arg}'"));
        } else {
            query_parts.push(arg.as_str());
        }
    }

    parsed.query = query_parts.join(" ");
    if parsed.query.trim().is_empty() {
        return Err("a non-empty query is required".to_string());
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}\n");
            }
            print_usage();
            std::process::exit(2);
        }
    };

    let mut query = SearchQuery::new(args.query)
        .with_limit(args.limit)
        .with_timeout_ms(args.timeout_ms);
    if let Some(locale) = args.locale {
        query = query.with_locale(locale);
    }

    let mut options = SearchOptions::default();
    if let Some(state_file) = args.state_file {
        options.state_file = state_file;
    }
    options.persist_state = !args.no_save_state;
    if args.headed {
        info!("--headed is deprecated; the engine escalates to a window on its own");
        options.headless = Some(false);
    }

    let engine = SearchEngine::new(options);
    let response = engine.search(&query).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}
