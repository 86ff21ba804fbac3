use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use route_dispatch::config::load_config;
use route_dispatch::routing::router::{compare_candidates, pick_best};
use route_dispatch::routing::{HeaderList, RouteTable};

#[derive(Parser)]
#[command(name = "route-check")]
#[command(about = "Show which route a request would be dispatched to", long_about = None)]
struct Cli {
    /// Route configuration file (TOML).
    #[arg(short, long)]
    config: PathBuf,

    /// Host header of the request.
    #[arg(long)]
    host: Option<String>,

    /// Request path.
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Request header as `Name: value`. Repeat for more headers, or for the
    /// same header sent more than once.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name must not be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[derive(Serialize)]
struct CandidateReport<'a> {
    route: &'a str,
    cluster: &'a str,
    eligible: bool,
    /// Position among eligible candidates, 1 = winner.
    rank: Option<usize>,
}

#[derive(Serialize)]
struct Report<'a> {
    selected: Option<&'a str>,
    rejected_routes: Vec<String>,
    candidates: Vec<CandidateReport<'a>>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let build = RouteTable::from_config(&config.routes);
    let headers: HeaderList = cli.headers.into_iter().collect();

    let candidates = build.table.evaluate(cli.host.as_deref(), &cli.path, &headers);
    let winner = pick_best(&candidates);

    let mut ranked: Vec<_> = candidates.iter().filter(|c| c.eligible).collect();
    ranked.sort_by(|a, b| compare_candidates(b, a));

    let report = Report {
        selected: winner.map(|r| r.name()),
        rejected_routes: build.rejected.iter().map(ToString::to_string).collect(),
        candidates: candidates
            .iter()
            .map(|c| CandidateReport {
                route: c.route.name(),
                cluster: c.route.cluster(),
                eligible: c.eligible,
                rank: ranked
                    .iter()
                    .position(|r| r.ordinal == c.ordinal)
                    .map(|p| p + 1),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if winner.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
