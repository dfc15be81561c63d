use std::fs;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::Serialize;

use h2h_predictor::analysis::H2hAnalyzer;
use h2h_predictor::config::Settings;
use h2h_predictor::logging;
use h2h_predictor::refresh::Refresher;
use h2h_predictor::repository::{CachedRepository, FileRepository, TeamRepository};
use h2h_predictor::sofascore::SofascoreFeed;

const USAGE: &str = "usage:
  h2h_predictor analyze <league> <team1> <team2>
  h2h_predictor markets <league> <home> <away>
  h2h_predictor leagues
  h2h_predictor teams <league>
  h2h_predictor refresh [<league>] [--force]
  h2h_predictor import <league> <team name> <file>
  h2h_predictor create-league <name> [--league-id X] [--season-id Y] [--country Z]";

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some((command, rest)) = args.split_first() else {
        return Err(anyhow!("missing command\n{USAGE}"));
    };

    let repo = CachedRepository::new(FileRepository::new(settings.leagues_dir()));

    match command.as_str() {
        "analyze" => {
            let [league, team1, team2] = positional::<3>(rest)?;
            let report = H2hAnalyzer::new(repo).analyze(league, team1, team2)?;
            print_json(&report)
        }
        "markets" => {
            let [league, home, away] = positional::<3>(rest)?;
            let report = H2hAnalyzer::new(repo).markets(league, home, away)?;
            print_json(&report)
        }
        "leagues" => print_json(&repo.list_leagues()?),
        "teams" => {
            let [league] = positional::<1>(rest)?;
            print_json(&repo.list_teams(league)?)
        }
        "refresh" => {
            let force = rest.iter().any(|a| a == "--force");
            let league = rest.iter().find(|a| !a.starts_with("--")).map(String::as_str);
            let feed = SofascoreFeed::from_settings(&settings);
            let refresher =
                Refresher::new(&repo, &feed, settings.update_interval, settings.refresh_delay);
            let report = refresher.run(league, force, Utc::now())?;
            print_json(&report)
        }
        "import" => {
            let [league, team, file] = positional::<3>(rest)?;
            let raw = fs::read(file).with_context(|| format!("failed to read {file}"))?;
            let path = repo.inner().import_table(league, team, &raw)?;
            repo.invalidate(league, team);
            print_json(&serde_json::json!({ "stored": path }))
        }
        "create-league" => {
            let name = rest
                .iter()
                .find(|a| !a.starts_with("--") && !is_flag_value(rest, a.as_str()))
                .ok_or_else(|| anyhow!("missing league name\n{USAGE}"))?;
            let meta = repo.inner().create_league(
                name,
                flag_value(rest, "--league-id"),
                flag_value(rest, "--season-id"),
                flag_value(rest, "--country"),
            )?;
            print_json(&meta)
        }
        "-h" | "--help" | "help" => {
            println!("{USAGE}");
            Ok(())
        }
        other => Err(anyhow!("unknown command '{other}'\n{USAGE}")),
    }
}

fn positional<const N: usize>(rest: &[String]) -> Result<[&str; N]> {
    let values = rest
        .iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect::<Vec<_>>();
    values
        .try_into()
        .map_err(|got: Vec<&str>| anyhow!("expected {N} arguments, got {}\n{USAGE}", got.len()))
}

/// Accepts both `--flag value` and `--flag=value`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(flag).and_then(|s| s.strip_prefix('=')) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

/// True when `candidate` is the value slot of a preceding `--flag`.
fn is_flag_value(args: &[String], candidate: &str) -> bool {
    args.windows(2).any(|w| {
        w[0].starts_with("--") && !w[0].contains('=') && std::ptr::eq(w[1].as_str(), candidate)
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

