//! Re-populates stored team tables from a remote feed.
//!
//! Teams are visited one at a time with a fixed pause between remote calls. Whether a team is
//! due is decided by [`should_refresh`] from the table's own `last_update_utc` stamp, so there
//! is no process-wide "last run" state.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::repository::{TeamEntry, TeamRepository};
use crate::table::{MatchRecord, TeamMeta, TeamTable};
use crate::team_stats::derive_metrics;

/// Recent matches for one team as returned by a remote source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTeam {
    pub team_id: u64,
    pub team_name: String,
    pub matches: Vec<MatchRecord>,
}

pub trait TeamFeed {
    /// `query` is a human-readable team name; `known_id` is the id stored by a previous refresh.
    fn fetch_team(&self, query: &str, known_id: Option<u64>) -> Result<FetchedTeam>;
}

/// True when the table has never been stamped or the stamp is at least `interval` old.
/// A stamp in the future is treated as fresh.
pub fn should_refresh(
    last_update: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: chrono::Duration,
) -> bool {
    match last_update {
        None => true,
        Some(last) => now.signed_duration_since(last) >= interval,
    }
}

pub fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshFailure {
    pub league: String,
    pub team: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<RefreshFailure>,
}

pub struct Refresher<'a, R, F> {
    repo: &'a R,
    feed: &'a F,
    interval: chrono::Duration,
    delay: Duration,
}

impl<'a, R: TeamRepository, F: TeamFeed> Refresher<'a, R, F> {
    pub fn new(repo: &'a R, feed: &'a F, interval: chrono::Duration, delay: Duration) -> Self {
        Self {
            repo,
            feed,
            interval,
            delay,
        }
    }

    /// Refreshes one league, or every league when `league` is `None`.
    pub fn run(&self, league: Option<&str>, force: bool, now: DateTime<Utc>) -> Result<RefreshReport> {
        let leagues: Vec<String> = match league {
            Some(l) => vec![l.to_string()],
            None => self
                .repo
                .list_leagues()
                .context("failed to list leagues")?
                .into_iter()
                .map(|l| l.league_id)
                .collect(),
        };

        let mut report = RefreshReport::default();
        let mut fetched_any = false;
        for league in &leagues {
            let teams = self
                .repo
                .list_teams(league)
                .with_context(|| format!("failed to list teams for {league}"))?;
            info!(league = %league, teams = teams.len(), "refreshing league");

            for entry in &teams {
                let label = format!("{league}/{}", entry.team);
                if !force && !self.is_due(league, entry, now) {
                    debug!(team = %label, "up to date");
                    report.skipped.push(label);
                    continue;
                }
                if fetched_any && !self.delay.is_zero() {
                    thread::sleep(self.delay);
                }
                fetched_any = true;

                match self.refresh_team(league, entry, now) {
                    Ok(rows) => {
                        info!(team = %label, rows, "team refreshed");
                        report.updated.push(label);
                    }
                    Err(err) => {
                        warn!(team = %label, error = %format!("{err:#}"), "team refresh failed");
                        report.failed.push(RefreshFailure {
                            league: league.clone(),
                            team: entry.team.clone(),
                            error: format!("{err:#}"),
                        });
                    }
                }
            }
        }
        Ok(report)
    }

    fn is_due(&self, league: &str, entry: &TeamEntry, now: DateTime<Utc>) -> bool {
        let last = match self.repo.get_table(league, &entry.team) {
            Ok(Some(table)) => table.meta.last_update_utc.as_deref().and_then(parse_stamp),
            Ok(None) => None,
            Err(err) => {
                warn!(league, team = %entry.team, error = %err, "could not read stamp");
                None
            }
        };
        should_refresh(last, now, self.interval)
    }

    fn refresh_team(&self, league: &str, entry: &TeamEntry, now: DateTime<Utc>) -> Result<usize> {
        let fetched = self
            .feed
            .fetch_team(&entry.display_name, entry.team_id)
            .with_context(|| format!("fetch failed for {}", entry.display_name))?;
        if fetched.matches.is_empty() {
            // Keep whatever is stored rather than replacing it with an empty table.
            anyhow::bail!("no matches returned for {}", entry.display_name);
        }

        let metrics = derive_metrics(&fetched.matches, &fetched.team_name);
        let rows = fetched.matches.len();
        let table = TeamTable {
            records: fetched.matches,
            metrics,
            meta: TeamMeta {
                team_name: Some(fetched.team_name),
                team_id: Some(fetched.team_id),
                last_update_utc: Some(now.to_rfc3339()),
            },
        };
        self.repo
            .save_table(league, &entry.team, &table)
            .with_context(|| format!("failed to save {league}/{}", entry.team))?;
        Ok(rows)
    }
}
