//! Request-level orchestration: load both tables, abort on a missing one, assemble the report.

use serde::Serialize;
use tracing::info;

use crate::error::{H2hError, Result};
use crate::markets::{self, MarketProbabilities};
use crate::ranking::{self, MarketSuggestion, StrengthOverview};
use crate::repository::TeamRepository;
use crate::slug::{display_name, slugify};
use crate::table::TeamTable;
use crate::team_stats::{TeamStatsSummary, aggregate};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReport {
    pub id: String,
    pub name: String,
    pub stats: TeamStatsSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct H2hReport {
    pub team1: TeamReport,
    pub team2: TeamReport,
    #[serde(flatten)]
    pub markets: MarketProbabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketReport {
    pub league: String,
    pub home: TeamRef,
    pub away: TeamRef,
    pub analysis: StrengthOverview,
    pub asian_markets: Vec<MarketSuggestion>,
}

pub struct H2hAnalyzer<R> {
    repo: R,
}

impl<R: TeamRepository> H2hAnalyzer<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Full statistical comparison of two teams. Either table missing aborts with
    /// [`H2hError::TeamNotFound`]; there is no partial result.
    pub fn analyze(&self, league: &str, team1: &str, team2: &str) -> Result<H2hReport> {
        let table1 = self.load(league, team1)?;
        let table2 = self.load(league, team2)?;

        let stats1 = aggregate(&table1.records, team1);
        let stats2 = aggregate(&table2.records, team2);
        info!(
            league,
            team1,
            team2,
            matches1 = stats1.matches_played,
            matches2 = stats2.matches_played,
            "h2h analysis"
        );
        let markets = markets::compute(&stats1, &stats2);

        Ok(H2hReport {
            team1: team_report(team1, stats1),
            team2: team_report(team2, stats2),
            markets,
        })
    }

    /// Strength overview plus the top ranked Asian-market suggestions.
    pub fn markets(&self, league: &str, home: &str, away: &str) -> Result<MarketReport> {
        let home_table = self.load(league, home)?;
        let away_table = self.load(league, away)?;

        let home_ref = team_ref(home, &home_table);
        let away_ref = team_ref(away, &away_table);
        let asian_markets =
            ranking::rank_markets(&home_table, &away_table, &home_ref.name, &away_ref.name);
        info!(league, home, away, suggestions = asian_markets.len(), "market ranking");

        Ok(MarketReport {
            league: slugify(league),
            analysis: ranking::strength_overview(&home_table, &away_table),
            home: home_ref,
            away: away_ref,
            asian_markets,
        })
    }

    fn load(&self, league: &str, team: &str) -> Result<TeamTable> {
        self.repo
            .get_table(league, team)?
            .ok_or_else(|| H2hError::TeamNotFound {
                league: league.to_string(),
                team: team.to_string(),
            })
    }
}

fn team_report(identifier: &str, stats: TeamStatsSummary) -> TeamReport {
    let id = slugify(identifier);
    TeamReport {
        name: display_name(&id),
        id,
        stats,
    }
}

/// Prefers the name stamped by a refresh over the title-cased slug.
fn team_ref(identifier: &str, table: &TeamTable) -> TeamRef {
    let id = slugify(identifier);
    TeamRef {
        name: table
            .meta
            .team_name
            .clone()
            .unwrap_or_else(|| display_name(&id)),
        id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::table::{MatchRecord, TeamTable};

    fn analyzer() -> H2hAnalyzer<MemoryRepository> {
        let repo = MemoryRepository::new();
        repo.insert(
            "liga",
            "team-a",
            TeamTable::from_records(vec![
                MatchRecord::new("Team A", "X", 2, 0),
                MatchRecord::new("Team A", "Y", 2, 0),
                MatchRecord::new("Z", "Team A", 0, 2),
                MatchRecord::new("Team A", "W", 1, 1),
            ]),
        );
        repo.insert(
            "liga",
            "team-b",
            TeamTable::from_records(vec![
                MatchRecord::new("Team B", "X", 1, 1),
                MatchRecord::new("Y", "Team B", 2, 1),
                MatchRecord::new("Team B", "Z", 0, 1),
                MatchRecord::new("W", "Team B", 0, 0),
            ]),
        );
        H2hAnalyzer::new(repo)
    }

    #[test]
    fn analyze_builds_both_sides() {
        let report = analyzer().analyze("liga", "Team A", "team-b").unwrap();
        assert_eq!(report.team1.id, "team-a");
        assert_eq!(report.team1.name, "Team A");
        assert_eq!(report.team1.stats.wins, 3);
        assert_eq!(report.team2.name, "Team B");
        assert_eq!(report.team2.stats.losses, 2);
        let p = report.markets.probabilities;
        assert!(p.team1_win > p.team2_win);
        assert_eq!(p.draw, 25.0);
    }

    #[test]
    fn missing_team_aborts() {
        let err = analyzer().analyze("liga", "Team A", "Nobody").unwrap_err();
        assert!(err.is_not_found());
        let err = analyzer().markets("other", "Team A", "Team B").unwrap_err();
        assert!(matches!(err, H2hError::TeamNotFound { ref team, .. } if team == "Team A"));
    }

    #[test]
    fn report_serializes_flat_market_sections() {
        let report = analyzer().analyze("liga", "team-a", "team-b").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        for key in ["team1", "team2", "probabilities", "over_under", "btts", "corners", "shots", "cards", "asian_handicap"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["asian_handicap"]["goals"]["favorite"], "team1");
    }

    #[test]
    fn markets_without_metric_columns_use_defaults() {
        let report = analyzer().markets("liga", "team-a", "team-b").unwrap();
        assert_eq!(report.league, "liga");
        assert_eq!(report.home.name, "Team A");
        assert_eq!(report.analysis.probabilities.home_win, 50.0);
        assert_eq!(report.analysis.strength.rpg_diff, 0.0);
        assert!(report.asian_markets.len() <= 2);
    }
}
