use serde::Serialize;

use crate::slug::{normalize_team_name, tokens_match};
use crate::table::{MatchRecord, TableMetrics};

/// Per-match averages. Only present when at least one match was attributed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatAverages {
    pub avg_goals_scored: f64,
    pub avg_goals_conceded: f64,
    pub avg_corners_for: f64,
    pub avg_corners_against: f64,
    pub avg_shots_for: f64,
    pub avg_shots_against: f64,
    pub avg_yellow_cards: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamStatsSummary {
    pub matches_played: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub corners_for: u32,
    pub corners_against: u32,
    pub shots_for: u32,
    pub shots_against: u32,
    pub shots_on_target_for: u32,
    pub shots_on_target_against: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    #[serde(flatten)]
    pub averages: Option<StatAverages>,
}

impl TeamStatsSummary {
    pub fn avg_goals_scored(&self) -> f64 {
        self.averages.map(|a| a.avg_goals_scored).unwrap_or(0.0)
    }

    pub fn avg_corners_for(&self) -> f64 {
        self.averages.map(|a| a.avg_corners_for).unwrap_or(0.0)
    }

    pub fn avg_shots_for(&self) -> f64 {
        self.averages.map(|a| a.avg_shots_for).unwrap_or(0.0)
    }

    pub fn avg_yellow_cards(&self) -> f64 {
        self.averages.map(|a| a.avg_yellow_cards).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// Which side of `record` the (already normalized) team played, if any.
/// A row matching both sides counts as home.
pub fn attribute(record: &MatchRecord, team_norm: &str) -> Option<Side> {
    let home = normalize_team_name(&record.home_team);
    if tokens_match(team_norm, &home) {
        return Some(Side::Home);
    }
    let away = normalize_team_name(&record.away_team);
    if tokens_match(team_norm, &away) {
        return Some(Side::Away);
    }
    None
}

pub fn aggregate(records: &[MatchRecord], team: &str) -> TeamStatsSummary {
    let team_norm = normalize_team_name(team);
    let mut s = TeamStatsSummary::default();

    for r in records {
        let Some(side) = attribute(r, &team_norm) else {
            continue;
        };
        s.matches_played = s.matches_played.saturating_add(1);

        let (gf, ga) = match side {
            Side::Home => {
                s.corners_for = s.corners_for.saturating_add(r.home_corners);
                s.corners_against = s.corners_against.saturating_add(r.away_corners);
                s.shots_for = s.shots_for.saturating_add(r.home_shots);
                s.shots_against = s.shots_against.saturating_add(r.away_shots);
                s.shots_on_target_for = s.shots_on_target_for.saturating_add(r.home_shots_on_target);
                s.shots_on_target_against = s.shots_on_target_against.saturating_add(r.away_shots_on_target);
                s.yellow_cards = s.yellow_cards.saturating_add(r.home_yellow_cards);
                s.red_cards = s.red_cards.saturating_add(r.home_red_cards);
                (r.home_goals, r.away_goals)
            }
            Side::Away => {
                s.corners_for = s.corners_for.saturating_add(r.away_corners);
                s.corners_against = s.corners_against.saturating_add(r.home_corners);
                s.shots_for = s.shots_for.saturating_add(r.away_shots);
                s.shots_against = s.shots_against.saturating_add(r.home_shots);
                s.shots_on_target_for = s.shots_on_target_for.saturating_add(r.away_shots_on_target);
                s.shots_on_target_against = s.shots_on_target_against.saturating_add(r.home_shots_on_target);
                s.yellow_cards = s.yellow_cards.saturating_add(r.away_yellow_cards);
                s.red_cards = s.red_cards.saturating_add(r.away_red_cards);
                (r.away_goals, r.home_goals)
            }
        };
        s.goals_scored = s.goals_scored.saturating_add(gf);
        s.goals_conceded = s.goals_conceded.saturating_add(ga);

        if gf > ga {
            s.wins += 1;
        } else if gf == ga {
            s.draws += 1;
        } else {
            s.losses += 1;
        }
    }

    if s.matches_played > 0 {
        let n = s.matches_played as f64;
        let avg = |total: u32| round2(total as f64 / n);
        s.averages = Some(StatAverages {
            avg_goals_scored: avg(s.goals_scored),
            avg_goals_conceded: avg(s.goals_conceded),
            avg_corners_for: avg(s.corners_for),
            avg_corners_against: avg(s.corners_against),
            avg_shots_for: avg(s.shots_for),
            avg_shots_against: avg(s.shots_against),
            avg_yellow_cards: avg(s.yellow_cards),
        });
    }

    s
}

/// Percentage metrics for a freshly fetched table, so the ranking mode has real signals
/// instead of defaults. Half-time data is not available from full-time rows.
pub fn derive_metrics(records: &[MatchRecord], team: &str) -> TableMetrics {
    let team_norm = normalize_team_name(team);
    let mut n = 0u32;
    let mut wins = 0u32;
    let mut goal_diff = 0i64;
    let mut over15 = 0u32;
    let mut over25 = 0u32;
    let mut btts = 0u32;

    for r in records {
        let Some(side) = attribute(r, &team_norm) else {
            continue;
        };
        n += 1;
        let (gf, ga) = match side {
            Side::Home => (r.home_goals, r.away_goals),
            Side::Away => (r.away_goals, r.home_goals),
        };
        if gf > ga {
            wins += 1;
        }
        goal_diff += gf as i64 - ga as i64;
        let total = gf.saturating_add(ga);
        if total >= 2 {
            over15 += 1;
        }
        if total >= 3 {
            over25 += 1;
        }
        if gf > 0 && ga > 0 {
            btts += 1;
        }
    }

    if n == 0 {
        return TableMetrics::default();
    }
    let pct = |count: u32| round2(count as f64 / n as f64 * 100.0);
    TableMetrics {
        win_rate: Some(pct(wins)),
        rpg: Some(round2(goal_diff as f64 / n as f64)),
        over15: Some(pct(over15)),
        over25: Some(pct(over25)),
        btts: Some(pct(btts)),
        ..TableMetrics::default()
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
