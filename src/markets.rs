//! Comparative market percentages from two team summaries.
//!
//! These are monotonic linear heuristics with clamps, not a calibrated model. The constants
//! are product behavior and are kept verbatim.

use serde::Serialize;

use crate::team_stats::{TeamStatsSummary, round2};

const UNIFORM_SHARE: f64 = 33.33;
const WIN_POINTS: f64 = 3.0;
const DRAW_POINTS: f64 = 1.0;
const WIN_MASS: f64 = 0.75;
const DRAW_MASS: f64 = 0.25;

// (multiplier, clamp) per line. "Over" lines cap at the clamp, "under" lines floor at it.
const OVER_1_5: (f64, f64) = (35.0, 95.0);
const OVER_2_5: (f64, f64) = (25.0, 90.0);
const OVER_3_5: (f64, f64) = (18.0, 85.0);
const UNDER_2_5: (f64, f64) = (25.0, 10.0);
const UNDER_3_5: (f64, f64) = (18.0, 15.0);

const BTTS_YES: (f64, f64) = (30.0, 95.0);

const CORNERS_OVER_8_5: (f64, f64) = (8.0, 95.0);
const CORNERS_OVER_9_5: (f64, f64) = (7.0, 90.0);
const CORNERS_OVER_10_5: (f64, f64) = (6.0, 85.0);

const SHOTS_OVER_20_5: (f64, f64) = (4.0, 95.0);
const SHOTS_OVER_24_5: (f64, f64) = (3.3, 90.0);

const CARDS_OVER_3_5: (f64, f64) = (20.0, 95.0);
const CARDS_OVER_4_5: (f64, f64) = (15.0, 90.0);

// Upper bounds of the small and medium tiers, and the (conservative, bold) line per tier.
const GOAL_TIERS: (f64, f64) = (0.3, 0.7);
const GOAL_LINES: [(&str, &str); 3] = [("0.0", "0.5"), ("0.5", "1.0"), ("1.0", "1.5")];
const CORNER_TIERS: (f64, f64) = (0.5, 1.5);
const CORNER_LINES: [(&str, &str); 3] = [("0.0", "1.5"), ("1.5", "2.5"), ("2.5", "3.5")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Favorite {
    Team1,
    Team2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutcomeSplit {
    pub team1_win: f64,
    pub draw: f64,
    pub team2_win: f64,
}

impl OutcomeSplit {
    pub fn uniform() -> Self {
        Self {
            team1_win: UNIFORM_SHARE,
            draw: UNIFORM_SHARE,
            team2_win: UNIFORM_SHARE,
        }
    }

    pub fn total(&self) -> f64 {
        self.team1_win + self.draw + self.team2_win
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverUnder {
    pub total_expected_goals: f64,
    pub over_1_5: f64,
    pub over_2_5: f64,
    pub over_3_5: f64,
    pub under_2_5: f64,
    pub under_3_5: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Btts {
    pub yes: f64,
    pub no: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corners {
    pub expected_total: f64,
    pub team1_avg: f64,
    pub team2_avg: f64,
    pub over_8_5: f64,
    pub over_9_5: f64,
    pub over_10_5: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Shots {
    pub expected_total: f64,
    pub team1_avg: f64,
    pub team2_avg: f64,
    pub over_20_5: f64,
    pub over_24_5: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cards {
    pub expected_total: f64,
    pub team1_avg: f64,
    pub team2_avg: f64,
    pub over_3_5: f64,
    pub over_4_5: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandicapLine {
    pub favorite: Favorite,
    pub difference: f64,
    pub conservative: String,
    pub bold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsianHandicap {
    pub goals: HandicapLine,
    pub corners: HandicapLine,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketProbabilities {
    pub probabilities: OutcomeSplit,
    pub over_under: OverUnder,
    pub btts: Btts,
    pub corners: Corners,
    pub shots: Shots,
    pub cards: Cards,
    pub asian_handicap: AsianHandicap,
}

pub fn compute(team1: &TeamStatsSummary, team2: &TeamStatsSummary) -> MarketProbabilities {
    let expected_goals = team1.avg_goals_scored() + team2.avg_goals_scored();
    MarketProbabilities {
        probabilities: outcome_split(team1, team2),
        over_under: over_under(expected_goals),
        btts: btts(expected_goals),
        corners: corners(team1, team2),
        shots: shots(team1, team2),
        cards: cards(team1, team2),
        asian_handicap: asian_handicap(team1, team2),
    }
}

/// Points-plus-goal-difference strength, not a probability.
pub fn strength(s: &TeamStatsSummary) -> f64 {
    WIN_POINTS * s.wins as f64 + DRAW_POINTS * s.draws as f64 + s.goals_scored as f64
        - s.goals_conceded as f64
}

pub fn outcome_split(team1: &TeamStatsSummary, team2: &TeamStatsSummary) -> OutcomeSplit {
    if team1.matches_played + team2.matches_played == 0 {
        return OutcomeSplit::uniform();
    }
    let s1 = strength(team1);
    let s2 = strength(team2);
    let total = s1 + s2;
    if total == 0.0 {
        return OutcomeSplit::uniform();
    }
    OutcomeSplit {
        team1_win: round2(s1 / total * WIN_MASS * 100.0),
        draw: round2(DRAW_MASS * 100.0),
        team2_win: round2(s2 / total * WIN_MASS * 100.0),
    }
}

pub fn over_under(expected_goals: f64) -> OverUnder {
    OverUnder {
        total_expected_goals: round2(expected_goals),
        over_1_5: over(expected_goals, OVER_1_5),
        over_2_5: over(expected_goals, OVER_2_5),
        over_3_5: over(expected_goals, OVER_3_5),
        under_2_5: under(expected_goals, UNDER_2_5),
        under_3_5: under(expected_goals, UNDER_3_5),
    }
}

pub fn btts(expected_goals: f64) -> Btts {
    let yes = over(expected_goals, BTTS_YES);
    Btts {
        yes,
        no: round2(100.0 - yes),
    }
}

fn corners(team1: &TeamStatsSummary, team2: &TeamStatsSummary) -> Corners {
    let (a, b) = (team1.avg_corners_for(), team2.avg_corners_for());
    let total = a + b;
    Corners {
        expected_total: round2(total),
        team1_avg: a,
        team2_avg: b,
        over_8_5: over(total, CORNERS_OVER_8_5),
        over_9_5: over(total, CORNERS_OVER_9_5),
        over_10_5: over(total, CORNERS_OVER_10_5),
    }
}

fn shots(team1: &TeamStatsSummary, team2: &TeamStatsSummary) -> Shots {
    let (a, b) = (team1.avg_shots_for(), team2.avg_shots_for());
    let total = a + b;
    Shots {
        expected_total: round2(total),
        team1_avg: a,
        team2_avg: b,
        over_20_5: over(total, SHOTS_OVER_20_5),
        over_24_5: over(total, SHOTS_OVER_24_5),
    }
}

fn cards(team1: &TeamStatsSummary, team2: &TeamStatsSummary) -> Cards {
    let (a, b) = (team1.avg_yellow_cards(), team2.avg_yellow_cards());
    let total = a + b;
    Cards {
        expected_total: round2(total),
        team1_avg: a,
        team2_avg: b,
        over_3_5: over(total, CARDS_OVER_3_5),
        over_4_5: over(total, CARDS_OVER_4_5),
    }
}

pub fn asian_handicap(team1: &TeamStatsSummary, team2: &TeamStatsSummary) -> AsianHandicap {
    let goal_diff = team1.avg_goals_scored() - team2.avg_goals_scored();
    let corner_diff = team1.avg_corners_for() - team2.avg_corners_for();
    AsianHandicap {
        goals: handicap_line(goal_diff, GOAL_TIERS, &GOAL_LINES),
        corners: handicap_line(corner_diff, CORNER_TIERS, &CORNER_LINES),
    }
}

fn handicap_line(diff: f64, tiers: (f64, f64), lines: &[(&str, &str); 3]) -> HandicapLine {
    let magnitude = diff.abs();
    let (conservative, bold) = if magnitude < tiers.0 {
        lines[0]
    } else if magnitude < tiers.1 {
        lines[1]
    } else {
        lines[2]
    };
    HandicapLine {
        favorite: if diff > 0.0 {
            Favorite::Team1
        } else {
            Favorite::Team2
        },
        difference: round2(diff),
        conservative: conservative.to_string(),
        bold: bold.to_string(),
    }
}

fn over(expected: f64, (mult, cap): (f64, f64)) -> f64 {
    round2((expected * mult).min(cap))
}

fn under(expected: f64, (mult, floor): (f64, f64)) -> f64 {
    round2((100.0 - expected * mult).max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::MatchRecord;
    use crate::team_stats::aggregate;

    fn summary(wins: u32, draws: u32, losses: u32, gs: u32, gc: u32) -> TeamStatsSummary {
        TeamStatsSummary {
            matches_played: wins + draws + losses,
            wins,
            draws,
            losses,
            goals_scored: gs,
            goals_conceded: gc,
            ..TeamStatsSummary::default()
        }
    }

    #[test]
    fn zero_matches_is_uniform() {
        let p = outcome_split(&TeamStatsSummary::default(), &TeamStatsSummary::default());
        assert_eq!(p, OutcomeSplit::uniform());
        assert_eq!((p.team1_win, p.draw, p.team2_win), (33.33, 33.33, 33.33));
    }

    #[test]
    fn zero_strength_is_uniform() {
        // A 0-1 loss (strength -1) against a 0-0 draw (strength 1).
        let a = summary(0, 0, 1, 0, 1);
        let b = summary(0, 1, 0, 0, 0);
        assert_eq!(strength(&a) + strength(&b), 0.0);
        assert_eq!(outcome_split(&a, &b), OutcomeSplit::uniform());
    }

    #[test]
    fn split_sums_to_100() {
        let cases = [
            (summary(5, 2, 1, 14, 6), summary(2, 3, 3, 9, 11)),
            (summary(1, 0, 0, 2, 0), summary(0, 1, 0, 1, 1)),
            (summary(7, 0, 0, 21, 2), summary(3, 1, 3, 10, 10)),
        ];
        for (a, b) in cases {
            let p = outcome_split(&a, &b);
            assert!((p.total() - 100.0).abs() <= 0.01, "{p:?}");
            assert_eq!(p.draw, 25.0);
        }
    }

    #[test]
    fn stronger_team_gets_larger_share() {
        let p = outcome_split(&summary(5, 2, 1, 14, 6), &summary(2, 3, 3, 9, 11));
        assert!(p.team1_win > p.team2_win);
    }

    #[test]
    fn worked_example() {
        let a = aggregate(&[MatchRecord::new("Team A", "Team X", 2, 0)], "Team A");
        let b = aggregate(&[MatchRecord::new("Team Y", "Team B", 1, 1)], "Team B");
        let m = compute(&a, &b);
        assert_eq!(m.over_under.total_expected_goals, 3.0);
        assert_eq!(m.over_under.over_1_5, 95.0);
        assert_eq!(m.over_under.over_2_5, 75.0);
        assert_eq!(m.over_under.under_2_5, 25.0);
        assert_eq!(m.btts.yes, 90.0);
        assert_eq!(m.btts.no, 10.0);
        // Strengths: A = 3 + 2 = 5, B = 1 + 0 = 1.
        assert_eq!(m.probabilities.team1_win, 62.5);
        assert_eq!(m.probabilities.team2_win, 12.5);
        assert_eq!(m.asian_handicap.goals.favorite, Favorite::Team1);
        assert_eq!(m.asian_handicap.goals.conservative, "1.0");
        assert_eq!(m.asian_handicap.goals.bold, "1.5");
    }

    #[test]
    fn under_lines_respect_floor() {
        let ou = over_under(6.0);
        assert_eq!(ou.under_2_5, 10.0);
        assert_eq!(ou.under_3_5, 15.0);
        assert_eq!(ou.over_3_5, 85.0);
        let ou = over_under(0.0);
        assert_eq!(ou.over_1_5, 0.0);
        assert_eq!(ou.under_2_5, 100.0);
    }

    #[test]
    fn corner_and_card_multipliers() {
        let mut a = summary(1, 0, 0, 1, 0);
        let mut b = summary(1, 0, 0, 1, 0);
        a.averages = Some(crate::team_stats::StatAverages {
            avg_goals_scored: 1.0,
            avg_goals_conceded: 0.0,
            avg_corners_for: 5.0,
            avg_corners_against: 0.0,
            avg_shots_for: 12.0,
            avg_shots_against: 0.0,
            avg_yellow_cards: 1.5,
        });
        b.averages = a.averages.map(|mut avg| {
            avg.avg_corners_for = 4.0;
            avg.avg_yellow_cards = 0.5;
            avg
        });
        let c = corners(&a, &b);
        assert_eq!(c.over_8_5, 72.0);
        assert_eq!(c.over_9_5, 63.0);
        assert_eq!(c.over_10_5, 54.0);
        let k = cards(&a, &b);
        assert_eq!(k.over_3_5, 40.0);
        assert_eq!(k.over_4_5, 30.0);
        let ah = asian_handicap(&a, &b);
        assert_eq!(ah.goals.favorite, Favorite::Team2);
        assert_eq!((ah.goals.conservative.as_str(), ah.goals.bold.as_str()), ("0.0", "0.5"));
        assert_eq!(ah.corners.favorite, Favorite::Team1);
        assert_eq!((ah.corners.conservative.as_str(), ah.corners.bold.as_str()), ("1.5", "2.5"));
    }
}
