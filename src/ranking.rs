//! Asian-market suggestions ranked by a heuristic strength signal.
//!
//! Works from the percentage/rating columns of the two tables (see [`TableMetrics`]),
//! falling back to neutral defaults when a table carries none of the candidate columns.

use serde::Serialize;

use crate::table::{TableMetrics, TeamTable};

const DEFAULT_WIN_RATE: f64 = 50.0;
const WIN_RATE_PER_RPG: f64 = 25.0;
const DEFAULT_OVER_1_5: f64 = 70.0;
const DEFAULT_OVER_2_5: f64 = 50.0;
const DEFAULT_BTTS: f64 = 50.0;
const MIN_OVER_0_5_HT: f64 = 55.0;
const HT_FROM_FT_OFFSET: f64 = 10.0;

const HANDICAP_GAP_WEIGHT: f64 = 20.0;
const HANDICAP_WIN_GAP_WEIGHT: f64 = 0.6;
const HANDICAP_FT_MIN_SCORE: f64 = 5.0;
const HANDICAP_STRONG_GAP: f64 = 0.5;

const GOALS_FT_OVER_2_5_PIVOT: f64 = 55.0;
const GOALS_FT_OVER_2_5_WEIGHT: f64 = 1.2;
const GOALS_FT_BTTS_PIVOT: f64 = 50.0;
const GOALS_FT_BTTS_WEIGHT: f64 = 0.7;
const GOALS_FT_HIGH: f64 = 72.0;
const GOALS_FT_MID: f64 = 60.0;

const HANDICAP_HT_FT_SHARE: f64 = 0.6;
const HT_PIVOT: f64 = 60.0;
const HANDICAP_HT_WEIGHT: f64 = 0.5;

const GOALS_HT_WEIGHT: f64 = 1.3;
const GOALS_HT_OVER_1_5_PIVOT: f64 = 70.0;
const GOALS_HT_OVER_1_5_WEIGHT: f64 = 0.4;
const GOALS_HT_HIGH: f64 = 70.0;

const TOP_MARKETS: usize = 2;

const OVERVIEW_WIN_CLAMP: (f64, f64) = (10.0, 80.0);
const OVERVIEW_DRAW_CLAMP: (f64, f64) = (10.0, 60.0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSuggestion {
    pub line: String,
    pub reason: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionPair {
    pub bold: LineSuggestion,
    pub conservative: LineSuggestion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSuggestion {
    pub market_name: String,
    pub suggestions: SuggestionPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverviewProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverviewStrength {
    pub home_rpg: f64,
    pub away_rpg: f64,
    pub rpg_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrengthOverview {
    pub probabilities: OverviewProbabilities,
    pub strength: OverviewStrength,
}

/// Resolved inputs for one pairing, defaults applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSignals {
    pub home_win: f64,
    pub away_win: f64,
    pub home_rpg: f64,
    pub away_rpg: f64,
    pub over15: f64,
    pub over25: f64,
    pub btts: f64,
    pub over05_ht: f64,
}

impl MarketSignals {
    pub fn from_metrics(home: &TableMetrics, away: &TableMetrics) -> Self {
        let home_win = home.win_rate.or(home.home_win_rate).unwrap_or(DEFAULT_WIN_RATE);
        let away_win = away.win_rate.or(away.away_win_rate).unwrap_or(DEFAULT_WIN_RATE);
        let home_rpg = home.rpg.unwrap_or(home_win / WIN_RATE_PER_RPG);
        let away_rpg = away.rpg.unwrap_or(away_win / WIN_RATE_PER_RPG);

        let over15 = mean2(
            home.over15.unwrap_or(DEFAULT_OVER_1_5),
            away.over15.unwrap_or(DEFAULT_OVER_1_5),
        );
        let over25 = mean2(
            home.over25.unwrap_or(DEFAULT_OVER_2_5),
            away.over25.unwrap_or(DEFAULT_OVER_2_5),
        );
        let btts = mean2(
            home.btts.unwrap_or(DEFAULT_BTTS),
            away.btts.unwrap_or(DEFAULT_BTTS),
        );
        // Without half-time columns, proxy from the combined full-time over 1.5.
        let ht_proxy = MIN_OVER_0_5_HT.max(over15 - HT_FROM_FT_OFFSET);
        let over05_ht = mean2(
            home.over05_ht.unwrap_or(ht_proxy),
            away.over05_ht.unwrap_or(ht_proxy),
        );

        Self {
            home_win,
            away_win,
            home_rpg,
            away_rpg,
            over15,
            over25,
            btts,
            over05_ht,
        }
    }

    pub fn rpg_diff(&self) -> f64 {
        self.home_rpg - self.away_rpg
    }

    pub fn handicap_ft_score(&self) -> f64 {
        self.rpg_diff().abs() * HANDICAP_GAP_WEIGHT
            + (self.home_win - self.away_win).abs() * HANDICAP_WIN_GAP_WEIGHT
    }

    pub fn goals_ft_score(&self) -> f64 {
        (self.over25 - GOALS_FT_OVER_2_5_PIVOT) * GOALS_FT_OVER_2_5_WEIGHT
            + (self.btts - GOALS_FT_BTTS_PIVOT) * GOALS_FT_BTTS_WEIGHT
    }

    pub fn handicap_ht_score(&self) -> f64 {
        self.handicap_ft_score() * HANDICAP_HT_FT_SHARE
            + (self.over05_ht - HT_PIVOT) * HANDICAP_HT_WEIGHT
    }

    pub fn goals_ht_score(&self) -> f64 {
        (self.over05_ht - HT_PIVOT) * GOALS_HT_WEIGHT
            + (self.over15 - GOALS_HT_OVER_1_5_PIVOT) * GOALS_HT_OVER_1_5_WEIGHT
    }
}

/// Summary win split and rating gap shown alongside the market list.
pub fn strength_overview(home: &TeamTable, away: &TeamTable) -> StrengthOverview {
    let signals = MarketSignals::from_metrics(&home.metrics, &away.metrics);
    let home_win = signals.home_win.clamp(OVERVIEW_WIN_CLAMP.0, OVERVIEW_WIN_CLAMP.1);
    let away_win = signals.away_win.clamp(OVERVIEW_WIN_CLAMP.0, OVERVIEW_WIN_CLAMP.1);
    let draw = (100.0 - (home_win + away_win) / 2.0)
        .clamp(OVERVIEW_DRAW_CLAMP.0, OVERVIEW_DRAW_CLAMP.1);

    // Rating defaults follow the clamped win rates here.
    let home_rpg = home.metrics.rpg.unwrap_or(home_win / WIN_RATE_PER_RPG);
    let away_rpg = away.metrics.rpg.unwrap_or(away_win / WIN_RATE_PER_RPG);

    StrengthOverview {
        probabilities: OverviewProbabilities {
            home_win: round1(home_win),
            draw: round1(draw),
            away_win: round1(away_win),
        },
        strength: OverviewStrength {
            home_rpg: round2(home_rpg),
            away_rpg: round2(away_rpg),
            rpg_diff: round2(home_rpg - away_rpg),
        },
    }
}

pub fn rank_markets(
    home: &TeamTable,
    away: &TeamTable,
    home_label: &str,
    away_label: &str,
) -> Vec<MarketSuggestion> {
    let signals = MarketSignals::from_metrics(&home.metrics, &away.metrics);
    rank_from_signals(&signals, home_label, away_label)
}

pub fn rank_from_signals(
    signals: &MarketSignals,
    home_label: &str,
    away_label: &str,
) -> Vec<MarketSuggestion> {
    let (fav, dog) = if signals.rpg_diff() >= 0.0 {
        (home_label, away_label)
    } else {
        (away_label, home_label)
    };

    let mut candidates: Vec<(f64, MarketSuggestion)> = Vec::new();

    let handicap_ft = signals.handicap_ft_score();
    if handicap_ft > HANDICAP_FT_MIN_SCORE {
        candidates.push((
            handicap_ft,
            market("Asian Handicap FT", handicap_ft_lines(signals, fav, dog)),
        ));
    }

    let goals_ft = signals.goals_ft_score();
    if goals_ft > 0.0 {
        candidates.push((goals_ft, market("Asian Goals FT", goals_ft_lines(signals.over25))));
    }

    let handicap_ht = signals.handicap_ht_score();
    if handicap_ht > 0.0 {
        candidates.push((
            handicap_ht,
            market("Asian Handicap HT", handicap_ht_lines(signals, fav, dog)),
        ));
    }

    let goals_ht = signals.goals_ht_score();
    if goals_ht > 0.0 {
        candidates.push((goals_ht, market("Asian Goals HT", goals_ht_lines(signals.over05_ht))));
    }

    // Stable: equal scores keep the order above.
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    candidates
        .into_iter()
        .take(TOP_MARKETS)
        .map(|(_, m)| m)
        .collect()
}

fn market(name: &str, suggestions: SuggestionPair) -> MarketSuggestion {
    MarketSuggestion {
        market_name: name.to_string(),
        suggestions,
    }
}

fn suggestion(line: String, reason: String, explanation: &[&str]) -> LineSuggestion {
    LineSuggestion {
        line,
        reason,
        explanation: explanation.join("\n"),
    }
}

fn handicap_ft_lines(s: &MarketSignals, fav: &str, dog: &str) -> SuggestionPair {
    let gap = s.rpg_diff().abs();
    if gap >= HANDICAP_STRONG_GAP {
        SuggestionPair {
            bold: suggestion(
                format!("{fav} -1.0 AH (FT)"),
                format!(
                    "{fav} shows superior strength (rating gap {gap:.2}) and a higher chance of winning."
                ),
                &[
                    "Win by 2+ goals = Win",
                    "Win by 1 goal = Push (stake returned)",
                    "Draw or loss = Lose",
                ],
            ),
            conservative: suggestion(
                format!("{fav} -0.25 AH (FT)"),
                format!(
                    "{fav} is the favorite, but the match may be balanced at times. The -0.25 line reduces the risk."
                ),
                &[
                    "Win = Win",
                    "Draw = Half loss (half lost, half returned)",
                    "Loss = Lose",
                ],
            ),
        }
    } else {
        SuggestionPair {
            bold: suggestion(
                format!("{fav} 0.0 AH (FT)"),
                "Balanced match with a slight strength edge for the favorite. A draw returns the stake."
                    .to_string(),
                &["Win = Win", "Draw = Push (stake returned)", "Loss = Lose"],
            ),
            conservative: suggestion(
                format!("{dog} +0.5 AH (FT)"),
                format!("Close strength (rating gap {gap:.2}). {dog} can hold a draw."),
                &[
                    "Win or draw for the +0.5 side = Win",
                    "Loss by 1+ goals = Lose",
                ],
            ),
        }
    }
}

fn goals_ft_lines(over25: f64) -> SuggestionPair {
    if over25 >= GOALS_FT_HIGH {
        SuggestionPair {
            bold: suggestion(
                "Over 2.75 goals (FT)".to_string(),
                format!(
                    "Very high scoring trend (Over 2.5 ~ {over25:.0}%) and a strong attacking setup on both sides."
                ),
                &[
                    "4+ goals = Win",
                    "3 goals = Half win (half won, half returned)",
                    "0-2 goals = Lose",
                ],
            ),
            conservative: suggestion(
                "Over 2.0 goals (FT)".to_string(),
                "Whole-number line with protection if the match turns cagey.".to_string(),
                &[
                    "3+ goals = Win",
                    "2 goals = Push (stake returned)",
                    "0-1 goals = Lose",
                ],
            ),
        }
    } else if over25 >= GOALS_FT_MID {
        SuggestionPair {
            bold: suggestion(
                "Over 2.5 goals (FT)".to_string(),
                format!(
                    "Positive scoring trend (Over 2.5 ~ {over25:.0}%). Match with good attacking tempo."
                ),
                &["3+ goals = Win", "0-2 goals = Lose"],
            ),
            conservative: suggestion(
                "Over 1.75 goals (FT)".to_string(),
                "Lower line to protect against a low-scoring match.".to_string(),
                &[
                    "3+ goals = Win",
                    "2 goals = Half win (half won, half returned)",
                    "0-1 goals = Lose",
                ],
            ),
        }
    } else {
        SuggestionPair {
            bold: suggestion(
                "Over 2.0 goals (FT)".to_string(),
                "Middle scenario: 2-3 goals are possible, without a strong over pattern."
                    .to_string(),
                &[
                    "3+ goals = Win",
                    "2 goals = Push (stake returned)",
                    "0-1 goals = Lose",
                ],
            ),
            conservative: suggestion(
                "Over 1.5 goals (FT)".to_string(),
                "Protection for tighter matches, needing only 2 goals.".to_string(),
                &["2+ goals = Win", "0-1 goals = Lose"],
            ),
        }
    }
}

fn handicap_ht_lines(s: &MarketSignals, fav: &str, dog: &str) -> SuggestionPair {
    SuggestionPair {
        bold: suggestion(
            format!("{fav} -0.5 AH (HT)"),
            format!(
                "{fav} tends to start better, with higher strength (rating {:.2} x {:.2}) and a good chance of leading at half-time.",
                s.home_rpg, s.away_rpg
            ),
            &["Leading at HT = Win", "Level or trailing at HT = Lose"],
        ),
        conservative: suggestion(
            format!("{dog} +0.25 AH (HT)"),
            "Protection for a balanced first half, where the underdog can hold a draw."
                .to_string(),
            &[
                "Leading at HT = Win",
                "Level at HT = Half win (half won, half returned)",
                "Trailing at HT = Lose",
            ],
        ),
    }
}

fn goals_ht_lines(over05_ht: f64) -> SuggestionPair {
    if over05_ht >= GOALS_HT_HIGH {
        SuggestionPair {
            bold: suggestion(
                "Over 1.25 goals (HT)".to_string(),
                format!("First halves with a strong attacking pattern (Over 0.5 HT ~ {over05_ht:.0}%)."),
                &[
                    "2+ goals at HT = Win",
                    "1 goal at HT = Half loss (half lost, half returned)",
                    "0 goals at HT = Lose",
                ],
            ),
            conservative: suggestion(
                "Over 0.75 goals (HT)".to_string(),
                "Aggressive line that still keeps partial protection if only 1 goal arrives."
                    .to_string(),
                &[
                    "2+ goals at HT = Win",
                    "1 goal at HT = Half win (half won, half returned)",
                    "0 goals at HT = Lose",
                ],
            ),
        }
    } else {
        SuggestionPair {
            bold: suggestion(
                "Over 1.0 goal (HT)".to_string(),
                "Middle scenario for first-half goals; there is a risk of 0-0 at the break."
                    .to_string(),
                &[
                    "2+ goals at HT = Win",
                    "1 goal at HT = Push (stake returned)",
                    "0 goals at HT = Lose",
                ],
            ),
            conservative: suggestion(
                "Over 0.5 goal (HT)".to_string(),
                "Conservative approach, needing just 1 first-half goal.".to_string(),
                &["1+ goal at HT = Win", "0 goals at HT = Lose"],
            ),
        }
    }
}

fn mean2(a: f64, b: f64) -> f64 {
    (a + b) / 2.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
