use std::io::Write;

use serde::Serialize;
use tracing::{debug, warn};

// Candidate header names per canonical field, in priority order. Matching is
// case-insensitive. The short upper-case forms are the football-data.co.uk headers.
const DATE: &[&str] = &["date", "data", "match_date"];
const HOME_TEAM: &[&str] = &["home_team", "hometeam", "home", "mandante"];
const AWAY_TEAM: &[&str] = &["away_team", "awayteam", "away", "visitante"];
const HOME_GOALS: &[&str] = &["home_goals", "fthg", "home_score", "hg"];
const AWAY_GOALS: &[&str] = &["away_goals", "ftag", "away_score", "ag"];
const HOME_CORNERS: &[&str] = &["home_corners", "hc"];
const AWAY_CORNERS: &[&str] = &["away_corners", "ac"];
const HOME_SHOTS: &[&str] = &["home_shots", "hs"];
const AWAY_SHOTS: &[&str] = &["away_shots", "as"];
const HOME_SHOTS_ON_TARGET: &[&str] = &["home_shots_on_target", "hst"];
const AWAY_SHOTS_ON_TARGET: &[&str] = &["away_shots_on_target", "ast"];
const HOME_YELLOW: &[&str] = &["home_yellow_cards", "hy"];
const AWAY_YELLOW: &[&str] = &["away_yellow_cards", "ay"];
const HOME_RED: &[&str] = &["home_red_cards", "hr"];
const AWAY_RED: &[&str] = &["away_red_cards", "ar"];

const WIN_RATE: &[&str] = &["win_rate"];
const HOME_WIN_RATE: &[&str] = &["home_win_rate"];
const AWAY_WIN_RATE: &[&str] = &["away_win_rate"];
const RPG: &[&str] = &["rpg", "power_index", "rating"];
const OVER_1_5: &[&str] = &["over15", "over_1_5_ft", "ft_over_1_5"];
const OVER_2_5: &[&str] = &["over25", "over_2_5_ft", "ft_over_2_5"];
const BTTS: &[&str] = &["btts_yes", "btts"];
const OVER_0_5_HT: &[&str] = &["over_0_5_ht", "ht_over_0_5", "over05ht"];

const TEAM_NAME: &[&str] = &["team_name"];
const TEAM_ID: &[&str] = &["team_id"];
const LAST_UPDATE: &[&str] = &["last_update_utc"];

/// Header written by [`TeamTable::write_to`].
pub const CANONICAL_HEADER: &[&str] = &[
    "date",
    "home_team",
    "away_team",
    "home_goals",
    "away_goals",
    "home_corners",
    "away_corners",
    "home_shots",
    "away_shots",
    "home_shots_on_target",
    "away_shots_on_target",
    "home_yellow_cards",
    "away_yellow_cards",
    "home_red_cards",
    "away_red_cards",
    "win_rate",
    "rpg",
    "over15",
    "over25",
    "btts_yes",
    "team_name",
    "team_id",
    "last_update_utc",
];

/// One row of a team table. Optional per-match columns default to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub date: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u32,
    pub away_goals: u32,
    pub home_corners: u32,
    pub away_corners: u32,
    pub home_shots: u32,
    pub away_shots: u32,
    pub home_shots_on_target: u32,
    pub away_shots_on_target: u32,
    pub home_yellow_cards: u32,
    pub away_yellow_cards: u32,
    pub home_red_cards: u32,
    pub away_red_cards: u32,
}

impl MatchRecord {
    pub fn new(home_team: &str, away_team: &str, home_goals: u32, away_goals: u32) -> Self {
        Self {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals,
            away_goals,
            ..Self::default()
        }
    }
}

/// Column means for the percentage/rating metrics used by market ranking.
/// `None` means no candidate column held numeric data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TableMetrics {
    pub win_rate: Option<f64>,
    pub home_win_rate: Option<f64>,
    pub away_win_rate: Option<f64>,
    pub rpg: Option<f64>,
    pub over15: Option<f64>,
    pub over25: Option<f64>,
    pub btts: Option<f64>,
    pub over05_ht: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeamMeta {
    pub team_name: Option<String>,
    pub team_id: Option<u64>,
    pub last_update_utc: Option<String>,
}

/// A team's table after alias resolution. Malformed input never fails here: unreadable
/// headers give an empty table, bad rows are skipped and bad cells read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamTable {
    pub records: Vec<MatchRecord>,
    pub metrics: TableMetrics,
    pub meta: TeamMeta,
}

impl TeamTable {
    pub fn from_records(records: Vec<MatchRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim_start_matches('\u{feff}');
        let delimiter = sniff_delimiter(raw);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers = match reader.headers() {
            Ok(h) => h.iter().map(|s| s.to_ascii_lowercase()).collect::<Vec<_>>(),
            Err(err) => {
                warn!(error = %err, "unreadable table header, treating as empty");
                return Self::default();
            }
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            match row {
                Ok(r) => rows.push(r.iter().map(str::to_string).collect()),
                Err(err) => debug!(row = idx + 1, error = %err, "skipping malformed row"),
            }
        }

        let columns = ColumnMap::resolve(&headers);
        let records = if columns.home_team.is_some() && columns.away_team.is_some() {
            rows.iter().map(|row| columns.record(row)).collect()
        } else {
            Vec::new()
        };

        let metrics = TableMetrics {
            win_rate: safe_mean(&headers, &rows, WIN_RATE),
            home_win_rate: safe_mean(&headers, &rows, HOME_WIN_RATE),
            away_win_rate: safe_mean(&headers, &rows, AWAY_WIN_RATE),
            rpg: safe_mean(&headers, &rows, RPG),
            over15: safe_mean(&headers, &rows, OVER_1_5),
            over25: safe_mean(&headers, &rows, OVER_2_5),
            btts: safe_mean(&headers, &rows, BTTS),
            over05_ht: safe_mean(&headers, &rows, OVER_0_5_HT),
        };

        let meta = TeamMeta {
            team_name: first_text(&headers, &rows, TEAM_NAME),
            team_id: first_text(&headers, &rows, TEAM_ID)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64),
            last_update_utc: first_text(&headers, &rows, LAST_UPDATE),
        };

        Self {
            records,
            metrics,
            meta,
        }
    }

    /// Writes the table `;`-delimited under [`CANONICAL_HEADER`]. Metrics and metadata are
    /// repeated on every row so any reader that takes a column mean recovers them.
    pub fn write_to<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(writer);
        out.write_record(CANONICAL_HEADER)?;

        let m = &self.metrics;
        let tail = [
            opt_num(m.win_rate),
            opt_num(m.rpg),
            opt_num(m.over15),
            opt_num(m.over25),
            opt_num(m.btts),
            self.meta.team_name.clone().unwrap_or_default(),
            self.meta.team_id.map(|v| v.to_string()).unwrap_or_default(),
            self.meta.last_update_utc.clone().unwrap_or_default(),
        ];

        for r in &self.records {
            let mut row = vec![
                r.date.clone().unwrap_or_default(),
                r.home_team.clone(),
                r.away_team.clone(),
            ];
            row.extend(
                [
                    r.home_goals,
                    r.away_goals,
                    r.home_corners,
                    r.away_corners,
                    r.home_shots,
                    r.away_shots,
                    r.home_shots_on_target,
                    r.away_shots_on_target,
                    r.home_yellow_cards,
                    r.away_yellow_cards,
                    r.home_red_cards,
                    r.away_red_cards,
                ]
                .iter()
                .map(u32::to_string),
            );
            row.extend(tail.iter().cloned());
            out.write_record(&row)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ColumnMap {
    date: Option<usize>,
    home_team: Option<usize>,
    away_team: Option<usize>,
    home_goals: Option<usize>,
    away_goals: Option<usize>,
    home_corners: Option<usize>,
    away_corners: Option<usize>,
    home_shots: Option<usize>,
    away_shots: Option<usize>,
    home_sot: Option<usize>,
    away_sot: Option<usize>,
    home_yellow: Option<usize>,
    away_yellow: Option<usize>,
    home_red: Option<usize>,
    away_red: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Self {
        let find = |aliases: &[&str]| column_index(headers, aliases);
        Self {
            date: find(DATE),
            home_team: find(HOME_TEAM),
            away_team: find(AWAY_TEAM),
            home_goals: find(HOME_GOALS),
            away_goals: find(AWAY_GOALS),
            home_corners: find(HOME_CORNERS),
            away_corners: find(AWAY_CORNERS),
            home_shots: find(HOME_SHOTS),
            away_shots: find(AWAY_SHOTS),
            home_sot: find(HOME_SHOTS_ON_TARGET),
            away_sot: find(AWAY_SHOTS_ON_TARGET),
            home_yellow: find(HOME_YELLOW),
            away_yellow: find(AWAY_YELLOW),
            home_red: find(HOME_RED),
            away_red: find(AWAY_RED),
        }
    }

    fn record(&self, row: &[String]) -> MatchRecord {
        let text = |idx: Option<usize>| idx.and_then(|i| row.get(i)).cloned().unwrap_or_default();
        let count = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|s| parse_count(s))
                .unwrap_or(0)
        };
        MatchRecord {
            date: Some(text(self.date)).filter(|d| !d.is_empty()),
            home_team: text(self.home_team),
            away_team: text(self.away_team),
            home_goals: count(self.home_goals),
            away_goals: count(self.away_goals),
            home_corners: count(self.home_corners),
            away_corners: count(self.away_corners),
            home_shots: count(self.home_shots),
            away_shots: count(self.away_shots),
            home_shots_on_target: count(self.home_sot),
            away_shots_on_target: count(self.away_sot),
            home_yellow_cards: count(self.home_yellow),
            away_yellow_cards: count(self.away_yellow),
            home_red_cards: count(self.home_red),
            away_red_cards: count(self.away_red),
        }
    }
}

fn sniff_delimiter(raw: &str) -> u8 {
    let header = raw.lines().next().unwrap_or_default();
    let semis = header.matches(';').count();
    let commas = header.matches(',').count();
    let tabs = header.matches('\t').count();
    if semis > commas && semis >= tabs {
        b';'
    } else if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

fn column_index(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

/// Non-negative whole count; blanks and garbage read as zero.
fn parse_count(raw: &str) -> u32 {
    match parse_number(raw) {
        Some(v) if v > 0.0 => v as u32,
        _ => 0,
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Mean of the first candidate column whose cells are all numeric (blanks skipped).
/// A column with any unparseable cell is passed over in favor of the next alias.
fn safe_mean(headers: &[String], rows: &[Vec<String>], aliases: &[&str]) -> Option<f64> {
    'alias: for alias in aliases {
        let Some(idx) = headers.iter().position(|h| h == alias) else {
            continue;
        };
        let mut sum = 0.0;
        let mut n = 0usize;
        for row in rows {
            let Some(cell) = row.get(idx) else { continue };
            if cell.trim().is_empty() {
                continue;
            }
            match parse_number(cell) {
                Some(v) => {
                    sum += v;
                    n += 1;
                }
                None => continue 'alias,
            }
        }
        if n > 0 {
            return Some(sum / n as f64);
        }
    }
    None
}

fn first_text(headers: &[String], rows: &[Vec<String>], aliases: &[&str]) -> Option<String> {
    let idx = column_index(headers, aliases)?;
    rows.first()
        .and_then(|row| row.get(idx))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semicolon_table_with_missing_optionals() {
        let raw = "date;home_team;away_team;home_goals;away_goals;home_corners\n\
                   2024-08-01;Team A;Team X;2;0;7\n\
                   2024-08-08;Team Y;Team A;1;;\n";
        let table = TeamTable::parse(raw);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0].home_corners, 7);
        assert_eq!(table.records[0].away_corners, 0);
        assert_eq!(table.records[1].away_goals, 0);
        assert_eq!(table.records[1].date.as_deref(), Some("2024-08-08"));
    }

    #[test]
    fn resolves_football_data_headers() {
        let raw = "Date,HomeTeam,AwayTeam,FTHG,FTAG,HS,AS,HST,AST,HC,AC,HY,AY,HR,AR\n\
                   10/08/2024,Arsenal,Wolves,2,0,18,9,6,3,8,2,1,2,0,0\n";
        let table = TeamTable::parse(raw);
        let r = &table.records[0];
        assert_eq!(r.home_team, "Arsenal");
        assert_eq!((r.home_goals, r.away_goals), (2, 0));
        assert_eq!((r.home_shots, r.away_shots), (18, 9));
        assert_eq!((r.home_shots_on_target, r.away_shots_on_target), (6, 3));
        assert_eq!((r.home_corners, r.away_corners), (8, 2));
        assert_eq!((r.home_yellow_cards, r.away_yellow_cards), (1, 2));
    }

    #[test]
    fn garbage_degrades_to_empty() {
        assert!(TeamTable::parse("").is_empty());
        assert!(TeamTable::parse("just some text\nwithout columns").is_empty());
        let bad_cells = TeamTable::parse("home_team,away_team,home_goals,away_goals\nA,B,two,-1\n");
        assert_eq!(bad_cells.records[0].home_goals, 0);
        assert_eq!(bad_cells.records[0].away_goals, 0);
    }

    #[test]
    fn safe_mean_falls_through_aliases() {
        let raw = "rpg;power_index;over25;btts\nn/a;1.5;60;\nx;2.5;70;\n";
        let table = TeamTable::parse(raw);
        assert_eq!(table.metrics.rpg, Some(2.0));
        assert_eq!(table.metrics.over25, Some(65.0));
        assert_eq!(table.metrics.btts, None);
        assert_eq!(table.metrics.win_rate, None);
        assert!(table.records.is_empty());
    }

    #[test]
    fn reads_team_meta() {
        let raw = "home_team;away_team;home_goals;away_goals;team_name;team_id\nA;B;1;0;Arsenal;42\n";
        let table = TeamTable::parse(raw);
        assert_eq!(table.meta.team_name.as_deref(), Some("Arsenal"));
        assert_eq!(table.meta.team_id, Some(42));
    }

    #[test]
    fn written_table_reads_back() {
        let mut table = TeamTable::from_records(vec![MatchRecord {
            date: Some("2024-09-01".to_string()),
            home_corners: 5,
            ..MatchRecord::new("Porto", "Benfica", 3, 1)
        }]);
        table.metrics.rpg = Some(2.0);
        table.meta.team_name = Some("Porto".to_string());

        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        let back = TeamTable::parse(std::str::from_utf8(&buf).unwrap());
        assert_eq!(back.records, table.records);
        assert_eq!(back.metrics.rpg, Some(2.0));
        assert_eq!(back.metrics.over25, None);
        assert_eq!(back.meta.team_name.as_deref(), Some("Porto"));
    }
}
