use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::DateTime;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::http_client::http_client;
use crate::refresh::{FetchedTeam, TeamFeed};
use crate::table::MatchRecord;

/// Recent-form feed backed by the public Sofascore JSON API.
#[derive(Debug, Clone)]
pub struct SofascoreFeed {
    base_url: String,
    match_limit: usize,
    timeout: Duration,
    /// Pause between consecutive per-event statistics requests.
    request_delay: Duration,
}

impl SofascoreFeed {
    pub fn new(base_url: impl Into<String>, match_limit: usize, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            match_limit,
            timeout,
            request_delay: Duration::ZERO,
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.sofascore_api_url.clone(),
            settings.match_limit,
            settings.http_timeout,
        )
        .with_request_delay(settings.refresh_delay)
    }

    fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let client = http_client(self.timeout)?;
        let url = format!("{}{path}", self.base_url);
        let resp = client
            .get(&url)
            .query(query)
            .send()
            .with_context(|| format!("request failed: {url}"))?;
        let status = resp.status();
        let body = resp.text().context("failed reading response body")?;
        if !status.is_success() {
            return Err(anyhow!("{url} returned {status}"));
        }
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(anyhow!("empty response from {url}"));
        }
        serde_json::from_str(trimmed).with_context(|| format!("invalid json from {url}"))
    }

    fn search_team(&self, query: &str) -> Result<Option<(u64, String)>> {
        let v = self.get_json("/search/all", &[("q", query)])?;
        Ok(parse_search(&v))
    }

    fn match_statistics(&self, event_id: u64) -> Result<Value> {
        self.get_json(&format!("/event/{event_id}/statistics"), &[])
    }
}

impl TeamFeed for SofascoreFeed {
    fn fetch_team(&self, query: &str, known_id: Option<u64>) -> Result<FetchedTeam> {
        let (team_id, team_name) = resolve_team(query, known_id, || self.search_team(query))?;
        debug!(team_id, team = %team_name, "resolved team");

        let events = self.get_json(&format!("/team/{team_id}/events/last/0"), &[])?;
        let mut matches = Vec::new();
        for (idx, (event_id, mut record)) in
            parse_events(&events, self.match_limit).into_iter().enumerate()
        {
            if idx > 0 && !self.request_delay.is_zero() {
                thread::sleep(self.request_delay);
            }
            match self.match_statistics(event_id) {
                Ok(stats) => apply_statistics(&mut record, &stats),
                Err(err) => debug!(event_id, error = %format!("{err:#}"), "no statistics"),
            }
            matches.push(record);
        }

        Ok(FetchedTeam {
            team_id,
            team_name,
            matches,
        })
    }
}

/// A stored id wins; the name search only runs for teams never resolved before.
fn resolve_team<S>(query: &str, known_id: Option<u64>, search: S) -> Result<(u64, String)>
where
    S: FnOnce() -> Result<Option<(u64, String)>>,
{
    if let Some(id) = known_id {
        return Ok((id, query.to_string()));
    }
    search()?.ok_or_else(|| anyhow!("no team found for '{query}'"))
}

/// First team hit, from either the `teams` list or the mixed `results` list.
pub fn parse_search(v: &Value) -> Option<(u64, String)> {
    let team_of = |t: &Value| -> Option<(u64, String)> {
        let id = t.get("id")?.as_u64()?;
        let name = t.get("name")?.as_str()?.to_string();
        Some((id, name))
    };

    if let Some(hit) = v
        .get("teams")
        .and_then(|x| x.as_array())
        .and_then(|arr| arr.iter().find_map(team_of))
    {
        return Some(hit);
    }

    v.get("results")?.as_array()?.iter().find_map(|r| {
        if r.get("type").and_then(|x| x.as_str()) != Some("team") {
            return None;
        }
        team_of(r.get("entity")?)
    })
}

/// Finished events, newest first, truncated to `limit`. Yields the event id with each row.
pub fn parse_events(v: &Value, limit: usize) -> Vec<(u64, MatchRecord)> {
    let Some(arr) = v.get("events").and_then(|x| x.as_array()) else {
        return Vec::new();
    };

    let mut parsed: Vec<(i64, u64, MatchRecord)> = arr
        .iter()
        .filter(|e| is_finished(e))
        .filter_map(|e| {
            let id = e.get("id")?.as_u64()?;
            let ts = e.get("startTimestamp").and_then(|x| x.as_i64()).unwrap_or(0);
            let home = e.get("homeTeam")?.get("name")?.as_str()?;
            let away = e.get("awayTeam")?.get("name")?.as_str()?;
            let mut record = MatchRecord::new(home, away, score(e, "homeScore"), score(e, "awayScore"));
            record.date = DateTime::from_timestamp(ts, 0).map(|dt| dt.format("%Y-%m-%d").to_string());
            Some((ts, id, record))
        })
        .collect();

    parsed.sort_by(|a, b| b.0.cmp(&a.0));
    parsed.truncate(limit);
    parsed.into_iter().map(|(_, id, r)| (id, r)).collect()
}

fn is_finished(e: &Value) -> bool {
    match e.get("status").and_then(|s| s.get("type")).and_then(|x| x.as_str()) {
        Some(kind) => kind == "finished",
        None => true,
    }
}

fn score(e: &Value, key: &str) -> u32 {
    e.get(key)
        .and_then(|s| s.get("current"))
        .and_then(|x| x.as_u64())
        .unwrap_or(0) as u32
}

/// Copies corners, shots and cards from an event statistics payload onto `record`.
/// Uses the whole-match period when present.
pub fn apply_statistics(record: &mut MatchRecord, v: &Value) {
    let Some(periods) = v.get("statistics").and_then(|x| x.as_array()) else {
        return;
    };
    let period = periods
        .iter()
        .find(|p| p.get("period").and_then(|x| x.as_str()) == Some("ALL"))
        .or_else(|| periods.first());
    let Some(groups) = period.and_then(|p| p.get("groups")).and_then(|x| x.as_array()) else {
        return;
    };

    for item in groups
        .iter()
        .filter_map(|g| g.get("statisticsItems").and_then(|x| x.as_array()))
        .flatten()
    {
        let name = item
            .get("name")
            .and_then(|x| x.as_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let home = stat_value(item, "homeValue", "home");
        let away = stat_value(item, "awayValue", "away");

        let (h, a) = if name.contains("corner") {
            (&mut record.home_corners, &mut record.away_corners)
        } else if name.contains("total shots") {
            (&mut record.home_shots, &mut record.away_shots)
        } else if name.contains("shots on target") {
            (&mut record.home_shots_on_target, &mut record.away_shots_on_target)
        } else if name.contains("yellow card") {
            (&mut record.home_yellow_cards, &mut record.away_yellow_cards)
        } else if name.contains("red card") {
            (&mut record.home_red_cards, &mut record.away_red_cards)
        } else {
            continue;
        };
        *h = home;
        *a = away;
    }
}

fn stat_value(item: &Value, numeric_key: &str, text_key: &str) -> u32 {
    if let Some(n) = item.get(numeric_key).and_then(|x| x.as_f64()) {
        return n.max(0.0).round() as u32;
    }
    item.get(text_key)
        .and_then(|x| x.as_str())
        .and_then(|s| s.trim().trim_end_matches('%').parse::<f64>().ok())
        .map(|n| n.max(0.0).round() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stored_id_skips_the_search() {
        let resolved = resolve_team("FC Porto", Some(3002), || -> Result<Option<(u64, String)>> {
            panic!("search must not run when the id is known")
        })
        .unwrap();
        assert_eq!(resolved, (3002, "FC Porto".to_string()));

        let searched = resolve_team("Porto", None, || Ok(Some((3002, "FC Porto".to_string())))).unwrap();
        assert_eq!(searched.1, "FC Porto");
        assert!(resolve_team("Nobody", None, || Ok(None)).is_err());
    }

    #[test]
    fn statistics_requests_are_paced_by_the_refresh_delay() {
        let settings = Settings {
            refresh_delay: Duration::from_millis(250),
            ..Settings::default()
        };
        let feed = SofascoreFeed::from_settings(&settings);
        assert_eq!(feed.request_delay, Duration::from_millis(250));
        assert_eq!(SofascoreFeed::new("http://x", 5, Duration::from_secs(1)).request_delay, Duration::ZERO);
    }

    #[test]
    fn search_prefers_team_list_then_results() {
        let v = json!({"teams": [{"id": 17, "name": "Manchester City"}]});
        assert_eq!(parse_search(&v), Some((17, "Manchester City".to_string())));

        let v = json!({"results": [
            {"type": "player", "entity": {"id": 1, "name": "Someone"}},
            {"type": "team", "entity": {"id": 3002, "name": "FC Porto"}}
        ]});
        assert_eq!(parse_search(&v), Some((3002, "FC Porto".to_string())));
        assert_eq!(parse_search(&json!({"results": []})), None);
    }

    #[test]
    fn events_are_finished_newest_first_and_limited() {
        let v = json!({"events": [
            {"id": 1, "startTimestamp": 1714000000, "status": {"type": "finished"},
             "homeTeam": {"name": "A"}, "awayTeam": {"name": "B"},
             "homeScore": {"current": 2}, "awayScore": {"current": 1}},
            {"id": 2, "startTimestamp": 1714600000, "status": {"type": "finished"},
             "homeTeam": {"name": "C"}, "awayTeam": {"name": "A"},
             "homeScore": {"current": 0}, "awayScore": {"current": 0}},
            {"id": 3, "startTimestamp": 1715000000, "status": {"type": "notstarted"},
             "homeTeam": {"name": "A"}, "awayTeam": {"name": "D"}}
        ]});
        let rows = parse_events(&v, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 2);
        assert_eq!(rows[0].1.home_team, "C");
        assert_eq!(rows[0].1.date.as_deref(), Some("2024-05-01"));

        let all = parse_events(&v, 20);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].1.home_goals, 2);
    }

    #[test]
    fn statistics_fill_counters_from_whole_match_period() {
        let v = json!({"statistics": [
            {"period": "1ST", "groups": [{"statisticsItems": [
                {"name": "Corner kicks", "homeValue": 1, "awayValue": 1}
            ]}]},
            {"period": "ALL", "groups": [
                {"statisticsItems": [
                    {"name": "Corner kicks", "homeValue": 7, "awayValue": 3},
                    {"name": "Total shots", "homeValue": 15, "awayValue": 9},
                    {"name": "Ball possession", "home": "60%", "away": "40%"}
                ]},
                {"statisticsItems": [
                    {"name": "Shots on target", "home": "6", "away": "2"},
                    {"name": "Yellow cards", "homeValue": 2, "awayValue": 4},
                    {"name": "Red cards", "homeValue": 0, "awayValue": 1}
                ]}
            ]}
        ]});
        let mut r = MatchRecord::new("A", "B", 1, 0);
        apply_statistics(&mut r, &v);
        assert_eq!((r.home_corners, r.away_corners), (7, 3));
        assert_eq!((r.home_shots, r.away_shots), (15, 9));
        assert_eq!((r.home_shots_on_target, r.away_shots_on_target), (6, 2));
        assert_eq!((r.home_yellow_cards, r.away_yellow_cards), (2, 4));
        assert_eq!(r.away_red_cards, 1);
    }

    #[test]
    fn missing_statistics_leave_zeros() {
        let mut r = MatchRecord::new("A", "B", 1, 0);
        apply_statistics(&mut r, &json!({"error": {"code": 404}}));
        assert_eq!(r, MatchRecord::new("A", "B", 1, 0));
    }
}
