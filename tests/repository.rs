use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use h2h_predictor::refresh::{FetchedTeam, Refresher, TeamFeed};
use h2h_predictor::repository::{CachedRepository, FileRepository, TeamRepository};
use h2h_predictor::table::{MatchRecord, TeamTable};

fn fixture_leagues() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("leagues");
    path
}

fn scratch_dir(tag: &str) -> PathBuf {
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    let n = SEQ.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("h2h_predictor_{tag}_{}_{n}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

#[test]
fn lists_leagues_with_metadata() {
    let repo = FileRepository::new(fixture_leagues());
    let leagues = repo.list_leagues().unwrap();
    assert_eq!(leagues.len(), 1);
    let liga = &leagues[0];
    assert_eq!(liga.league_id, "primeira-liga");
    assert_eq!(liga.name, "Primeira Liga");
    assert_eq!(liga.extra["country"], "Portugal");
    assert_eq!(liga.extra["season_id"], "52769");
    assert_eq!(liga.extra["external_league_id"], "238");
}

#[test]
fn lists_teams_sorted_by_display_name() {
    let repo = FileRepository::new(fixture_leagues());
    let teams = repo.list_teams("primeira-liga").unwrap();
    let names: Vec<&str> = teams.iter().map(|t| t.display_name.as_str()).collect();
    assert_eq!(names, ["Maritimo", "Porto", "SL Benfica", "Sporting Cp"]);
    let sporting = teams.iter().find(|t| t.team == "sporting-cp").unwrap();
    assert_eq!(sporting.filename, "Sporting_CP.csv");
    assert!(repo.list_teams("unknown").unwrap().is_empty());
}

#[test]
fn missing_root_lists_nothing() {
    let repo = FileRepository::new(scratch_dir("empty").join("nope"));
    assert!(repo.list_leagues().unwrap().is_empty());
    assert!(repo.get_table("any", "team").unwrap().is_none());
}

#[test]
fn save_then_load_keeps_rows_metrics_and_meta() {
    let repo = FileRepository::new(scratch_dir("save"));
    let mut table = TeamTable::from_records(vec![
        MatchRecord::new("Gil Vicente", "Rio Ave", 1, 0),
        MatchRecord::new("Arouca", "Gil Vicente", 2, 2),
    ]);
    table.metrics.win_rate = Some(50.0);
    table.meta.team_name = Some("Gil Vicente".to_string());
    table.meta.team_id = Some(3006);
    repo.save_table("Primeira Liga", "Gil Vicente", &table).unwrap();

    let path = repo.root().join("primeira-liga").join("gil-vicente.csv");
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with("date;home_team;away_team"));

    let back = repo.get_table("primeira-liga", "gil-vicente").unwrap().unwrap();
    assert_eq!(back.records, table.records);
    assert_eq!(back.metrics.win_rate, Some(50.0));
    assert_eq!(back.meta.team_id, Some(3006));
}

#[test]
fn create_league_and_import() {
    let repo = FileRepository::new(scratch_dir("create"));
    let meta = repo
        .create_league("Liga Portugal 2", Some("239".into()), None, Some("Portugal".into()))
        .unwrap();
    assert_eq!(meta.league_slug, "liga-portugal-2");

    let leagues = repo.list_leagues().unwrap();
    assert_eq!(leagues[0].name, "Liga Portugal 2");
    assert!(leagues[0].extra.get("season_id").is_none());

    let stored = repo
        .import_table("liga-portugal-2", "Académico Viseu", b"home_team,away_team,home_goals,away_goals\nAcademico Viseu,Feirense,1,1\n")
        .unwrap();
    assert!(stored.ends_with("academico-viseu.csv"));
    let table = repo.get_table("liga-portugal-2", "Académico Viseu").unwrap().unwrap();
    assert_eq!(table.records.len(), 1);
}

struct StaticFeed;

impl TeamFeed for StaticFeed {
    fn fetch_team(&self, query: &str, _known_id: Option<u64>) -> anyhow::Result<FetchedTeam> {
        Ok(FetchedTeam {
            team_id: 99,
            team_name: query.to_string(),
            matches: vec![
                MatchRecord::new(query, "Estrela", 3, 1),
                MatchRecord::new("Farense", query, 1, 1),
            ],
        })
    }
}

#[test]
fn refresh_writes_through_cache() {
    let dir = scratch_dir("refresh");
    let files = FileRepository::new(&dir);
    files
        .import_table("liga", "Casa Pia", b"home_team;away_team;home_goals;away_goals\nCasa Pia;Boavista;0;1\n")
        .unwrap();
    let repo = CachedRepository::new(files);
    assert_eq!(repo.get_table("liga", "casa-pia").unwrap().unwrap().records.len(), 1);

    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let refresher = Refresher::new(&repo, &StaticFeed, chrono::Duration::hours(48), Duration::ZERO);
    let report = refresher.run(None, false, now).unwrap();
    assert_eq!(report.updated, ["liga/casa-pia"]);
    assert!(report.failed.is_empty());

    let table = repo.get_table("liga", "casa-pia").unwrap().unwrap();
    assert_eq!(table.records.len(), 2);
    assert_eq!(table.meta.team_id, Some(99));
    assert_eq!(table.metrics.over15, Some(100.0));
    assert_eq!(table.meta.last_update_utc.as_deref(), Some("2024-06-01T12:00:00+00:00"));

    // Stamped one hour ago: not due yet.
    let later = now + chrono::Duration::hours(1);
    let again = refresher.run(Some("liga"), false, later).unwrap();
    assert!(again.updated.is_empty());
    assert_eq!(again.skipped, ["liga/casa-pia"]);
}
