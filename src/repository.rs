use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{H2hError, Result};
use crate::slug::{display_name, slugify, team_filename};
use crate::table::TeamTable;

const LEAGUE_META_FILE: &str = "liga.json";

/// Source of per-team tables keyed by (league, team).
pub trait TeamRepository {
    /// `Ok(None)` when no table is stored for the team. Unreadable or malformed files come
    /// back as (possibly empty) tables, not errors.
    fn get_table(&self, league: &str, team: &str) -> Result<Option<TeamTable>>;

    fn list_leagues(&self) -> Result<Vec<LeagueInfo>>;

    fn list_teams(&self, league: &str) -> Result<Vec<TeamEntry>>;

    fn save_table(&self, league: &str, team: &str, table: &TeamTable) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueInfo {
    pub league_id: String,
    pub name: String,
    /// Any other keys found in the league's metadata file.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamEntry {
    pub team: String,
    pub display_name: String,
    pub team_id: Option<u64>,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueMetadata {
    pub league: String,
    pub league_slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Tables stored as `<root>/<league>/<team>.csv`.
#[derive(Debug, Clone)]
pub struct FileRepository {
    root: PathBuf,
}

impl FileRepository {
    pub fn new(leagues_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: leagues_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn league_dir(&self, league: &str) -> PathBuf {
        self.root.join(slugify(league))
    }

    /// Exact slug file first, then any file in the league folder whose stem slugifies to the
    /// team slug, then a loose `<league>_<team>.csv` next to the league folders.
    pub fn locate(&self, league: &str, team: &str) -> Option<PathBuf> {
        let league_slug = slugify(league);
        let team_slug = slugify(team);
        if league_slug.is_empty() || team_slug.is_empty() {
            return None;
        }
        let dir = self.root.join(&league_slug);

        let direct = dir.join(team_filename(team));
        if direct.is_file() {
            return Some(direct);
        }

        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if !is_csv(&path) {
                    continue;
                }
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                if slugify(stem) == team_slug {
                    return Some(path);
                }
            }
        }

        let loose = self.root.join(format!("{league_slug}_{team_slug}.csv"));
        loose.is_file().then_some(loose)
    }

    pub fn create_league(
        &self,
        name: &str,
        league_id: Option<String>,
        season_id: Option<String>,
        country: Option<String>,
    ) -> Result<LeagueMetadata> {
        let slug = slugify(name);
        let dir = self.root.join(&slug);
        fs::create_dir_all(&dir).map_err(|e| H2hError::io(&dir, e))?;

        let meta = LeagueMetadata {
            league: name.trim().to_string(),
            league_slug: slug,
            league_id,
            season_id,
            country,
        };
        let path = dir.join(LEAGUE_META_FILE);
        let json = serde_json::to_string_pretty(&meta).map_err(|source| H2hError::Metadata {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| H2hError::io(&path, e))?;
        info!(league = %meta.league_slug, "league created");
        Ok(meta)
    }

    /// Stores an uploaded table verbatim under the team's slug filename.
    pub fn import_table(&self, league: &str, team_name: &str, raw: &[u8]) -> Result<PathBuf> {
        let dir = self.league_dir(league);
        fs::create_dir_all(&dir).map_err(|e| H2hError::io(&dir, e))?;
        let path = dir.join(team_filename(team_name));
        fs::write(&path, raw).map_err(|e| H2hError::io(&path, e))?;
        info!(path = %path.display(), bytes = raw.len(), "table imported");
        Ok(path)
    }

    fn read_league_meta(dir: &Path) -> Option<serde_json::Map<String, serde_json::Value>> {
        let path = dir.join(LEAGUE_META_FILE);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                warn!(path = %path.display(), "ignoring unreadable league metadata");
                None
            }
        }
    }
}

impl TeamRepository for FileRepository {
    fn get_table(&self, league: &str, team: &str) -> Result<Option<TeamTable>> {
        let Some(path) = self.locate(league, team) else {
            debug!(league, team, "no table on disk");
            return Ok(None);
        };
        let table = match fs::read(&path) {
            Ok(bytes) => TeamTable::parse(&String::from_utf8_lossy(&bytes)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable table, using empty");
                TeamTable::default()
            }
        };
        debug!(path = %path.display(), rows = table.records.len(), "table loaded");
        Ok(Some(table))
    }

    fn list_leagues(&self) -> Result<Vec<LeagueInfo>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(H2hError::io(&self.root, err)),
        };

        let mut leagues = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(id) = path.file_name().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let mut info = LeagueInfo {
                name: id.clone(),
                league_id: id,
                extra: serde_json::Map::new(),
            };
            if let Some(meta) = Self::read_league_meta(&path) {
                for (key, value) in meta {
                    match key.as_str() {
                        "league" => {
                            if let Some(name) = value.as_str().filter(|s| !s.trim().is_empty()) {
                                info.name = name.to_string();
                            }
                        }
                        "league_id" | "name" => {
                            // Folder name stays the id; an external id is kept separately.
                            info.extra.insert(format!("external_{key}"), value);
                        }
                        _ => {
                            info.extra.insert(key, value);
                        }
                    }
                }
            }
            leagues.push(info);
        }
        leagues.sort_by_key(|l| l.name.to_lowercase());
        Ok(leagues)
    }

    fn list_teams(&self, league: &str) -> Result<Vec<TeamEntry>> {
        let dir = self.league_dir(league);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(H2hError::io(&dir, err)),
        };
        let paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| is_csv(p))
            .collect();

        let mut teams: Vec<TeamEntry> = paths
            .par_iter()
            .map(|path| {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();
                let team = slugify(&stem);
                let meta = fs::read(path)
                    .map(|bytes| TeamTable::parse(&String::from_utf8_lossy(&bytes)).meta)
                    .unwrap_or_default();
                TeamEntry {
                    display_name: meta.team_name.unwrap_or_else(|| display_name(&team)),
                    team,
                    team_id: meta.team_id,
                    filename: path
                        .file_name()
                        .and_then(|s| s.to_str())
                        .unwrap_or_default()
                        .to_string(),
                }
            })
            .collect();
        teams.sort_by_key(|t| t.display_name.to_lowercase());
        Ok(teams)
    }

    fn save_table(&self, league: &str, team: &str, table: &TeamTable) -> Result<()> {
        let dir = self.league_dir(league);
        fs::create_dir_all(&dir).map_err(|e| H2hError::io(&dir, e))?;
        let path = dir.join(team_filename(team));
        let tmp = path.with_extension("csv.tmp");

        let file = fs::File::create(&tmp).map_err(|e| H2hError::io(&tmp, e))?;
        table.write_to(file).map_err(|source| H2hError::Csv {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|e| H2hError::io(&path, e))?;
        debug!(path = %path.display(), rows = table.records.len(), "table saved");
        Ok(())
    }
}

/// In-process store, keyed by slugs.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: Mutex<HashMap<(String, String), TeamTable>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, league: &str, team: &str, table: TeamTable) {
        let mut guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key(league, team), table);
    }
}

impl TeamRepository for MemoryRepository {
    fn get_table(&self, league: &str, team: &str) -> Result<Option<TeamTable>> {
        let guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(&key(league, team)).cloned())
    }

    fn list_leagues(&self) -> Result<Vec<LeagueInfo>> {
        let guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = guard.keys().map(|(league, _)| league.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids
            .into_iter()
            .map(|id| LeagueInfo {
                name: id.clone(),
                league_id: id,
                extra: serde_json::Map::new(),
            })
            .collect())
    }

    fn list_teams(&self, league: &str) -> Result<Vec<TeamEntry>> {
        let league = slugify(league);
        let guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let mut teams: Vec<TeamEntry> = guard
            .iter()
            .filter(|((l, _), _)| *l == league)
            .map(|((_, team), table)| TeamEntry {
                display_name: table
                    .meta
                    .team_name
                    .clone()
                    .unwrap_or_else(|| display_name(team)),
                team: team.clone(),
                team_id: table.meta.team_id,
                filename: team_filename(team),
            })
            .collect();
        teams.sort_by_key(|t| t.display_name.to_lowercase());
        Ok(teams)
    }

    fn save_table(&self, league: &str, team: &str, table: &TeamTable) -> Result<()> {
        self.insert(league, team, table.clone());
        Ok(())
    }
}

/// Read-through cache over another repository. Saves go through and drop the cached entry.
#[derive(Debug)]
pub struct CachedRepository<R> {
    inner: R,
    cache: Mutex<HashMap<(String, String), TeamTable>>,
}

impl<R: TeamRepository> CachedRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn invalidate(&self, league: &str, team: &str) {
        let mut guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        guard.remove(&key(league, team));
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<R: TeamRepository> TeamRepository for CachedRepository<R> {
    fn get_table(&self, league: &str, team: &str) -> Result<Option<TeamTable>> {
        let k = key(league, team);
        {
            let guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(table) = guard.get(&k) {
                return Ok(Some(table.clone()));
            }
        }
        let loaded = self.inner.get_table(league, team)?;
        // Absence is not cached: a refresh may create the file later.
        if let Some(table) = loaded.as_ref() {
            let mut guard = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            guard.insert(k, table.clone());
        }
        Ok(loaded)
    }

    fn list_leagues(&self) -> Result<Vec<LeagueInfo>> {
        self.inner.list_leagues()
    }

    fn list_teams(&self, league: &str) -> Result<Vec<TeamEntry>> {
        self.inner.list_teams(league)
    }

    fn save_table(&self, league: &str, team: &str, table: &TeamTable) -> Result<()> {
        let result = self.inner.save_table(league, team, table);
        self.invalidate(league, team);
        result
    }
}

fn key(league: &str, team: &str) -> (String, String) {
    (slugify(league), slugify(team))
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}
