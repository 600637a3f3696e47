//! Roster acquisition.
//!
//! The roster is loaded by walking an ordered list of [`RosterSource`]s, one
//! attempt each, and normalizing the first usable payload. The bundled player
//! list is the terminal fallback, so [`load_roster`] always produces a
//! non-empty, sorted roster.

use crate::api::{GameApi, RosterSource};
use crate::error::GameError;
use crate::mode::{GameMode, MODERN_MIN_CAREER_LENGTH, MODERN_MIN_START_YEAR};
use crate::{debug_log, info_log};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

pub const EMBEDDED_FALLBACK: &str = include_str!("resources/fallback_players.txt");

/// Keys a server may wrap the player list in.
const LIST_KEYS: [&str; 3] = ["players", "names", "data"];

pub const FETCH_FAILED_WARNING: &str = "Could not load players from server. Using built-in player list.";

/// Attributes used by the modern-era filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct EntityAttributes {
    pub start_year: i32,
    pub career_length: u32,
}

impl EntityAttributes {
    pub fn is_modern(&self) -> bool {
        self.start_year >= MODERN_MIN_START_YEAR && self.career_length >= MODERN_MIN_CAREER_LENGTH
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RosterEntry {
    pub name: String,
    pub attributes: Option<EntityAttributes>,
}

/// A roster payload after normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum RawRoster {
    /// Plain names; no attribute filtering is possible.
    Plain(Vec<String>),
    /// Records carrying (possibly missing) attributes.
    Enriched(Vec<RosterEntry>),
}

impl RawRoster {
    pub fn len(&self) -> usize {
        match self {
            Self::Plain(names) => names.len(),
            Self::Enriched(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a single roster tier was rejected.
#[derive(Debug, Error)]
pub enum RosterFailure {
    #[error("request failed: {0}")]
    Fetch(#[from] GameError),

    #[error("unexpected payload shape: {0}")]
    Schema(String),

    #[error("payload contained no usable names")]
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RosterOrigin {
    Remote(RosterSource),
    Builtin,
}

/// Outcome of [`load_roster`].
#[derive(Clone, Debug, PartialEq)]
pub struct RosterLoad {
    /// Sorted, de-duplicated, never empty.
    pub names: Vec<String>,
    /// Attributes for the names that had them. Empty for plain payloads.
    pub attributes: BTreeMap<String, EntityAttributes>,
    pub origin: RosterOrigin,
    /// Recoverable problem to show the player.
    pub warning: Option<String>,
}

impl RosterLoad {
    fn builtin(fallback: &[String], warning: String) -> Self {
        Self {
            names: sorted_unique(fallback.iter().cloned()),
            attributes: BTreeMap::new(),
            origin: RosterOrigin::Builtin,
            warning: Some(warning),
        }
    }
}

/// Parse a newline-delimited player list, skipping blank lines.
pub fn load_names_from_str(data: &str) -> Vec<String> {
    sorted_unique(data.lines().map(str::to_string))
}

pub fn load_names_from_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut names = Vec::new();
    for line in reader.lines() {
        names.push(line?);
    }
    Ok(sorted_unique(names))
}

/// The player list compiled into the binary.
pub fn builtin_roster() -> Vec<String> {
    load_names_from_str(EMBEDDED_FALLBACK)
}

/// Trim, drop empties, sort and de-duplicate.
fn sorted_unique<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn valid_name(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_attributes(record: &Map<String, Value>) -> Option<EntityAttributes> {
    let start_year = i32::try_from(record.get("start_year")?.as_i64()?).ok()?;
    let career_length = u32::try_from(record.get("career_length")?.as_u64()?).ok()?;
    Some(EntityAttributes {
        start_year,
        career_length,
    })
}

fn normalize_array(items: &[Value]) -> RawRoster {
    if items.iter().any(Value::is_object) {
        let entries = items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|record| {
                let name = valid_name(record.get("name")?)?;
                Some(RosterEntry {
                    name,
                    attributes: parse_attributes(record),
                })
            })
            .collect();
        RawRoster::Enriched(entries)
    } else {
        RawRoster::Plain(items.iter().filter_map(valid_name).collect())
    }
}

/// Convert a loosely-shaped roster payload into [`RawRoster`].
///
/// Accepted shapes: an array of names, an array of `{name, start_year,
/// career_length}` records, a map of name to attributes, or either array form
/// wrapped in an object under `players`, `names` or `data`.
pub fn normalize_payload(payload: &Value) -> Result<RawRoster, RosterFailure> {
    let raw = match payload {
        Value::Array(items) => normalize_array(items),
        Value::Object(map) => {
            if let Some(inner) = LIST_KEYS.iter().find_map(|k| map.get(*k).and_then(Value::as_array)) {
                normalize_array(inner)
            } else if !map.is_empty() && map.values().all(Value::is_object) {
                let entries = map
                    .iter()
                    .filter_map(|(name, record)| {
                        let name = name.trim();
                        if name.is_empty() {
                            return None;
                        }
                        Some(RosterEntry {
                            name: name.to_string(),
                            attributes: record.as_object().and_then(parse_attributes),
                        })
                    })
                    .collect();
                RawRoster::Enriched(entries)
            } else {
                return Err(RosterFailure::Schema("object without a player list".to_string()));
            }
        }
        other => {
            return Err(RosterFailure::Schema(format!("expected array or object, got {other}")));
        }
    };

    if raw.is_empty() {
        return Err(RosterFailure::Empty);
    }
    Ok(raw)
}

async fn fetch_tier(
    api: &dyn GameApi,
    source: RosterSource,
    mode: GameMode,
) -> Result<RawRoster, RosterFailure> {
    let payload = api.fetch_roster(source, mode).await?;
    normalize_payload(&payload)
}

/// Apply the mode filter to a normalized payload.
///
/// Returns the filtered names and the attribute map. Plain payloads in a
/// filtering mode are narrowed to the names in the bundled modern list, even
/// when a custom fallback roster is configured.
pub fn apply_mode_filter(
    raw: RawRoster,
    mode: GameMode,
    source: RosterSource,
) -> (Vec<String>, BTreeMap<String, EntityAttributes>) {
    let filtering = mode.filters_by_attributes() && !source.filters_server_side();

    match raw {
        RawRoster::Plain(names) => {
            let names = sorted_unique(names);
            if !filtering {
                return (names, BTreeMap::new());
            }
            let modern: BTreeSet<String> = builtin_roster().into_iter().collect();
            let names = names.into_iter().filter(|n| modern.contains(n)).collect();
            (names, BTreeMap::new())
        }
        RawRoster::Enriched(entries) => {
            let mut attributes = BTreeMap::new();
            let mut names = Vec::with_capacity(entries.len());
            for entry in entries {
                let keep = !filtering || entry.attributes.is_some_and(|a| a.is_modern());
                if let Some(attrs) = entry.attributes {
                    attributes.entry(entry.name.clone()).or_insert(attrs);
                }
                if keep {
                    names.push(entry.name);
                }
            }
            let names = sorted_unique(names);
            attributes.retain(|name, _| names.binary_search(name).is_ok());
            (names, attributes)
        }
    }
}

/// Load the roster for `mode`, trying `sources` in order.
///
/// Never fails: when every source fails, or the mode filter leaves nothing,
/// the result is `fallback` with a warning attached.
pub async fn load_roster(
    api: &dyn GameApi,
    mode: GameMode,
    sources: &[RosterSource],
    fallback: &[String],
) -> RosterLoad {
    for &source in sources {
        let raw = match fetch_tier(api, source, mode).await {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Roster source {} failed: {e}", source.path());
                continue;
            }
        };

        let total = raw.len();
        let (names, attributes) = apply_mode_filter(raw, mode, source);
        info_log!(
            "Loaded {} players from {}, {} eligible for {} mode",
            total,
            source.path(),
            names.len(),
            mode
        );

        if names.is_empty() {
            log::warn!("No players from {} matched {} mode", source.path(), mode);
            return RosterLoad::builtin(
                fallback,
                format!("No players matched {} mode. Using built-in player list.", mode.label()),
            );
        }

        return RosterLoad {
            names,
            attributes,
            origin: RosterOrigin::Remote(source),
            warning: None,
        };
    }

    debug_log!("All roster sources failed, using {} built-in names", fallback.len());
    RosterLoad::builtin(fallback, FETCH_FAILED_WARNING.to_string())
}
