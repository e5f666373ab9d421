//! File-backed cache of expert agent query/response pairs.
//!
//! Every expert call is appended as a flat text record under a single cache
//! root. The orchestrator consults the cache before issuing remote queries:
//! a substring search over all records finds prior work, and retrieval by
//! identifier folds the full content back into its context. Records are
//! append-only and uniquely named; nothing here mutates or deletes them.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CacheError;
use crate::metrics;

/// Marker line opening the query section of a serialized record.
pub const QUERY_MARKER: &str = "============ Agent query ==============";
/// Marker line opening the result section of a serialized record.
pub const RESULT_MARKER: &str = "============ Result ==============";

const RECORD_SUFFIX: &str = "_result.txt";
const CACHE_DIR_ENV: &str = "GENEFOREST_CACHE_DIR";
const DEFAULT_CACHE_DIR: &str = "data/interim";

/// A cached record with both parsed sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResult {
    pub identifier: String,
    pub query: String,
    pub result: String,
}

/// Lightweight view of a cached record, query section only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedQuery {
    pub identifier: String,
    pub query: String,
}

/// Append-only store of expert query/response records.
#[derive(Debug, Clone)]
pub struct ResultCache {
    root: PathBuf,
}

impl ResultCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the default cache root (`GENEFOREST_CACHE_DIR` override,
    /// `data/interim` otherwise).
    pub fn default_root() -> PathBuf {
        std::env::var(CACHE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist one query/response pair and return its identifier.
    ///
    /// The identifier embeds the caller name and a UTC second timestamp.
    /// Records are created with create-new semantics: a same-second write
    /// from the same caller gets a `-{n}` counter suffix instead of
    /// overwriting. Once this returns the record is visible to [`search`]
    /// and [`read`].
    ///
    /// [`search`]: ResultCache::search
    /// [`read`]: ResultCache::read
    pub fn write(
        &self,
        caller_name: &str,
        query_text: &str,
        response_text: &str,
    ) -> Result<String, CacheError> {
        if caller_name.trim().is_empty() {
            return Err(CacheError::InvalidRecord("caller_name must be non-empty"));
        }
        if !is_bare_name(caller_name) {
            return Err(CacheError::InvalidRecord(
                "caller_name must not contain path separators",
            ));
        }
        if query_text.trim().is_empty() {
            return Err(CacheError::InvalidRecord("query_text must be non-empty"));
        }

        fs::create_dir_all(&self.root).map_err(|err| {
            metrics::record_cache_write("unavailable");
            CacheError::storage_unavailable(self.root.clone(), err)
        })?;

        let stamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let payload = format!("{QUERY_MARKER}\n{query_text}\n{RESULT_MARKER}\n{response_text}");

        let mut attempt: u32 = 0;
        loop {
            let identifier = if attempt == 0 {
                format!("{caller_name}_{stamp}{RECORD_SUFFIX}")
            } else {
                format!("{caller_name}_{stamp}-{attempt}{RECORD_SUFFIX}")
            };
            let path = self.root.join(&identifier);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(payload.as_bytes()).map_err(|err| {
                        metrics::record_cache_write("unavailable");
                        CacheError::storage_unavailable(path.clone(), err)
                    })?;
                    metrics::record_cache_write("ok");
                    debug!(identifier = %identifier, "cached agent result");
                    return Ok(identifier);
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                }
                Err(err) => {
                    metrics::record_cache_write("unavailable");
                    return Err(CacheError::storage_unavailable(path, err));
                }
            }
        }
    }

    /// Find all records whose raw serialized text contains `term`,
    /// case-insensitively.
    ///
    /// An empty term matches every record (the substring check is vacuously
    /// true). Unreadable records are skipped; a nonexistent cache root
    /// yields an empty list. Results are sorted by identifier so callers
    /// see a deterministic order.
    pub fn search(&self, term: &str) -> Vec<CachedResult> {
        let needle = term.to_lowercase();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(
                    root = %self.root.display(),
                    error = %err,
                    "cache root unavailable for search"
                );
                return Vec::new();
            }
        };

        let mut matches = Vec::new();
        let mut scanned = 0usize;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(identifier) = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
            else {
                continue;
            };
            if !identifier.ends_with(RECORD_SUFFIX) {
                continue;
            }
            scanned += 1;

            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    debug!(
                        identifier = %identifier,
                        error = %err,
                        "skipping unreadable cache record"
                    );
                    continue;
                }
            };

            if !content.to_lowercase().contains(&needle) {
                continue;
            }

            let (query, result) = parse_sections(&content);
            matches.push(CachedResult {
                identifier,
                query,
                result,
            });
        }

        matches.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        metrics::record_cache_search(scanned, matches.len());
        matches
    }

    /// Same scan as [`search`], with the result section omitted. Used as a
    /// lightweight first pass before retrieving full records.
    ///
    /// [`search`]: ResultCache::search
    pub fn search_queries_only(&self, term: &str) -> Vec<CachedQuery> {
        self.search(term)
            .into_iter()
            .map(|hit| CachedQuery {
                identifier: hit.identifier,
                query: hit.query,
            })
            .collect()
    }

    /// Load the full raw contents of the given identifiers, joined with a
    /// single newline, preserving input order.
    ///
    /// Identifiers that do not resolve are skipped silently — callers learn
    /// identifiers from a search, so a miss is a benign race, not a bug.
    /// Identifiers that are not bare file names are ignored.
    pub fn read(&self, identifiers: &[String]) -> String {
        let mut contents = Vec::new();
        for identifier in identifiers {
            if !is_bare_name(identifier) {
                debug!(identifier = %identifier, "ignoring non-filename cache identifier");
                continue;
            }
            let path = self.root.join(identifier);
            match fs::read_to_string(&path) {
                Ok(content) => contents.push(content),
                Err(err) => {
                    metrics::record_retrieval_miss();
                    debug!(
                        identifier = %identifier,
                        error = %err,
                        "cache record missing or unreadable"
                    );
                }
            }
        }
        contents.join("\n")
    }
}

/// Split a serialized record into its query and result sections.
///
/// Line state machine: the two marker lines switch the active section, every
/// other line accumulates into whichever section is active. When the markers
/// are absent both sections come back empty — malformed records degrade, they
/// do not fail.
pub fn parse_sections(content: &str) -> (String, String) {
    let mut in_query = false;
    let mut in_result = false;
    let mut query_lines: Vec<&str> = Vec::new();
    let mut result_lines: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line == QUERY_MARKER {
            in_query = true;
            in_result = false;
            continue;
        }
        if line == RESULT_MARKER {
            in_query = false;
            in_result = true;
            continue;
        }
        if in_query {
            query_lines.push(line);
        } else if in_result {
            result_lines.push(line);
        }
    }

    (
        query_lines.join("\n").trim().to_string(),
        result_lines.join("\n").trim().to_string(),
    )
}

// An identifier must name a file directly under the cache root.
fn is_bare_name(name: &str) -> bool {
    Path::new(name)
        .file_name()
        .and_then(|file_name| file_name.to_str())
        .is_some_and(|file_name| file_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache() -> (TempDir, ResultCache) {
        let temp = TempDir::new().expect("temp dir");
        let cache = ResultCache::new(temp.path());
        (temp, cache)
    }

    #[test]
    fn write_then_read_round_trips_both_sections() {
        let (_temp, cache) = cache();
        let query = "List FOXO3 interaction partners\nwith confidence scores";
        let response = "STRING reports 14 partners.\n\n| partner | score |\n|---|---|";

        let id = cache.write("structure_agent", query, response).expect("write");
        let raw = cache.read(&[id]);

        let (parsed_query, parsed_result) = parse_sections(&raw);
        assert_eq!(parsed_query, query);
        assert_eq!(parsed_result, response);
    }

    #[test]
    fn identifier_embeds_caller_and_search_finds_the_record() {
        let (_temp, cache) = cache();
        let id = cache
            .write("biomart_agent", "TP53 orthologs?", "Found 5 orthologs...")
            .expect("write");
        assert!(id.contains("biomart_agent"));

        let hits = cache.search("TP53");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, id);
        assert_eq!(hits[0].query, "TP53 orthologs?");
        assert_eq!(hits[0].result, "Found 5 orthologs...");
    }

    #[test]
    fn search_is_case_insensitive_across_callers() {
        let (_temp, cache) = cache();
        cache
            .write("biomart_agent", "FOXO3 orthologs in primates", "...")
            .expect("write");
        cache
            .write("opengenes_agent", "FOXO3 longevity variants", "...")
            .expect("write");

        let hits = cache.search("foxo3");
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn empty_term_matches_every_record() {
        let (_temp, cache) = cache();
        cache.write("a_agent", "first query", "one").expect("write");
        cache.write("b_agent", "second query", "two").expect("write");

        assert_eq!(cache.search("").len(), 2);
    }

    #[test]
    fn search_against_missing_root_returns_empty() {
        let temp = TempDir::new().expect("temp dir");
        let cache = ResultCache::new(temp.path().join("never-created"));
        assert!(cache.search("anything").is_empty());
    }

    #[test]
    fn read_preserves_input_order_not_storage_order() {
        let (_temp, cache) = cache();
        let first = cache.write("a_agent", "alpha query", "alpha").expect("write");
        let second = cache.write("b_agent", "beta query", "beta").expect("write");

        let forward = cache.read(&[first.clone(), second.clone()]);
        let reversed = cache.read(&[second.clone(), first.clone()]);

        let content_first = cache.read(&[first]);
        let content_second = cache.read(&[second]);
        assert_eq!(forward, format!("{content_first}\n{content_second}"));
        assert_eq!(reversed, format!("{content_second}\n{content_first}"));
    }

    #[test]
    fn read_skips_missing_identifiers_silently() {
        let (_temp, cache) = cache();
        let id = cache.write("a_agent", "some query", "payload").expect("write");
        let expected = cache.read(&[id.clone()]);

        let combined = cache.read(&[id, "nonexistent_result.txt".to_string()]);
        assert_eq!(combined, expected);
    }

    #[test]
    fn read_is_idempotent() {
        let (_temp, cache) = cache();
        let a = cache.write("a_agent", "query one", "one").expect("write");
        let b = cache.write("b_agent", "query two", "two").expect("write");
        let ids = vec![b, a];

        assert_eq!(cache.read(&ids), cache.read(&ids));
    }

    #[test]
    fn read_returns_empty_string_when_nothing_resolves() {
        let (_temp, cache) = cache();
        assert_eq!(cache.read(&["ghost_result.txt".to_string()]), "");
    }

    #[test]
    fn read_ignores_path_traversal_identifiers() {
        let (_temp, cache) = cache();
        let escape = "../outside_result.txt".to_string();
        assert_eq!(cache.read(&[escape]), "");
    }

    #[test]
    fn colliding_writes_get_distinct_identifiers() {
        let (_temp, cache) = cache();
        // Same caller, same second: the second write must detect the
        // existing record and take a counter suffix.
        let ids: Vec<String> = (0..3)
            .map(|n| {
                cache
                    .write("biomart_agent", &format!("query {n}"), "r")
                    .expect("write")
            })
            .collect();

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len(), "identifiers collided: {ids:?}");
        assert_eq!(cache.search("").len(), 3);
    }

    #[test]
    fn record_without_markers_degrades_to_empty_sections() {
        let (temp, cache) = cache();
        std::fs::write(
            temp.path().join("legacy_20200101_000000_result.txt"),
            "free-form note with no markers",
        )
        .expect("seed record");

        let hits = cache.search("free-form");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].query, "");
        assert_eq!(hits[0].result, "");
    }

    #[test]
    fn unreadable_record_does_not_abort_the_scan() {
        let (temp, cache) = cache();
        cache.write("a_agent", "good query", "good").expect("write");
        // Not valid UTF-8: read_to_string fails for this record only.
        std::fs::write(
            temp.path().join("broken_20200101_000000_result.txt"),
            [0xff, 0xfe, 0x00, 0xff],
        )
        .expect("seed record");

        let hits = cache.search("good");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn rejects_empty_caller_or_query() {
        let (_temp, cache) = cache();
        assert!(matches!(
            cache.write("", "query", "r"),
            Err(CacheError::InvalidRecord(_))
        ));
        assert!(matches!(
            cache.write("agent", "  ", "r"),
            Err(CacheError::InvalidRecord(_))
        ));
        assert!(matches!(
            cache.write("../agent", "query", "r"),
            Err(CacheError::InvalidRecord(_))
        ));
    }

    #[test]
    fn empty_response_is_allowed() {
        let (_temp, cache) = cache();
        let id = cache.write("a_agent", "query", "").expect("write");
        let (query, result) = parse_sections(&cache.read(&[id]));
        assert_eq!(query, "query");
        assert_eq!(result, "");
    }

    #[test]
    fn search_queries_only_drops_results() {
        let (_temp, cache) = cache();
        cache
            .write("opengenes_agent", "NRF2 aging evidence", "long response body")
            .expect("write");

        let hits = cache.search_queries_only("nrf2");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].query, "NRF2 aging evidence");
    }

    #[test]
    fn serialized_layout_uses_fixed_markers_in_order() {
        let (temp, cache) = cache();
        let id = cache.write("a_agent", "q", "r").expect("write");
        let raw = std::fs::read_to_string(temp.path().join(&id)).expect("read raw");
        assert_eq!(raw, format!("{QUERY_MARKER}\nq\n{RESULT_MARKER}\nr"));
    }
}
