//! In-memory prefix autocomplete over system names.
//!
//! The index loads the newline-delimited name cache written by
//! `rp-export-names` once at startup and answers prefix queries in
//! O(log n + k): a binary search for the first candidate, then a bounded
//! forward scan. It is immutable after load and safe to share across any
//! number of request handlers.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Rough per-name memory cost used for the reported estimate: the average
/// name plus `String`/`Vec` overhead.
const BYTES_PER_NAME: usize = 15;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("system name cache not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read system name cache")]
    Io(#[from] std::io::Error),
}

/// The loaded index.
#[derive(Debug)]
pub struct NameIndex {
    names: Vec<String>,
    path: PathBuf,
    load_seconds: f64,
}

/// Point-in-time statistics for the stats and health endpoints.
#[derive(Debug, serde::Serialize)]
pub struct Stats {
    pub loaded: bool,
    pub total_systems: usize,
    pub load_time_seconds: f64,
    pub estimated_memory_mb: f64,
    pub names_file: String,
}

impl NameIndex {
    /// Reads every non-blank line of the cache file. The export writes names
    /// pre-sorted; an unsorted file is repaired here with a warning rather
    /// than trusted, since the search below depends on the order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_owned();
        if !path.exists() {
            return Err(LoadError::Missing(path));
        }

        let started = Instant::now();
        let file = std::fs::File::open(&path)?;
        let mut names = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let line = line?;
            let name = line.trim();
            if !name.is_empty() {
                names.push(name.to_owned());
            }
        }

        if !is_sorted(&names) {
            tracing::warn!("system name cache is not sorted; sorting in memory");
            names.sort();
        }

        let load_seconds = started.elapsed().as_secs_f64();
        tracing::info!(
            total = names.len(),
            seconds = load_seconds,
            estimated_mb = estimated_memory_mb(names.len()),
            path = %path.display(),
            "loaded system name cache"
        );

        Ok(NameIndex {
            names,
            path,
            load_seconds,
        })
    }

    /// Names whose lower-cased form starts with the lower-cased `query`, up
    /// to `limit`. An empty query matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        if query.is_empty() {
            return Vec::new();
        }

        let needle = query.to_lowercase();
        let first = self
            .names
            .partition_point(|name| name.to_lowercase() < needle);

        self.names[first..]
            .iter()
            .take_while(|name| name.to_lowercase().starts_with(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            loaded: true,
            total_systems: self.names.len(),
            load_time_seconds: self.load_seconds,
            estimated_memory_mb: estimated_memory_mb(self.names.len()),
            names_file: self.path.display().to_string(),
        }
    }
}

fn estimated_memory_mb(names: usize) -> f64 {
    (names * BYTES_PER_NAME) as f64 / 1024.0 / 1024.0
}

fn is_sorted(names: &[String]) -> bool {
    names.windows(2).all(|pair| pair[0] <= pair[1])
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn index_of(names: &[&str]) -> NameIndex {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for name in names {
            writeln!(file, "{name}").unwrap();
        }
        file.flush().unwrap();
        NameIndex::load(file.path()).unwrap()
    }

    #[test]
    fn prefix_search_matches_case_insensitively() {
        let index = index_of(&["Alpha", "Alpha Centauri", "Beta"]);

        assert_eq!(index.search("alp", 10), vec!["Alpha", "Alpha Centauri"]);
        assert_eq!(index.search("", 10), Vec::<String>::new());
        assert_eq!(index.search("z", 10), Vec::<String>::new());
    }

    #[test]
    fn limit_caps_the_result() {
        let index = index_of(&["Col 285 Sector A", "Col 285 Sector B", "Col 285 Sector C"]);

        assert_eq!(index.search("col", 2).len(), 2);
    }

    #[test]
    fn full_names_match_their_own_prefix() {
        let index = index_of(&["Sol", "Solati"]);

        assert_eq!(index.search("Sol", 10), vec!["Sol", "Solati"]);
        assert_eq!(index.search("Solati", 10), vec!["Solati"]);
    }

    #[test]
    fn unsorted_caches_are_repaired_on_load() {
        let index = index_of(&["Wregoe", "Achenar", "Sol"]);

        assert_eq!(index.search("a", 10), vec!["Achenar"]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn blank_lines_and_trailing_newlines_are_tolerated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Achenar\n\nSol\n").unwrap();
        file.flush().unwrap();

        let index = NameIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn missing_cache_is_a_distinct_error() {
        let error = NameIndex::load("/nonexistent/system_names.txt").unwrap_err();
        assert!(matches!(error, LoadError::Missing(_)));
    }

    #[test]
    fn stats_reflect_the_load() {
        let index = index_of(&["Sol"]);
        let stats = index.stats();

        assert!(stats.loaded);
        assert_eq!(stats.total_systems, 1);
        assert!(stats.estimated_memory_mb > 0.0);
    }
}
