//! Pattern engine: parsing, merging, compiling, and matching
//! gitignore-wildmatch pattern sets.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex};

use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;

use crate::error::Error;

/// Splits free-form pattern text on commas/whitespace, normalizes slashes,
/// drops empty tokens, and rejects characters outside the allowed set.
pub fn parse_patterns(raw: &str) -> Result<BTreeSet<String>, Error> {
    let mut out = BTreeSet::new();
    for token in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let normalized = normalize_pattern(token);
        if !is_valid_pattern(&normalized) {
            return Err(Error::InvalidPattern(normalized));
        }
        out.insert(normalized);
    }
    Ok(out)
}

/// Parses every string in `patterns`, unioning the results.
pub fn parse_pattern_list(patterns: &[String]) -> Result<BTreeSet<String>, Error> {
    let mut out = BTreeSet::new();
    for p in patterns {
        out.extend(parse_patterns(p)?);
    }
    Ok(out)
}

fn normalize_pattern(s: &str) -> String {
    s.replace('\\', "/")
}

fn is_valid_pattern(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_./+*@!-".contains(c))
}

/// Merges caller-supplied patterns into the default exclude set, removing any
/// pattern that also appears in `include` from `exclude`.
pub fn merge_patterns(
    default_exclude: &BTreeSet<String>,
    extra_exclude: &BTreeSet<String>,
    include: &BTreeSet<String>,
) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut exclude: BTreeSet<String> = default_exclude.union(extra_exclude).cloned().collect();
    for pat in include {
        exclude.remove(pat);
    }
    (include.clone(), exclude)
}

/// Recursively loads `filename` (e.g. `.gitignore`) under `root`, re-anchoring
/// each pattern to the file's directory relative to `root`.
pub async fn load_ignore_file(root: &Path, filename: &str) -> Result<BTreeSet<String>, Error> {
    let mut patterns = BTreeSet::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut rd = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(_) => continue,
        };
        let mut candidate = None;
        let mut subdirs = Vec::new();
        while let Ok(Some(entry)) = rd.next_entry().await {
            let Ok(ft) = entry.file_type().await else {
                continue;
            };
            if ft.is_dir() {
                subdirs.push(entry.path());
            } else if entry.file_name().to_string_lossy() == filename {
                candidate = Some(entry.path());
            }
        }
        stack.extend(subdirs);

        let Some(path) = candidate else { continue };
        let Ok(text) = tokio::fs::read_to_string(&path).await else {
            continue;
        };
        let rel_dir = dir.strip_prefix(root).unwrap_or(Path::new(""));

        for line in text.lines() {
            let stripped = line.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }
            let (negated, body) = match stripped.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, stripped),
            };
            let body = body.strip_prefix('/').unwrap_or(body);
            let pattern_body = if rel_dir.as_os_str().is_empty() {
                body.to_string()
            } else {
                format!("{}/{}", rel_dir.display(), body)
            };
            let pattern_body = pattern_body.replace('\\', "/");
            patterns.insert(if negated {
                format!("!{pattern_body}")
            } else {
                pattern_body
            });
        }
    }

    Ok(patterns)
}

/// A compiled include/exclude pattern set, ready to match relative paths.
pub struct CompiledPatterns {
    include_raw: Vec<String>,
    include_set: Option<GlobSet>,
    exclude_set: GlobSet,
    descendant_memo: Mutex<HashMap<(usize, usize), bool>>,
}

impl CompiledPatterns {
    pub fn compile(include: &BTreeSet<String>, exclude: &BTreeSet<String>) -> Result<Self, Error> {
        let include_raw: Vec<String> = include.iter().cloned().collect();
        let include_set = if include_raw.is_empty() {
            None
        } else {
            let mut b = GlobSetBuilder::new();
            for p in &include_raw {
                b.add(Glob::new(p).map_err(|e| Error::InvalidPattern(format!("{p}: {e}")))?);
            }
            Some(b.build().map_err(|e| Error::InvalidPattern(e.to_string()))?)
        };

        let mut eb = GlobSetBuilder::new();
        for p in exclude {
            eb.add(Glob::new(p).map_err(|e| Error::InvalidPattern(format!("{p}: {e}")))?);
        }
        let exclude_set = eb.build().map_err(|e| Error::InvalidPattern(e.to_string()))?;

        Ok(Self {
            include_raw,
            include_set,
            exclude_set,
            descendant_memo: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_excluded(&self, rel_path: &Path) -> bool {
        self.exclude_set.is_match(rel_path)
    }

    /// `true` iff `rel_path` matches an include pattern (or there is no include
    /// restriction at all).
    pub fn file_included(&self, rel_path: &Path) -> bool {
        self.include_set
            .as_ref()
            .is_none_or(|set| set.is_match(rel_path))
    }

    /// `true` iff `rel_dir` could itself, or some descendant of it, match an
    /// include pattern. Always `true` when there is no include restriction.
    pub fn dir_could_contain_match(&self, rel_dir: &Path) -> bool {
        let Some(_) = &self.include_set else {
            return true;
        };
        let path_segs: Vec<&str> = rel_dir
            .iter()
            .map(|c| c.to_str().unwrap_or(""))
            .filter(|s| !s.is_empty())
            .collect();

        self.include_raw.iter().enumerate().any(|(idx, pattern)| {
            let pattern = pattern.strip_prefix('!').unwrap_or(pattern);
            if !pattern.contains('/') {
                // Basename-only patterns can match at any depth.
                return true;
            }
            let pattern_segs: Vec<&str> = pattern.split('/').collect();
            self.could_reach(idx, &pattern_segs, &path_segs)
        })
    }

    fn could_reach(&self, pattern_idx: usize, pattern_segs: &[&str], path_segs: &[&str]) -> bool {
        self.could_reach_inner(pattern_idx, pattern_segs, 0, path_segs, 0)
    }

    /// Recursive `**`-aware prefix match: does extending `path_segs[path_i..]`
    /// remain compatible with eventually matching `pattern_segs` in full?
    /// Memoized on `(pattern-index, directory-depth)` to keep repeated `**`
    /// branches from blowing up exponentially.
    fn could_reach_inner(
        &self,
        pattern_idx: usize,
        pattern_segs: &[&str],
        pat_i: usize,
        path_segs: &[&str],
        path_i: usize,
    ) -> bool {
        let memo_key = (pattern_idx * 4096 + pat_i, path_i);
        if let Some(&hit) = self.descendant_memo.lock().unwrap().get(&memo_key) {
            return hit;
        }

        let result = if path_i >= path_segs.len() {
            // The directory's path is exhausted; any remaining pattern segments
            // could still be satisfied by descendants inside this directory.
            true
        } else if pat_i >= pattern_segs.len() {
            // Pattern exhausted but path still has segments: no match possible
            // (a directory cannot be an ancestor of a shorter pattern).
            false
        } else if pattern_segs[pat_i] == "**" {
            self.could_reach_inner(pattern_idx, pattern_segs, pat_i + 1, path_segs, path_i)
                || self.could_reach_inner(pattern_idx, pattern_segs, pat_i, path_segs, path_i + 1)
        } else {
            segment_matches(pattern_segs[pat_i], path_segs[path_i])
                && self.could_reach_inner(pattern_idx, pattern_segs, pat_i + 1, path_segs, path_i + 1)
        };

        self.descendant_memo.lock().unwrap().insert(memo_key, result);
        result
    }
}

fn segment_matches(pattern_seg: &str, path_seg: &str) -> bool {
    Glob::new(pattern_seg)
        .map(|g| g.compile_matcher().is_match(path_seg))
        .unwrap_or(false)
}

struct CacheKey(u64);

fn hash_pattern_sets(include: &BTreeSet<String>, exclude: &BTreeSet<String>) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for p in include {
        p.hash(&mut hasher);
    }
    0xA5u8.hash(&mut hasher);
    for p in exclude {
        p.hash(&mut hasher);
    }
    hasher.finish()
}

/// Process-wide, bounded memoization of compiled pattern sets. Bounded
/// rather than unbounded so a long-running server process can't grow this
/// cache without limit across many distinct pattern sets.
static COMPILE_CACHE: Lazy<Mutex<lru::LruCache<u64, Arc<CompiledPatterns>>>> = Lazy::new(|| {
    Mutex::new(lru::LruCache::new(std::num::NonZeroUsize::new(256).unwrap()))
});

/// Compiles `(include, exclude)`, reusing a cached compilation when the exact
/// pattern tuple has been seen before. Thread-safe; bounded to 256 entries.
pub fn compile_cached(
    include: &BTreeSet<String>,
    exclude: &BTreeSet<String>,
) -> Result<Arc<CompiledPatterns>, Error> {
    let CacheKey(key) = CacheKey(hash_pattern_sets(include, exclude));
    if let Some(hit) = COMPILE_CACHE.lock().unwrap().get(&key) {
        return Ok(Arc::clone(hit));
    }
    let compiled = Arc::new(CompiledPatterns::compile(include, exclude)?);
    COMPILE_CACHE.lock().unwrap().put(key, Arc::clone(&compiled));
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_patterns_splits_on_comma_and_whitespace() {
        let got = parse_patterns("src/*, tests *.md").unwrap();
        assert_eq!(
            got,
            BTreeSet::from([
                "src/*".to_string(),
                "tests".to_string(),
                "*.md".to_string()
            ])
        );
    }

    #[test]
    fn parse_patterns_normalizes_backslashes() {
        let got = parse_patterns(r"src\foo.rs").unwrap();
        assert!(got.contains("src/foo.rs"));
    }

    #[test]
    fn parse_patterns_rejects_bad_chars() {
        assert!(parse_patterns("foo;bar").is_err());
    }

    #[test]
    fn merge_removes_include_overlap_from_exclude() {
        let default_exclude = BTreeSet::from(["*.log".to_string()]);
        let extra_exclude = BTreeSet::from(["*.py".to_string()]);
        let include = BTreeSet::from(["*.py".to_string()]);
        let (inc, exc) = merge_patterns(&default_exclude, &extra_exclude, &include);
        assert!(inc.contains("*.py"));
        assert!(!exc.contains("*.py"));
        assert!(exc.contains("*.log"));
    }

    #[test]
    fn dir_could_contain_match_ancestor_keeping() {
        let include = BTreeSet::from(["src/**/*.py".to_string()]);
        let exclude = BTreeSet::new();
        let compiled = CompiledPatterns::compile(&include, &exclude).unwrap();
        assert!(compiled.dir_could_contain_match(Path::new("src")));
        assert!(compiled.dir_could_contain_match(Path::new("src/nested")));
        assert!(!compiled.dir_could_contain_match(Path::new("docs")));
    }

    #[test]
    fn dir_could_contain_match_basename_only_pattern_matches_any_depth() {
        let include = BTreeSet::from(["*.py".to_string()]);
        let exclude = BTreeSet::new();
        let compiled = CompiledPatterns::compile(&include, &exclude).unwrap();
        assert!(compiled.dir_could_contain_match(Path::new("anything/deeply/nested")));
    }

    #[test]
    fn file_included_respects_include_set() {
        let include = BTreeSet::from(["*.py".to_string()]);
        let exclude = BTreeSet::new();
        let compiled = CompiledPatterns::compile(&include, &exclude).unwrap();
        assert!(compiled.file_included(Path::new("a.py")));
        assert!(!compiled.file_included(Path::new("a.rs")));
    }

    #[test]
    fn no_include_set_keeps_everything() {
        let include = BTreeSet::new();
        let exclude = BTreeSet::new();
        let compiled = CompiledPatterns::compile(&include, &exclude).unwrap();
        assert!(compiled.file_included(Path::new("whatever.bin")));
        assert!(compiled.dir_could_contain_match(Path::new("whatever")));
    }

    #[test]
    fn compile_cached_reuses_instance_for_same_tuple() {
        let include = BTreeSet::from(["*.py".to_string()]);
        let exclude = BTreeSet::from(["*.log".to_string()]);
        let a = compile_cached(&include, &exclude).unwrap();
        let b = compile_cached(&include, &exclude).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
