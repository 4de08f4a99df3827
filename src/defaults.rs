use std::collections::BTreeSet;

/// Per-file size cap, in bytes, used when a query does not override it.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Traversal caps, configurable per query.
pub const DEFAULT_MAX_DEPTH: usize = 20;
pub const DEFAULT_MAX_FILES: usize = 10_000;
pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 500 * 1024 * 1024;

/// Default deadline for a clone, in seconds.
pub const DEFAULT_CLONE_TIMEOUT_SECS: u64 = 60;

/// Cleanup worker scan cadence, in seconds.
pub const CLEANUP_SCAN_INTERVAL_SECS: u64 = 60;
/// Cleanup worker staleness threshold, in seconds: a scratch directory older
/// than this is considered abandoned.
pub const CLEANUP_STALE_AGE_SECS: u64 = 60 * 60;

pub const KNOWN_GIT_HOSTS: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "gitea.com",
    "codeberg.org",
    "gist.github.com",
];

/// Default exclude patterns, gitignore-wildmatch form. Ported from the full
/// default set rather than a trimmed subset, covering every ecosystem the
/// original tool recognizes (Python, JS, Java, C/C++, Swift, Ruby, Rust, Go,
/// .NET, VCS metadata, media, virtualenvs, editors, build output, Terraform).
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Python
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "__pycache__",
    ".pytest_cache",
    ".coverage",
    ".tox",
    ".nox",
    ".mypy_cache",
    ".ruff_cache",
    ".hypothesis",
    "poetry.lock",
    "Pipfile.lock",
    // JavaScript
    "node_modules",
    "bower_components",
    "package-lock.json",
    "yarn.lock",
    ".npm",
    ".yarn",
    ".pnpm-store",
    "bun.lock",
    "bun.lockb",
    // Java
    "*.class",
    "*.jar",
    "*.war",
    "*.ear",
    "*.nar",
    ".gradle/",
    "build/",
    ".settings/",
    ".classpath",
    "gradle-app.setting",
    "*.gradle",
    ".project",
    // C/C++
    "*.o",
    "*.obj",
    "*.dll",
    "*.dylib",
    "*.exe",
    "*.lib",
    "*.out",
    "*.a",
    "*.pdb",
    // Swift/Xcode
    ".build/",
    "*.xcodeproj/",
    "*.xcworkspace/",
    "*.pbxuser",
    "*.mode1v3",
    "*.mode2v3",
    "*.perspectivev3",
    "*.xcuserstate",
    "xcuserdata/",
    ".swiftpm/",
    // Ruby
    "*.gem",
    ".bundle/",
    "vendor/bundle",
    "Gemfile.lock",
    ".ruby-version",
    ".ruby-gemset",
    ".rvmrc",
    // Rust
    "Cargo.lock",
    "**/*.rs.bk",
    // Java / Rust
    "target/",
    // Go
    "pkg/",
    // .NET/C#
    "obj/",
    "*.suo",
    "*.user",
    "*.userosscache",
    "*.sln.docstates",
    "packages/",
    "*.nupkg",
    // Go / .NET / C#
    "bin/",
    // Version control
    ".git",
    ".svn",
    ".hg",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
    // Images and media
    "*.svg",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.pdf",
    "*.mov",
    "*.mp4",
    "*.mp3",
    "*.wav",
    // Virtual environments
    "venv",
    ".venv",
    "env",
    ".env",
    "virtualenv",
    // IDEs and editors
    ".idea",
    ".vscode",
    ".vs",
    "*.swo",
    "*.swn",
    ".settings",
    "*.sublime-*",
    // Temporary and cache files
    "*.log",
    "*.bak",
    "*.swp",
    "*.tmp",
    "*.temp",
    ".cache",
    ".sass-cache",
    ".eslintcache",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    // Build directories and artifacts
    "build",
    "dist",
    "target",
    "out",
    "*.egg-info",
    "*.egg",
    "*.whl",
    "*.so",
    // Documentation tooling
    "site-packages",
    ".docusaurus",
    ".next",
    ".nuxt",
    // Minified / generated
    "*.min.js",
    "*.min.css",
    "*.map",
    // Terraform
    ".terraform",
    "*.tfstate*",
    // Vendored dependencies
    "vendor/",
    // repodigest's own persisted output, when ingesting a repo that committed one
    "digest.txt",
];

/// Builds the owned default exclude set used to seed a fresh [`crate::types::IngestionQuery`].
pub fn default_ignore_set() -> BTreeSet<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::Glob;

    #[test]
    fn default_ignore_patterns_has_entries() {
        assert!(DEFAULT_IGNORE_PATTERNS.len() > 100);
    }

    #[test]
    fn all_patterns_are_valid_globs() {
        for pattern in DEFAULT_IGNORE_PATTERNS {
            Glob::new(pattern).unwrap_or_else(|e| panic!("invalid glob '{pattern}': {e}"));
        }
    }

    #[test]
    fn known_lock_files_present() {
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"Cargo.lock"));
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"package-lock.json"));
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"yarn.lock"));
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"poetry.lock"));
    }

    #[test]
    fn known_build_dirs_present() {
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"node_modules"));
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"target/"));
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"dist"));
        assert!(DEFAULT_IGNORE_PATTERNS.contains(&"__pycache__"));
    }

    #[test]
    fn known_hosts_nonempty() {
        assert!(KNOWN_GIT_HOSTS.contains(&"github.com"));
        assert!(KNOWN_GIT_HOSTS.contains(&"codeberg.org"));
    }

    #[test]
    fn default_ignore_set_matches_const_len() {
        assert_eq!(default_ignore_set().len(), DEFAULT_IGNORE_PATTERNS.len());
    }
}
