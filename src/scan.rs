//! Directory scanning and rotation target selection.

use crate::error::Result;
use glob::{MatchOptions, Pattern};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const WILDCARDS: [char; 4] = ['*', '?', '[', ']'];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Whether a name pattern needs scanning, as opposed to naming one fixed file.
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(WILDCARDS)
}

/// Lists regular files in `directory` whose name matches `pattern`,
/// paired with their creation time.
pub async fn matching_files(
    directory: &Path,
    pattern: &Pattern,
) -> Result<Vec<(SystemTime, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut matches = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if !pattern.matches_with(name, MATCH_OPTIONS) {
            continue;
        }

        let path = entry.path();
        // Follows symlinks, so a link to the live log counts as a file.
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if metadata.is_file() {
            matches.push((creation_time(&metadata), path));
        }
    }

    Ok(matches)
}

/// Picks the most recently created candidate; ties go to the largest path.
pub fn select_newest(candidates: Vec<(SystemTime, PathBuf)>) -> Option<PathBuf> {
    candidates.into_iter().max().map(|(_, path)| path)
}

/// Scans `directory` and returns the newest file matching `pattern`.
pub async fn newest_match(directory: &Path, pattern: &Pattern) -> Result<Option<PathBuf>> {
    Ok(select_newest(matching_files(directory, pattern).await?))
}

/// Birth time where the filesystem records it, modification time otherwise.
fn creation_time(metadata: &Metadata) -> SystemTime {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogDir;
    use std::time::Duration;

    #[test]
    fn test_has_wildcards() {
        assert!(has_wildcards("*chat.txt"));
        assert!(has_wildcards("server?.log"));
        assert!(has_wildcards("log[0-9].txt"));
        assert!(!has_wildcards("pzserver-console.log"));
        assert!(!has_wildcards(""));
    }

    #[test]
    fn test_select_newest_by_time() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let t1 = t0 + Duration::from_secs(3);
        let candidates = vec![
            (t1, PathBuf::from("/logs/server2_chat.txt")),
            (t0, PathBuf::from("/logs/server9_chat.txt")),
        ];

        assert_eq!(
            select_newest(candidates),
            Some(PathBuf::from("/logs/server2_chat.txt"))
        );
    }

    #[test]
    fn test_select_newest_tie_breaks_on_path() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let candidates = vec![
            (t, PathBuf::from("/logs/b.log")),
            (t, PathBuf::from("/logs/c.log")),
            (t, PathBuf::from("/logs/a.log")),
        ];

        assert_eq!(select_newest(candidates), Some(PathBuf::from("/logs/c.log")));
    }

    #[test]
    fn test_select_newest_empty() {
        assert_eq!(select_newest(Vec::new()), None);
    }

    #[tokio::test]
    async fn test_newest_match_picks_latest_file() {
        let dir = TempLogDir::new().unwrap();
        dir.create("server1_chat.txt", "old\n").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        dir.create("server2_chat.txt", "new\n").unwrap();
        dir.create("unrelated.log", "noise\n").unwrap();

        let pattern = Pattern::new("*chat.txt").unwrap();
        let newest = newest_match(dir.path(), &pattern).await.unwrap();

        assert_eq!(newest, Some(dir.file("server2_chat.txt")));
    }

    #[tokio::test]
    async fn test_matching_files_skips_directories_and_dotfiles() {
        let dir = TempLogDir::new().unwrap();
        dir.create("app.log", "").unwrap();
        dir.create(".hidden.log", "").unwrap();
        std::fs::create_dir(dir.file("archive.log")).unwrap();

        let pattern = Pattern::new("*.log").unwrap();
        let files = matching_files(dir.path(), &pattern).await.unwrap();
        let paths: Vec<PathBuf> = files.into_iter().map(|(_, path)| path).collect();

        assert_eq!(paths, vec![dir.file("app.log")]);
    }

    #[tokio::test]
    async fn test_newest_match_no_files() {
        let dir = TempLogDir::new().unwrap();
        let pattern = Pattern::new("*.log").unwrap();

        assert_eq!(newest_match(dir.path(), &pattern).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let pattern = Pattern::new("*.log").unwrap();
        let result = newest_match(Path::new("/nonexistent/log/dir"), &pattern).await;

        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
