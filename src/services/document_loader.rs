//! Reading indexable documents from disk.

use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, DomainResult};

/// File extensions the loader accepts, lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["md", "markdown", "txt", "rst", "json", "yaml", "yml"];

/// A file read from disk, ready for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub title: String,
    pub content: String,
    pub source: String,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// First markdown heading, else the file stem.
pub fn extract_title(content: &str, path: &Path) -> String {
    content
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim())
        .filter(|title| !title.is_empty())
        .map_or_else(
            || {
                path.file_stem()
                    .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().to_string())
            },
            str::to_string,
        )
}

pub async fn load_file(path: &Path) -> DomainResult<LoadedDocument> {
    if !is_supported(path) {
        return Err(DomainError::ValidationFailed(format!(
            "unsupported file type: {} (expected one of: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DomainError::ExecutionFailed(format!("failed to read {}: {e}", path.display())))?;

    Ok(LoadedDocument {
        title: extract_title(&content, path),
        content,
        source: path.display().to_string(),
    })
}

/// Every supported file below `dir`, sorted by path. Hidden entries are skipped.
pub async fn collect_files(dir: &Path) -> DomainResult<Vec<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    let mut files = Vec::new();

    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("failed to read {}: {e}", current.display())))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DomainError::ExecutionFailed(e.to_string()))?
        {
            let path = entry.path();
            let hidden = path
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with('.'));
            if hidden {
                continue;
            }

            let file_type = entry
                .file_type()
                .await
                .map_err(|e| DomainError::ExecutionFailed(e.to_string()))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && is_supported(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("notes.md")));
        assert!(is_supported(Path::new("README.MD")));
        assert!(is_supported(Path::new("data.yml")));
        assert!(!is_supported(Path::new("image.png")));
        assert!(!is_supported(Path::new("Makefile")));
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title("intro\n## Design Notes\nbody", Path::new("a.md")), "Design Notes");
        assert_eq!(extract_title("no heading", Path::new("dir/meeting-2024.txt")), "meeting-2024");
        assert_eq!(extract_title("#\nempty heading", Path::new("x.md")), "x");
    }

    #[tokio::test]
    async fn test_load_file_and_collect() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "# Alpha\ntext").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "beta").unwrap();
        std::fs::write(dir.path().join("skip.bin"), "x").unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/c.md"), "hidden").unwrap();

        let files = collect_files(dir.path()).await.unwrap();
        assert_eq!(files.len(), 2);

        let doc = load_file(&files[0]).await.unwrap();
        assert_eq!(doc.title, "Alpha");
        assert!(doc.source.ends_with("a.md"));

        let err = load_file(&dir.path().join("skip.bin")).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
