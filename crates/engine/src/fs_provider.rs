use crate::error::{EngineError, Result};
use crate::providers::{FileContent, FileProvider};
use async_trait::async_trait;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

const MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1 MB

/// Directories never worth tracking, on top of gitignore rules.
const IGNORED_SCOPES: &[&str] = &[
    ".git",
    ".hg",
    ".idea",
    ".vscode",
    ".cache",
    ".impact",
    "node_modules",
    "target",
    "build",
    "dist",
    "coverage",
    "vendor",
    "third_party",
    "__pycache__",
];

/// Code, docs, and config the graph tracks.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Code
    "rs", "py", "js", "mjs", "cjs", "ts", "tsx", "jsx", "go", "java", "c", "h", "cpp", "hpp",
    "rb", "swift", "sh", // Docs
    "md", "mdx", "rst", "adoc", "txt", // Config / data
    "json", "toml", "yaml", "yml", "ini", "cfg",
];

/// Gitignore-aware filesystem file provider, the default collaborator for
/// local projects.
pub struct FsFileProvider {
    root: PathBuf,
}

impl FsFileProvider {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn scan(root: &Path) -> Vec<String> {
        let mut files = Vec::new();

        let scope_root = root.to_path_buf();
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true);
        builder.filter_entry(move |entry| !Self::is_ignored_scope(entry.path(), &scope_root));

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > MAX_FILE_SIZE_BYTES {
                            log::debug!(
                                "Skipping large file {} ({} bytes)",
                                path.display(),
                                meta.len()
                            );
                            continue;
                        }
                    }

                    if !Self::is_supported_file(path) {
                        continue;
                    }

                    if let Ok(relative) = path.strip_prefix(root) {
                        files.push(relative.to_string_lossy().replace('\\', "/"));
                    }
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort();
        log::info!("Found {} tracked files", files.len());
        files
    }

    fn is_supported_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                SUPPORTED_EXTENSIONS.iter().any(|candidate| candidate == &ext)
            })
            .unwrap_or(false)
    }

    fn is_ignored_scope(path: &Path, root: &Path) -> bool {
        if let Ok(relative) = path.strip_prefix(root) {
            for component in relative.components() {
                if let std::path::Component::Normal(name) = component {
                    let lowered = name.to_string_lossy().to_lowercase();
                    if IGNORED_SCOPES.iter().any(|ignored| ignored == &lowered) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[async_trait]
impl FileProvider for FsFileProvider {
    async fn list_files(&self) -> Result<Vec<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .map_err(|e| EngineError::Provider(format!("file scan failed: {e}")))
    }

    async fn read_file(&self, path: &str) -> Result<Option<FileContent>> {
        let absolute = self.root.join(path);

        let meta = match tokio::fs::metadata(&absolute).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let modified_ms = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        let content = tokio::fs::read_to_string(&absolute).await?;
        Ok(Some(FileContent {
            content,
            modified_ms,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn lists_supported_files_relative_to_root() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(temp.path().join("README.md"), "# readme").unwrap();
        fs::write(temp.path().join("binary.bin"), [0u8; 8]).unwrap();

        let provider = FsFileProvider::new(temp.path());
        let files = provider.list_files().await.unwrap();

        assert_eq!(files, vec!["README.md", "src/main.rs"]);
    }

    #[tokio::test]
    async fn skips_ignored_scopes() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("node_modules/pkg")).unwrap();
        fs::write(temp.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::create_dir_all(temp.path().join(".impact")).unwrap();
        fs::write(temp.path().join(".impact/graph.json"), "{}").unwrap();
        fs::write(temp.path().join("app.js"), "x").unwrap();

        let provider = FsFileProvider::new(temp.path());
        let files = provider.list_files().await.unwrap();

        assert_eq!(files, vec!["app.js"]);
    }

    #[tokio::test]
    async fn read_reports_content_and_mtime() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("a.ts"), "const x = 1;").unwrap();

        let provider = FsFileProvider::new(temp.path());
        let file = provider.read_file("a.ts").await.unwrap().unwrap();

        assert_eq!(file.content, "const x = 1;");
        assert!(file.modified_ms > 0);
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let temp = tempdir().unwrap();
        let provider = FsFileProvider::new(temp.path());
        assert!(provider.read_file("ghost.ts").await.unwrap().is_none());
    }
}
