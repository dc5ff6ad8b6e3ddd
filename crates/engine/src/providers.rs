use crate::error::Result;
use async_trait::async_trait;
use impact_patterns::CommitRecord;

/// Content and modification time of one project file.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content: String,
    pub modified_ms: u64,
}

/// Collaborator supplying project-relative paths and file content.
#[async_trait]
pub trait FileProvider: Send + Sync {
    async fn list_files(&self) -> Result<Vec<String>>;

    /// `Ok(None)` when the file does not exist (the node is dropped);
    /// `Err` when it exists but cannot be read (the node keeps default
    /// signals).
    async fn read_file(&self, path: &str) -> Result<Option<FileContent>>;
}

/// Collaborator mapping a file path to a distance-to-goal in [0,1].
pub trait GoalDistanceProvider: Send + Sync {
    fn distance(&self, path: &str) -> f64;
}

/// Collaborator exposing recent commits, newest first.
#[async_trait]
pub trait VcsAdapter: Send + Sync {
    async fn recent_commits(&self, limit: usize) -> Result<Vec<CommitRecord>>;
}
