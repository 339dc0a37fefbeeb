use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameStatus {
    Copied,
    AlreadyCorrect,
    AlreadyPresent,
    Planned,
    Rejected,
    Failed,
}

impl RenameStatus {
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Rejected | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameEntry {
    pub source: String,
    pub status: RenameStatus,
    pub destination: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRunReport {
    pub report_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub output_directory: String,
    pub level: String,
    pub dry_run: bool,
    pub processed_count: usize,
    pub success_count: usize,
    pub entries: Vec<RenameEntry>,
}
