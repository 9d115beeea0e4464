pub mod analysis;
pub mod cli;
pub mod cli_types;
pub mod config;
pub mod error;
pub mod gemini;
pub mod git;
pub mod logging;
pub mod pipeline;
pub mod scanner;
pub mod server;
pub mod services;
pub mod storage;

// Re-export commonly used types
pub use analysis::{AnalysisRequester, GenerationOutcome, TextGenerator, DEBUG_INSTRUCTION, FALLBACK_RESULT};
pub use config::{AcquirePolicy, Settings, StorageBackend};
pub use error::{CodefixError, Result};
pub use gemini::GeminiClient;
pub use git::{derive_repo_name, Git2Cloner, RemoteCloner, RepositoryAcquirer};
pub use pipeline::{Codefix, CodefixBuilder};
pub use scanner::{FileTreeScanner, ScanOptions};
pub use services::{FileAnalysis, IngestOutcome, IngestRequest, ProjectDetails, ProjectListing};
pub use storage::{MemoryProjectStore, ProjectRecord, ProjectStore, RepoStore, SqliteProjectStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
