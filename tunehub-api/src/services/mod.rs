//! Upload and analysis pipeline services

pub mod artwork;
pub mod feature_analyzer;
pub mod metadata_extractor;
pub mod upload_intake;
pub mod worker_pool;

pub use feature_analyzer::{AnalysisOutcome, AnalysisService};
pub use metadata_extractor::{ExtractedMetadata, MetadataExtractor};
pub use upload_intake::{IntakeError, UploadIntake, UploadRequest, UploadedFile};
pub use worker_pool::{JobOutcome, WorkerPool};
