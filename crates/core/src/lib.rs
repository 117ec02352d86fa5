pub mod adapter;
pub mod attachments;
pub mod board;
pub mod config;
pub mod dates;
pub mod dedup;
pub mod detail;
pub mod engine;
pub mod error;
pub mod model;
pub mod persist;
pub mod sanitize;
pub mod session;
pub mod store;

pub use adapter::SiteAdapter;
pub use attachments::AcquisitionEngine;
pub use board::{BoardAdapter, BoardSelectors};
pub use config::{HarvestConfig, HarvestConfigBuilder};
pub use dates::{normalize_date, should_stop, CutoffThreshold};
pub use dedup::DedupStore;
pub use engine::{HarvestEngine, RunSummary, StopReason};
pub use error::{HarvestError, Result};
pub use model::{
    Announcement, AttachmentOutcome, AttachmentRef, AttachmentStrategy, DetailContent, SavedAttachment,
};
pub use persist::PersistenceWriter;
pub use session::{BrowserlessSession, DownloadTrigger, DownloadedFile, RenderSession};
pub use store::{
    DetailUrlRecord, FailureLogger, FailureRecord, JsonlFailureLogger, JsonlUrlStore, TracingFailureLogger, UrlStats,
    UrlStore,
};
