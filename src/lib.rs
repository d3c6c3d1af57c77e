pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod emitter;
pub mod engine;
pub mod paginator;
pub mod scheduler;
pub mod source;
pub mod types;

pub use config::{EngineConfig, LoadingFlagPolicy};
pub use coordinator::{FetchCoordinator, RefreshOptions};
pub use debounce::FilterDebouncer;
pub use emitter::MetricEmitter;
pub use engine::UsageEngine;
pub use paginator::{LogDirection, LogPageState, LogPaginator};
pub use scheduler::AutoRefreshScheduler;
pub use source::{LogQuery, RemoteSource, SourceError};
pub use types::*;
