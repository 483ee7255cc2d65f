//! Copydesk engine: remote task API, progressive polling and local persistence.
mod api;
mod engine;
mod poller;
mod store;
mod types;

pub use api::{ApiSettings, HttpTaskApi, TaskApi};
pub use engine::EngineHandle;
pub use poller::{PollHandler, PollSettings, TaskPoller};
pub use store::{AtomicDir, FileKvStore, KvStore, MemoryKvStore, SessionStore, StoreError};
pub use types::{ApiError, EngineEvent, EngineStopped, FailureKind};
