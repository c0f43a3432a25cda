// Host capability implementations
// Storage, alarm and display backends that run inside the process

pub mod file_store;
pub mod log_host;
pub mod memory;
pub mod tokio_host;

pub use file_store::JsonFileStore;
pub use log_host::TracingNotificationHost;
pub use memory::MemoryStore;
pub use tokio_host::{TokioAlarmHost, spawn_dispatcher};
