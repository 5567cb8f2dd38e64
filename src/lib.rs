pub mod config;
pub mod error;
pub mod kernel;
pub mod server;
pub mod services;

// Re-export the pieces a front end wires together
pub use config::EngineConfig;
pub use error::{PreconditionError, SyncError};
pub use kernel::reactor::{Editor, EditorConfig};
pub use services::api::{HttpTimelineApi, TimelineApi};
pub use services::driver::EditorDriver;
