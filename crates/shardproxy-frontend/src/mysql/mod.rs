//! MySQL front end with streaming result sets
//!
//! Runs client commands against the backend and streams result rows back
//! under client backpressure, so result size never bounds memory.
//!
//! ## Module Structure
//!
//! - `config` - Front end configuration (properties plus environment overrides)
//! - `protocol` - Wire packets, payload reader and constants
//! - `command` - Command factory and command objects
//! - `backpressure` - Row streaming loop
//! - `errors` - Error frame mapping
//! - `executor` - One command turn, start to finish
//! - `connection` - Per-connection frame loop
//!
//! ## Turn Lifecycle
//!
//! 1. Frame arrives → connection loop hands it to a fresh `CommandExecutor`
//! 2. Executor waits for any pending backend release, then builds the command
//! 3. Command executes → headers written, rows streamed with backpressure
//! 4. Any failure → one error frame
//! 5. Flush, release the backend connection, next frame

pub mod backpressure;
pub mod command;
pub mod config;
pub mod connection;
pub mod errors;
pub mod executor;
pub mod protocol;

pub use backpressure::{RowStreamer, StreamingStats};
pub use config::FrontendConfig;
pub use connection::{serve_connection, FrontendConnection};
pub use executor::{CommandExecutor, TurnOutcome};
