pub mod config;
pub mod error;
pub mod logging;
pub mod payload;
pub mod server;
pub mod upstream;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use logging::SharedLogger;
pub use server::{build_router, AppState};
