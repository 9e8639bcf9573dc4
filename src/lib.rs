pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod secrets;
pub mod server;
pub mod translate;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use logging::SharedLogger;
pub use secrets::CredentialCache;
pub use server::{build_router, AppState};
pub use translate::streaming::Reframer;
