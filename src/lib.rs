pub mod browser;
pub mod challenge;
pub mod core;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod interact;
pub mod state_store;

// --- Primary exports ---
pub use self::core::config;
pub use self::core::types;
pub use self::core::types::*;
pub use browser::BrowserSession;
pub use engine::{SearchEngine, PROVIDER_DOMAINS};
pub use error::{Result, SearchError};
