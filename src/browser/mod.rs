//! Browser lifecycle: executable discovery, hardened launch configuration,
//! masking patches, and session management.

pub mod launch;
pub mod session;
pub mod stealth;

pub use launch::{find_chrome_executable, HARDENED_LAUNCH_ARGS};
pub use session::BrowserSession;
