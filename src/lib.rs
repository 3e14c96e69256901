// Library interface for json-sift
// This allows integration tests and external code to use the filter's modules

pub mod cache;
pub mod cli;
pub mod config;
pub mod decode;
pub mod identity;
pub mod logging;
pub mod pipeline;
pub mod run;

// Re-export commonly used types
pub use cache::IdentityCache;
pub use config::Config;
pub use decode::{ArrayDecoder, DecodeError};
pub use identity::identity;
