//! CLI command implementations.

mod ask;
mod config;
mod purge;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use purge::run_purge;
pub use serve::run_serve;
