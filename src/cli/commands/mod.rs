//! CLI command implementations.

mod ask;
mod chat;
mod clear;
mod config;
mod info;
mod ingest;
mod list;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use clear::run_clear;
pub use config::run_config;
pub use info::run_info;
pub use ingest::run_ingest;
pub use list::run_list;
pub use search::run_search;
