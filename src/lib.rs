pub mod cache;
pub mod cli;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod record;
pub mod refresh;
pub mod report;
pub mod store;
