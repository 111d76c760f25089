pub mod catalog;
pub mod chunker;
#[cfg(feature = "cli")]
pub mod cli;
pub mod collector;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod fetchers;
pub mod io;
#[cfg(feature = "cli")]
pub mod logging;
pub mod models;
pub mod providers;
pub mod retry;
pub mod runner;
pub mod session;
pub mod utils;
