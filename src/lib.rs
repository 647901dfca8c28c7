pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod optimizer;
pub mod parallel;
pub mod race;
pub mod server;
