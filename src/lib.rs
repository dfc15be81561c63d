//! Head-to-head analysis for football teams backed by per-team match tables.
//!
//! Tables live on disk as `<data_dir>/leagues/<league>/<team>.csv` and are refreshed from
//! Sofascore. The analysis side is pure: two tables in, comparative statistics and ranked
//! Asian-market suggestions out.

pub mod analysis;
pub mod config;
pub mod error;
pub mod http_client;
pub mod logging;
pub mod markets;
pub mod ranking;
pub mod refresh;
pub mod repository;
pub mod slug;
pub mod sofascore;
pub mod table;
pub mod team_stats;

pub use error::{H2hError, Result};
