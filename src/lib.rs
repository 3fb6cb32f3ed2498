pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod leaderboard;
pub mod messaging;
pub mod scheduler;
pub mod storage;
pub mod valorant;
