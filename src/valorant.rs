pub mod client;
pub mod rank;
pub mod region;
