pub mod fetcher;
pub mod lookup;
pub mod retry;
