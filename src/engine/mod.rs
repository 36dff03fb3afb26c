pub mod client;
pub mod indexer;
pub mod search;
