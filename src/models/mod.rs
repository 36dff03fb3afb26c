pub mod search;
pub mod user;
