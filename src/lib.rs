pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod mailbox;
pub mod state;
pub mod test;
pub mod time;
pub mod utils;
