pub mod config;
pub mod db;
pub mod etherscan;
pub mod observability;
pub mod types;
pub mod zapper;
