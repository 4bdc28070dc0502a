//! Persistent storage

mod db;

pub use db::Database;
