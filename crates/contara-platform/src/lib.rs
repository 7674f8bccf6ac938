pub mod config;
pub mod db;
pub mod pg;

pub use config::ServiceConfig;
pub use db::connect_database;
pub use pg::PgInventoryStore;
