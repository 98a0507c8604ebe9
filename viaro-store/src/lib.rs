pub mod app_config;
pub mod database;
pub mod postgres;

pub use app_config::Config;
pub use database::DbClient;
pub use postgres::PgStore;
