pub mod communities;
pub mod database;
pub mod glossary;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reactions;
pub mod threads;
pub mod users;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
