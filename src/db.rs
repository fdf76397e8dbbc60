pub mod error;
pub mod generation_repository;
pub mod models;
pub mod schema;
pub mod store;

pub use error::DbError;
pub use generation_repository::GenerationRepository;
pub use models::*;
pub use schema::SchemaMapping;
pub use store::{DayWriter, GenerationStore};
