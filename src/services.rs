pub mod collection_service;

pub use collection_service::{CollectionReport, CollectionService};
