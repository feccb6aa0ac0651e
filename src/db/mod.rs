//! Persistence for mapsurvey
//!
//! `SurveyStore` is the seam between the domain services and storage.
//! `MemoryStore` backs dev mode and tests; `MongoStore` backs production.

pub mod memory;
pub mod mongo;
pub mod mongo_store;
pub mod schemas;
mod store;

pub use memory::MemoryStore;
pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
pub use mongo_store::MongoStore;
pub use store::SurveyStore;
