pub mod models;
mod queries;
pub mod sqlite;
pub mod store;

pub use models::MediaRecord;
pub use sqlite::Database;
pub use store::FingerprintStore;
