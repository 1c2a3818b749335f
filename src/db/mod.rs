pub mod connection;
pub mod db_manager;
pub mod memory_store;
pub mod models;
pub mod queries;
pub mod schema;
pub mod store;

pub use db_manager::DbManager;
pub use memory_store::MemoryStore;
pub use store::Store;
