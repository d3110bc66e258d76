mod schema;
mod settings;
mod storage;

pub use schema::SchemaManager;
pub use settings::{Alarm, Database, Logger, Node, Settings};
pub use storage::Storage;
