mod collection;
mod id;

pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use id::{hex, Id};
