mod bson;
mod collection;

pub use bson::{question_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
