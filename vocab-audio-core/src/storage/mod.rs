pub mod kv_store;
pub mod metadata;
pub mod recordings;
pub mod zip_writer;
