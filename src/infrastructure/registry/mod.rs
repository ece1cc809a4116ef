//! Recording registry storage adapters

mod json_file;

pub use json_file::{default_registry_path, JsonFileRegistry};
