//! Configuration schema, discovery, and validation.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, find_config_file, load_config},
    schema::BackchannelConfig,
};
