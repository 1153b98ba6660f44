pub mod config;
pub mod files;
pub mod store;

pub use config::{forget_token, load_config, save_config, Config};
pub use files::{
    atomic_write, config_file, ensure_data_dir, get_data_dir, init_local_data_dir, log_file,
    read_file, remove_file,
};
pub use store::{BlobStore, FileBlobStore, TaskStore};
