pub mod meta_loader;

pub use meta_loader::{load_metadata, read_pointer};
