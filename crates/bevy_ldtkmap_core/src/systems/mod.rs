//! Systems driving builds from loaded assets.

pub mod spawn;

pub use spawn::process_loaded_projects;
