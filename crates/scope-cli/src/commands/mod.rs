//! Command implementations for scope-cli

pub mod flags;
pub mod list;
pub mod show;

pub use flags::run_flags;
pub use list::{run_list, run_tree};
pub use show::{run_get, run_show};
