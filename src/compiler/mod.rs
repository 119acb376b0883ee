pub mod context;
pub mod core;
pub mod hash_links;

pub use self::core::{CompileOptions, Compiler};
