pub mod compiler;
pub mod error;
pub mod meta;
pub mod nodes;
pub mod runtime;
pub mod signature;

pub use error::BlueprintError;
