//! Configuration system for droidsign

pub mod defaults;
pub mod discovery;
mod loader;
mod store;
mod types;
pub mod validation;

pub use defaults::*;
pub use loader::*;
pub use store::*;
pub use types::*;
pub use validation::*;
