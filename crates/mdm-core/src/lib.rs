pub mod classifier;
pub mod client;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod query;
pub mod rules;
pub mod settings;
pub mod types;

pub use error::{MdmError, Result};
