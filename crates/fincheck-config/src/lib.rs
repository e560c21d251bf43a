pub mod global;
pub mod loader;

pub use global::{FincheckConfig, RulesConfig};
pub use loader::ConfigLoader;
