pub mod context;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod reload;
pub mod watcher;

pub use context::{RuleContext, CONTEXT_FIELDS};
pub use engine::PlausibilityEngine;
pub use error::{ConfigError, EvaluationError};
pub use loader::{LoadOptions, RuleLoader, RuleSet};
pub use model::{Issue, RuleDefinition, Severity};
pub use reload::SharedEngine;
pub use watcher::RuleWatcher;
