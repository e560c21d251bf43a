pub mod transaction;
pub mod value;

pub use transaction::Transaction;
pub use value::Value;
