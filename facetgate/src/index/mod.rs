mod loader;
mod types;

pub use loader::IndexSpecLoader;
pub use types::{FieldKind, FixedValue, IndexField, IndexSpec, LogicalSpec, NestedSpec};
