pub mod catalog;
pub mod executor;
pub mod lower;
pub mod plan;
pub mod queries;

pub use catalog::{compile, CatalogError, QueryId};
pub use executor::{Dataset, ExecutorError, QueryExecutor};
pub use lower::{explain, lower};
pub use plan::{Pipeline, Stage, StageKind};
