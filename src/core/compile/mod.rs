//! Table compilation: rule store loading, per-table compile, query assembly

pub mod query;
pub mod session;
pub mod summary;

pub use query::assemble_query;
pub use session::{resolve_path, TableCompiler, TableOutcome};
pub use summary::{CompileError, CompileSummary};
