pub mod catalog;
pub mod executor;
pub mod memory;
pub mod table;

pub use catalog::Catalog;
pub use executor::{ExecutionContext, Executor, ExecutorPipeline};
pub use memory::MemoryDatabase;
pub use table::{Table, TableSchema};
