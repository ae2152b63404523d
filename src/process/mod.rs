/*!
 * Process Module
 * Process table and owned task references
 */

pub mod handle;
pub mod table;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use handle::{Task, TaskRef};
pub use table::ProcessTable;
pub use traits::ProcessRegistry;
pub use types::TaskState;
