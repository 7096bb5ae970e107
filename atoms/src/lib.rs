//! Domain atoms for the day planner API: the task record, its validation,
//! the error taxonomy, and the `TaskStore` seam every persistence call goes
//! through. Atoms take a store handle as an argument and never read process
//! state.

pub mod error;
pub mod respond;
pub mod store;
pub mod tasks;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use error::{ApiError, StoreError};
pub use store::{TaskQuery, TaskStore};
