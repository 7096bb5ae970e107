//! Daily scheduler block: the caller's day in priority order and the single
//! task that should be active right now.

pub mod http;
pub mod schedule;

pub use http::{current_task_handler, today_tasks_handler};
pub use schedule::{current_task, order_for_day, select_current, today_tasks};
