pub mod clock;
pub mod enums;
pub mod task;
pub mod timer;
pub mod views;

pub use clock::{Clock, SystemClock};
pub use enums::{RunStatus, Severity};
pub use task::{TaskMap, TaskRecord};
pub use timer::{format_elapsed, TimerState};
pub use views::{task_rows, total_elapsed, TaskRow};
