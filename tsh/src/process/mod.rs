#![allow(clippy::module_inception)]

pub mod fork;
pub mod job;
pub mod process;
pub mod redirect;
pub mod signal;
pub mod state;
pub mod wait;

pub use fork::fork_job;
pub use job::JobTable;
pub use process::Pipeline;
pub use signal::{Notification, SignalChannel};
pub(crate) use signal::signal_job;
pub use state::JobState;
pub use wait::{ChildStatus, ForegroundSource, reap_children, wait_for_foreground};
