pub(crate) mod check;
pub(crate) mod diff;
pub(crate) mod watch;

pub use check::run_check;
pub use diff::run_diff;
pub use watch::run_watch;
