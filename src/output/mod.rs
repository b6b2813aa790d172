pub mod console;
pub mod report;
pub mod summary;

pub use console::ConsoleProgress;
pub use report::write_run_report;
pub use summary::build_summary;
