pub mod export;
pub mod types;

pub use export::{export_report, render_report};
pub use types::{CategoryRow, ExportFormat, Report};
