//! Report assembly and rendering.

pub mod assembler;
pub mod generator;

pub use assembler::{build_report, ReportMode};
pub use generator::{generate_json_report, generate_markdown_report, write_report};
