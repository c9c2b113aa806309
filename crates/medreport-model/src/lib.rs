pub mod error;
pub mod issue;
pub mod record;
pub mod report_section;
pub mod value;

pub use error::ScopeError;
pub use issue::{IssueKind, RenderIssue};
pub use record::{Record, Scope, Section};
pub use report_section::ReportSection;
pub use value::{Value, format_numeric};
