pub mod assembler;
pub mod join;
pub mod sections;
pub mod substitute;

pub use assembler::{
    BatchReport, GeneratedReport, RenderedSection, ReportGenerator, generate_batch,
    generate_batch_from,
};
pub use join::{join, join_into, replace_last};
pub use sections::{SubjectRecords, build_records, unknown_scopes};
pub use substitute::{ScopedValues, substitute, substitute_into};
