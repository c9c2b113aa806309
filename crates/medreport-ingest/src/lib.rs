pub mod error;
pub mod reader;
pub mod row;
pub mod schema;

pub use error::IngestError;
pub use reader::{parse_cell, read_rows, read_rows_from_reader, select_subject, subject_ids};
pub use row::SourceRow;
pub use schema::{FLAG_GROUPS, FieldKind, FlagGroup, field_kind, is_known_column};
