pub mod block;
pub mod condition;
pub mod error;
pub mod locale;
pub mod ruleset;

pub use block::{Block, Payload, Variant};
pub use condition::{Condition, existence_holds};
pub use error::{EvalError, RuleParseError};
pub use locale::{
    DEFAULT_LANGUAGE, available_languages, default_locale_dir, load_language, resolve_rule_file,
};
pub use ruleset::{LabelTable, RuleSet, Settings};
