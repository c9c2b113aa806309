use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("malformed scope '{scope}': expected exactly one '.' between section and field")]
    Malformed { scope: String },
}
