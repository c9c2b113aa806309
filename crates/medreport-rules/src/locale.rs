//! Rule-file lookup by language.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::RuleParseError;
use crate::ruleset::RuleSet;

pub const DEFAULT_LANGUAGE: &str = "en_US";
const LOCALE_ENV_VAR: &str = "MEDREPORT_LOCALE_DIR";

/// Directory holding `<language>.json` rule files.
///
/// Resolution order:
/// 1. `MEDREPORT_LOCALE_DIR` environment variable
/// 2. `locale/` in the working directory, when it exists
/// 3. `locale/` at the workspace root the crate was built from
pub fn default_locale_dir() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_default();
    locale_dir_from(std::env::var_os(LOCALE_ENV_VAR), &cwd)
}

fn locale_dir_from(env: Option<OsString>, cwd: &Path) -> PathBuf {
    if let Some(dir) = env {
        return PathBuf::from(dir);
    }
    let local = cwd.join("locale");
    if local.is_dir() {
        return local;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../locale")
}

/// Path of the rule file for `language`, falling back to [`DEFAULT_LANGUAGE`].
pub fn resolve_rule_file(dir: &Path, language: &str) -> Result<PathBuf, RuleParseError> {
    let requested = dir.join(format!("{language}.json"));
    if requested.is_file() {
        return Ok(requested);
    }
    let fallback = dir.join(format!("{DEFAULT_LANGUAGE}.json"));
    if fallback.is_file() {
        warn!(
            language,
            fallback = DEFAULT_LANGUAGE,
            "no rule file for language, using default"
        );
        return Ok(fallback);
    }
    Err(RuleParseError::MissingLanguage {
        dir: dir.to_path_buf(),
        language: language.to_string(),
    })
}

pub fn load_language(dir: &Path, language: &str) -> Result<RuleSet, RuleParseError> {
    RuleSet::load(&resolve_rule_file(dir, language)?)
}

/// Languages with a rule file in `dir`, sorted.
pub fn available_languages(dir: &Path) -> Result<Vec<String>, RuleParseError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RuleParseError::io(dir, e))?;
    let mut languages = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| RuleParseError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "json")
            && let Some(stem) = path.file_stem()
        {
            languages.push(stem.to_string_lossy().into_owned());
        }
    }
    languages.sort();
    Ok(languages)
}
