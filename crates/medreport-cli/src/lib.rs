//! Library parts of the `medreport` command.

pub mod logging;
pub mod output;
