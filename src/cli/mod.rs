//! Command implementations for the `wallapop-adjust` binary
//!
//! Each subcommand lives in its own module; the binary only parses arguments,
//! loads configuration and dispatches here.

pub mod adjust;
pub mod configure;
pub mod logging;
pub mod login;
pub mod session;

pub use adjust::{RunSummary, run_adjust};
pub use configure::run_configure;
pub use logging::init_logging;
pub use login::run_login;
pub use session::{run_reset, run_status};

use crate::{Error, FailureStage};
use std::io::{BufRead, Write};

/// Operator-facing description of a failed command
pub fn failure_report(err: &anyhow::Error) -> String {
    let stage = err
        .downcast_ref::<Error>()
        .map(Error::stage)
        .unwrap_or(FailureStage::Other);
    format!("Error: {:#}\nFailed during {}: {}", err, stage, stage.hint())
}

/// Print `question` and read one trimmed line; `None` at end of input
pub(crate) fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> std::io::Result<Option<String>> {
    write!(output, "{}", question)?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
