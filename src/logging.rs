//! Logger setup for the binaries.

use flexi_logger::{opt_format, FlexiLoggerError, Logger, LoggerHandle};

/// Starts logging to stderr at the level given by `RUST_LOG`, or `info`.
///
/// Keep the returned handle alive for as long as logging is needed.
pub fn setup_logging() -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str("info")?.format(opt_format).start()
}
