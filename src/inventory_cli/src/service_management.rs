use common::logger;

use crate::Cli;

/// Installs logging for the whole process before any command runs.
pub fn start(cli: &Cli) -> anyhow::Result<()> {
    logger::log(
        cli.debug.into(),
        cli.log_mode.unwrap_or_default().into(),
        cli.log_file.as_ref(),
    )
}
