//! Command dispatch: bridges CLI args -> core feed -> output formatting.

pub mod admin;
pub mod config_cmd;
pub mod incidents;
mod util;
pub mod whoami;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Incidents(args) => incidents::handle(session, args, global).await,
        Command::Whoami => whoami::handle(session, global).await,
        Command::Admin(args) => admin::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
