//! Shell completions command handler

use crate::cli::{Cli, CompletionsArgs};
use crate::error::Result;
use clap::CommandFactory;
use std::io;

/// Print a completion script for the requested shell
pub fn handle_completions(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(args.shell.to_clap_shell(), &mut cmd, name, &mut io::stdout());
    Ok(())
}
