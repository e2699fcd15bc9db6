use super::ShellProxy;
use tracing::debug;
use tsh_types::{Context, ExitStatus};

/// Built-in quit command implementation.
/// Outstanding jobs are left to the operating system.
pub fn command(_ctx: &Context, _argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    debug!("quit command called");
    proxy.exit_shell(1);
    ExitStatus::ExitedWith(1)
}
