use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use tsh_types::{Context, ExitStatus, TshResult};

mod bg;
mod fg;
mod jobs;
mod quit;

/// What a builtin may ask of the shell that runs it.
pub trait ShellProxy {
    /// Marks the shell as exiting with `code`.
    fn exit_shell(&mut self, code: i32);

    /// Runs the job-control half of `cmd` against the shell's job table.
    fn dispatch(&mut self, ctx: &Context, cmd: &str, argv: Vec<String>) -> TshResult<()>;
}

pub type BuiltinCommand =
    fn(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus;

/// Builtins by exact, case-sensitive name.
pub static BUILTIN_COMMAND: Lazy<Mutex<HashMap<&str, BuiltinCommand>>> = Lazy::new(|| {
    let mut builtin = HashMap::new();

    builtin.insert("quit", quit::command as BuiltinCommand);

    builtin.insert("jobs", jobs::command as BuiltinCommand);
    builtin.insert("fg", fg::command as BuiltinCommand);
    builtin.insert("bg", bg::command as BuiltinCommand);

    Mutex::new(builtin)
});

pub fn get_command(name: &str) -> Option<BuiltinCommand> {
    if let Ok(builtin) = BUILTIN_COMMAND.lock() {
        builtin.get(name).copied()
    } else {
        None
    }
}

/// Reports the outcome of a dispatched command.
/// Fatal errors end the shell after being printed.
pub(crate) fn report(
    ctx: &Context,
    proxy: &mut dyn ShellProxy,
    result: TshResult<()>,
) -> ExitStatus {
    match result {
        Ok(_) => ExitStatus::ExitedWith(0),
        Err(err) => {
            ctx.write_stdout(&err.to_string()).ok();
            if err.is_fatal() {
                debug!("fatal error in builtin, exiting: {}", err);
                proxy.exit_shell(1);
            }
            ExitStatus::ExitedWith(1)
        }
    }
}
