use crate::shell::Shell;
use tracing::{debug, warn};
use tsh_builtin::ShellProxy;
use tsh_types::{Context, TshError, TshResult};

impl ShellProxy for Shell {
    fn exit_shell(&mut self, code: i32) {
        self.exit(code);
    }

    fn dispatch(&mut self, ctx: &Context, cmd: &str, argv: Vec<String>) -> TshResult<()> {
        debug!("dispatch {} {:?}", cmd, argv);
        match cmd {
            "jobs" => self.list_jobs(ctx),
            "bg" => {
                let target = argv.get(1).ok_or_else(|| TshError::Usage(cmd.to_string()))?;
                self.resume_background(ctx, target)
            }
            "fg" => {
                let target = argv.get(1).ok_or_else(|| TshError::Usage(cmd.to_string()))?;
                self.resume_foreground(ctx, target)
            }
            _ => {
                warn!("no dispatch for builtin {}", cmd);
                Ok(())
            }
        }
    }
}
