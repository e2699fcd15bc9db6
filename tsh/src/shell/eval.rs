use super::Shell;
use crate::parser::{parse_line, split_background};
use crate::process::{JobState, Pipeline, fork_job};
use tracing::debug;
use tsh_types::{Context, TshResult};

impl Shell {
    /// Runs one command line: a builtin in place, anything else as a new job.
    pub fn eval_line(&mut self, ctx: &Context, line: &str) -> TshResult<()> {
        let argv = parse_line(line)?;
        let Some(name) = argv.first() else {
            return Ok(());
        };

        if let Some(cmd_fn) = tsh_builtin::get_command(name) {
            debug!("builtin {:?}", argv);
            let status = cmd_fn(ctx, argv, self);
            debug!("builtin status {:?}", status);
            return Ok(());
        }

        let (argv, background) = split_background(argv);
        if argv.is_empty() {
            return Ok(());
        }
        let pipeline = Pipeline::parse(&argv)?;
        let cmd = line.trim();
        let state = if background {
            JobState::Background
        } else {
            JobState::Foreground
        };

        let (pid, _jid) = fork_job(ctx, &mut self.jobs, &pipeline, state, cmd)?;
        if background {
            if let Some(job) = self.jobs.find_by_pid(pid) {
                ctx.write_stdout(&job.announcement())?;
            }
            Ok(())
        } else {
            self.wait_foreground(ctx, pid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use tsh_types::{ExitStatus, TshError};

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    #[test]
    fn blank_lines_are_ignored() {
        init();
        let mut shell = Shell::new(ShellConfig::default());
        let ctx = shell.create_context();
        shell.eval_line(&ctx, "\n").unwrap();
        shell.eval_line(&ctx, "   \t \n").unwrap();
        shell.eval_line(&ctx, "&\n").unwrap();
        assert!(shell.jobs.is_empty());
    }

    #[test]
    fn builtins_run_in_the_shell() {
        init();
        let mut shell = Shell::new(ShellConfig::default());
        let ctx = shell.create_context();
        shell.eval_line(&ctx, "jobs\n").unwrap();
        assert!(shell.exited.is_none());
        shell.eval_line(&ctx, "quit\n").unwrap();
        assert_eq!(shell.exited, Some(ExitStatus::ExitedWith(1)));
    }

    #[test]
    fn malformed_pipeline_forks_nothing() {
        init();
        let mut shell = Shell::new(ShellConfig::default());
        let ctx = shell.create_context();
        assert!(matches!(
            shell.eval_line(&ctx, "cat < \n"),
            Err(TshError::Syntax(_))
        ));
        assert!(matches!(
            shell.eval_line(&ctx, "ls | \n"),
            Err(TshError::Syntax(_))
        ));
        assert!(matches!(
            shell.eval_line(&ctx, "/bin/echo 'open\n"),
            Err(TshError::Syntax(_))
        ));
        assert!(shell.jobs.is_empty());
    }
}
