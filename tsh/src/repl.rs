use crate::shell::Shell;
use anyhow::Result;
use std::io::BufRead;
use tracing::{debug, error};
use tsh_types::{Context, ExitStatus};

pub struct Repl<'a> {
    shell: &'a mut Shell,
}

impl<'a> Repl<'a> {
    pub fn new(shell: &'a mut Shell) -> Self {
        Repl { shell }
    }

    /// Reads and runs lines until end of input or until the shell decides to
    /// exit. Returns the exit status.
    pub fn run(&mut self, ctx: &Context) -> Result<i32> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut line = String::new();

        loop {
            if let Some(code) = self.step_notifications(ctx)? {
                return Ok(code);
            }

            if self.shell.config.emit_prompt {
                ctx.write_prompt(&self.shell.config.prompt)?;
            }

            line.clear();
            if input.read_line(&mut line)? == 0 {
                debug!("end of input");
                return Ok(0);
            }

            // keystrokes typed at the prompt and jobs that ended while reading
            if let Some(code) = self.step_notifications(ctx)? {
                return Ok(code);
            }

            if let Err(err) = self.shell.eval_line(ctx, &line) {
                ctx.write_stdout(&err.to_string())?;
                if err.is_fatal() {
                    error!("fatal: {}", err);
                    return Ok(1);
                }
            }

            if let Some(ExitStatus::ExitedWith(code)) = self.shell.exited {
                return Ok(code);
            }
        }
    }

    fn step_notifications(&mut self, ctx: &Context) -> Result<Option<i32>> {
        if let Err(err) = self.shell.process_notifications(ctx) {
            ctx.write_stdout(&err.to_string())?;
            if err.is_fatal() {
                error!("fatal: {}", err);
                return Ok(Some(1));
            }
        }
        Ok(match self.shell.exited {
            Some(ExitStatus::ExitedWith(code)) => Some(code),
            _ => None,
        })
    }
}
