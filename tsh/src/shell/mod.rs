use crate::config::ShellConfig;
use crate::process::{
    ChildStatus, ForegroundSource, JobState, JobTable, Notification, SignalChannel,
    reap_children, signal_job, wait_for_foreground,
};
use nix::sys::signal::Signal;
use nix::unistd::{Pid, getpgrp, getpid};
use tracing::debug;
use tsh_types::{Context, Errno, ExitStatus, TshError, TshResult};

mod eval;
mod job;

pub struct Shell {
    pub pid: Pid,
    pub pgid: Pid,
    pub exited: Option<ExitStatus>,
    pub config: ShellConfig,
    pub(crate) jobs: JobTable,
    notifier: Option<SignalChannel>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("pid", &self.pid)
            .field("pgid", &self.pgid)
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        let pid = getpid();
        let pgid = getpgrp();
        debug!("shell pid:{} pgid:{} config:{:?}", pid, pgid, config);
        Shell {
            pid,
            pgid,
            exited: None,
            config,
            jobs: JobTable::new(),
            notifier: None,
        }
    }

    pub fn set_signals(&mut self) -> TshResult<()> {
        self.notifier = Some(SignalChannel::install()?);
        Ok(())
    }

    pub fn create_context(&self) -> Context {
        Context::new(self.pid, self.pgid, self.config.verbose)
    }

    pub fn exit(&mut self, code: i32) {
        debug!("shell exiting with {}", code);
        self.exited = Some(ExitStatus::ExitedWith(code));
    }

    /// Consumes everything the signal handlers have queued since the last call.
    pub fn process_notifications(&mut self, ctx: &Context) -> TshResult<()> {
        let pending = match &self.notifier {
            Some(notifier) => notifier.drain()?,
            None => return Ok(()),
        };
        for notification in pending {
            self.handle_notification(ctx, notification)?;
        }
        Ok(())
    }

    pub(crate) fn handle_notification(
        &mut self,
        ctx: &Context,
        notification: Notification,
    ) -> TshResult<()> {
        debug!("notification {:?}", notification);
        match notification {
            Notification::ChildStateChanged => self.update_jobs(),
            Notification::Interrupt => {
                if let Some((pid, jid)) = self.foreground_job() {
                    signal_job(pid, Signal::SIGINT)?;
                    ctx.write_stdout(&format!(
                        "Job [{}] ({}) terminated by signal {}",
                        jid,
                        pid,
                        Signal::SIGINT as i32
                    ))?;
                }
                Ok(())
            }
            Notification::Suspend => {
                if let Some((pid, _)) = self.foreground_job() {
                    signal_job(pid, Signal::SIGTSTP)?;
                    self.jobs.set_state(pid, JobState::Stopped)?;
                }
                Ok(())
            }
            Notification::Quit => {
                self.exit(1);
                Ok(())
            }
        }
    }

    fn foreground_job(&self) -> Option<(Pid, usize)> {
        let pid = self.jobs.foreground_pid()?;
        self.jobs.find_by_pid(pid).map(|job| (job.pid, job.jid))
    }

    fn update_jobs(&mut self) -> TshResult<()> {
        for (pid, status) in reap_children()? {
            match status {
                ChildStatus::Stopped(_) => {
                    if self.jobs.set_state(pid, JobState::Stopped).is_err() {
                        debug!("stopped child {} is not a job", pid);
                    }
                }
                _ => {
                    if !self.jobs.remove(pid) {
                        debug!("reaped child {} was not a job", pid);
                    }
                }
            }
        }
        Ok(())
    }

    /// Blocks while `pid` holds the foreground.
    pub fn wait_foreground(&mut self, ctx: &Context, pid: Pid) -> TshResult<()> {
        wait_for_foreground(&mut ForegroundWait { shell: self, ctx }, pid)
    }
}

struct ForegroundWait<'a> {
    shell: &'a mut Shell,
    ctx: &'a Context,
}

impl ForegroundSource for ForegroundWait<'_> {
    fn process_notifications(&mut self) -> TshResult<()> {
        self.shell.process_notifications(self.ctx)
    }

    fn foreground_pid(&self) -> Option<Pid> {
        self.shell.jobs.foreground_pid()
    }

    fn exiting(&self) -> bool {
        self.shell.exited.is_some()
    }

    fn wait_notification(&self) -> TshResult<()> {
        match &self.shell.notifier {
            Some(notifier) => notifier.wait(),
            // nothing could ever wake us
            None => Err(TshError::system("poll")(Errno::EBADF)),
        }
    }
}
