use super::Shell;
use crate::process::{JobState, signal_job};
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::debug;
use tsh_types::{Context, TshError, TshResult};

/// How `bg` and `fg` name a job: a bare pid or `%jid`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobSpec {
    Pid(Pid),
    Jid(usize),
}

impl JobSpec {
    pub fn parse(target: &str) -> TshResult<Self> {
        let no_such_job = || TshError::NoSuchJob(target.to_string());
        match target.strip_prefix('%') {
            Some(jid) => jid.parse().map(JobSpec::Jid).map_err(|_| no_such_job()),
            None => target
                .parse()
                .map(|pid| JobSpec::Pid(Pid::from_raw(pid)))
                .map_err(|_| no_such_job()),
        }
    }
}

impl Shell {
    fn resolve(&self, target: &str) -> TshResult<Pid> {
        let job = match JobSpec::parse(target)? {
            JobSpec::Pid(pid) => self.jobs.find_by_pid(pid),
            JobSpec::Jid(jid) => self.jobs.find_by_jid(jid),
        };
        job.map(|job| job.pid)
            .ok_or_else(|| TshError::NoSuchJob(target.to_string()))
    }

    pub fn list_jobs(&self, ctx: &Context) -> TshResult<()> {
        for job in self.jobs.list() {
            ctx.write_stdout(&job.to_string())?;
        }
        Ok(())
    }

    /// Resumes a job without waiting for it.
    pub fn resume_background(&mut self, ctx: &Context, target: &str) -> TshResult<()> {
        let pid = self.resolve(target)?;
        self.jobs.set_state(pid, JobState::Background)?;
        signal_job(pid, Signal::SIGCONT)?;
        if let Some(job) = self.jobs.find_by_pid(pid) {
            ctx.write_stdout(&job.announcement())?;
        }
        Ok(())
    }

    /// Resumes a job and waits while it holds the foreground.
    pub fn resume_foreground(&mut self, ctx: &Context, target: &str) -> TshResult<()> {
        let pid = self.resolve(target)?;
        self.jobs.set_state(pid, JobState::Foreground)?;
        signal_job(pid, Signal::SIGCONT)?;
        debug!("fg: resumed {}", pid);
        self.wait_foreground(ctx, pid)
    }
}
