use nix::unistd::Pid;
use std::fmt;
use tracing::debug;
use tsh_types::{TshError, TshResult};

use super::state::JobState;

/// Max jobs at any point in time.
pub const MAX_JOBS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub pid: Pid,
    pub jid: usize,
    pub state: JobState,
    pub cmd: String,
}

impl Job {
    /// `[<jid>] (<pid>) <command_line>`
    pub fn announcement(&self) -> String {
        format!("[{}] ({}) {}", self.jid, self.pid, self.cmd)
    }
}

/// `[<jid>] (<pid>) <state> <command_line>`
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] ({}) {} {}", self.jid, self.pid, self.state, self.cmd)
    }
}

/// Fixed-capacity job list. Slots keep their position so listings come out in
/// insertion-slot order, and jids are handed out densely.
#[derive(Debug, Default)]
pub struct JobTable {
    slots: [Option<Job>; MAX_JOBS],
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smallest jid not held by a live job.
    fn free_jid(&self) -> Option<usize> {
        let mut taken = [false; MAX_JOBS + 1];
        for job in self.slots.iter().flatten() {
            taken[job.jid] = true;
        }
        (1..=MAX_JOBS).find(|jid| !taken[*jid])
    }

    pub fn insert(&mut self, pid: Pid, state: JobState, cmd: &str) -> TshResult<usize> {
        if state == JobState::Foreground
            && let Some(holder) = self.foreground_pid()
        {
            return Err(TshError::ForegroundBusy {
                requested: pid,
                holder,
            });
        }
        let jid = self.free_jid().ok_or(TshError::Full)?;
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(TshError::Full)?;
        *slot = Some(Job {
            pid,
            jid,
            state,
            cmd: cmd.to_string(),
        });
        debug!("job table insert [{}] ({}) {:?} {}", jid, pid, state, cmd);
        Ok(jid)
    }

    pub fn remove(&mut self, pid: Pid) -> bool {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|job| job.pid == pid) {
                debug!("job table remove {:?}", slot);
                *slot = None;
                return true;
            }
        }
        false
    }

    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.slots.iter().flatten().find(|job| job.pid == pid)
    }

    pub fn find_by_jid(&self, jid: usize) -> Option<&Job> {
        self.slots.iter().flatten().find(|job| job.jid == jid)
    }

    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.slots.iter_mut().flatten().find(|job| job.pid == pid)
    }

    pub fn find_by_jid_mut(&mut self, jid: usize) -> Option<&mut Job> {
        self.slots.iter_mut().flatten().find(|job| job.jid == jid)
    }

    pub fn foreground_pid(&self) -> Option<Pid> {
        self.slots
            .iter()
            .flatten()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Moves a job to `state`, refusing to create a second foreground job.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> TshResult<()> {
        if state == JobState::Foreground
            && let Some(holder) = self.foreground_pid()
            && holder != pid
        {
            return Err(TshError::ForegroundBusy {
                requested: pid,
                holder,
            });
        }
        let job = self
            .find_by_pid_mut(pid)
            .ok_or_else(|| TshError::NoSuchJob(pid.to_string()))?;
        debug!("job [{}] ({}) {:?} -> {:?}", job.jid, pid, job.state, state);
        job.state = state;
        Ok(())
    }

    pub fn list(&self) -> Vec<Job> {
        self.slots.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }
}
