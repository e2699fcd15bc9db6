use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, error};
use tsh_types::{TshError, TshResult};

/// What a reaped child went through.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChildStatus {
    Exited(i32),
    Signaled(Signal),
    Stopped(Signal),
}

impl ChildStatus {
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ChildStatus::Stopped(_))
    }
}

/// Collects every state change that is ready right now. Never blocks on
/// children that have not changed, and keeps going until none are left so a
/// burst of exits behind one SIGCHLD is not missed.
pub fn reap_children() -> TshResult<Vec<(Pid, ChildStatus)>> {
    let mut reaped = Vec::new();
    loop {
        match waitpid(
            Pid::from_raw(-1),
            Some(WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED),
        ) {
            Ok(WaitStatus::Exited(pid, code)) => {
                debug!("WAIT_PID_EXITED: Process {} exited with status: {}", pid, code);
                reaped.push((pid, ChildStatus::Exited(code)));
            }
            Ok(WaitStatus::Signaled(pid, signal, core_dumped)) => {
                debug!(
                    "WAIT_PID_SIGNALED: Process {} killed by signal: {:?}, core_dumped: {}",
                    pid, signal, core_dumped
                );
                reaped.push((pid, ChildStatus::Signaled(signal)));
            }
            Ok(WaitStatus::Stopped(pid, signal)) => {
                debug!("WAIT_PID_STOPPED: Process {} stopped by signal: {:?}", pid, signal);
                reaped.push((pid, ChildStatus::Stopped(signal)));
            }
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                debug!("WAIT_PID_OTHER: ignoring status {:?}", status);
            }
            Err(Errno::ECHILD) => break,
            Err(Errno::EINTR) => continue,
            Err(err) => {
                error!("WAIT_PID_ERROR: waitpid failed: {}", err);
                return Err(TshError::system("waitpid")(err));
            }
        }
    }
    Ok(reaped)
}

/// The pieces of the shell the foreground waiter needs.
pub trait ForegroundSource {
    /// Consumes every pending notification, updating the job table.
    fn process_notifications(&mut self) -> TshResult<()>;

    fn foreground_pid(&self) -> Option<Pid>;

    /// True once the shell has decided to exit.
    fn exiting(&self) -> bool;

    /// Blocks until a notification is pending.
    fn wait_notification(&self) -> TshResult<()>;
}

/// Blocks until `pid` is no longer the foreground job, either because it
/// ended or because it stopped. State changes that land between the check and
/// the block are still pending in the notification channel, so the block
/// returns straight away.
pub fn wait_for_foreground<S: ForegroundSource>(source: &mut S, pid: Pid) -> TshResult<()> {
    debug!("waitfg: waiting for {}", pid);
    loop {
        source.process_notifications()?;
        if source.exiting() || source.foreground_pid() != Some(pid) {
            debug!("waitfg: {} left the foreground", pid);
            return Ok(());
        }
        source.wait_notification()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::{ForkResult, fork, pause};
    use std::cell::Cell;

    fn init() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    /// Clears the foreground after a number of notifications.
    struct Scripted {
        foreground: Option<Pid>,
        pending: Cell<usize>,
        deliveries_left: usize,
        waits: Cell<usize>,
        exiting: bool,
    }

    impl ForegroundSource for Scripted {
        fn process_notifications(&mut self) -> TshResult<()> {
            if self.pending.get() > 0 {
                self.pending.set(0);
                self.deliveries_left -= 1;
                if self.deliveries_left == 0 {
                    self.foreground = None;
                }
            }
            Ok(())
        }

        fn foreground_pid(&self) -> Option<Pid> {
            self.foreground
        }

        fn exiting(&self) -> bool {
            self.exiting
        }

        fn wait_notification(&self) -> TshResult<()> {
            self.waits.set(self.waits.get() + 1);
            self.pending.set(self.pending.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn waits_only_while_job_is_foreground() {
        init();
        let pid = Pid::from_raw(4242);
        let mut source = Scripted {
            foreground: Some(pid),
            pending: Cell::new(0),
            deliveries_left: 3,
            waits: Cell::new(0),
            exiting: false,
        };
        wait_for_foreground(&mut source, pid).unwrap();
        // one block per delivered notification, no spinning
        assert_eq!(source.waits.get(), 3);
        assert_eq!(source.foreground_pid(), None);
    }

    #[test]
    fn already_pending_change_returns_without_blocking() {
        init();
        let pid = Pid::from_raw(4242);
        let mut source = Scripted {
            foreground: Some(pid),
            pending: Cell::new(1),
            deliveries_left: 1,
            waits: Cell::new(0),
            exiting: false,
        };
        wait_for_foreground(&mut source, pid).unwrap();
        assert_eq!(source.waits.get(), 0);
    }

    #[test]
    fn other_foreground_job_does_not_block() {
        init();
        let mut source = Scripted {
            foreground: Some(Pid::from_raw(1)),
            pending: Cell::new(0),
            deliveries_left: 1,
            waits: Cell::new(0),
            exiting: false,
        };
        wait_for_foreground(&mut source, Pid::from_raw(2)).unwrap();
        assert_eq!(source.waits.get(), 0);
    }

    #[test]
    fn exiting_shell_stops_waiting() {
        init();
        let pid = Pid::from_raw(7);
        let mut source = Scripted {
            foreground: Some(pid),
            pending: Cell::new(0),
            deliveries_left: 1,
            waits: Cell::new(0),
            exiting: true,
        };
        wait_for_foreground(&mut source, pid).unwrap();
        assert_eq!(source.waits.get(), 0);
    }

    #[test]
    fn reaps_stopped_and_killed_child() {
        init();
        let child = match unsafe { fork() }.unwrap() {
            ForkResult::Child => loop {
                pause();
            },
            ForkResult::Parent { child } => child,
        };

        kill(child, Signal::SIGSTOP).unwrap();
        let mut seen = Vec::new();
        while !seen.iter().any(|(pid, status)| {
            *pid == child && *status == ChildStatus::Stopped(Signal::SIGSTOP)
        }) {
            seen.extend(reap_children().unwrap());
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        kill(child, Signal::SIGKILL).unwrap();
        let mut seen = Vec::new();
        while !seen.iter().any(|(pid, status): &(Pid, ChildStatus)| {
            *pid == child && status.is_terminated()
        }) {
            seen.extend(reap_children().unwrap());
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(seen.contains(&(child, ChildStatus::Signaled(Signal::SIGKILL))));
    }
}
