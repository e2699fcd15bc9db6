use nix::errno::Errno;
use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};
use nix::poll::{PollFd, PollFlags, poll};
use nix::sys::signal::{
    SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, killpg, sigaction, sigprocmask,
};
use nix::unistd::{Pid, close, pipe, read, write};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{debug, error, warn};
use tsh_types::{TshError, TshResult};

/// Write end of the self-pipe, or -1 while no channel is installed.
static NOTIFY_FD: AtomicI32 = AtomicI32::new(-1);

/// Signals whose delivery is turned into notifications.
const NOTIFY_SIGNALS: [Signal; 4] = [
    Signal::SIGCHLD,
    Signal::SIGINT,
    Signal::SIGTSTP,
    Signal::SIGQUIT,
];

/// Signals held back while a job is forked and registered.
pub const JOB_CONTROL_SIGNALS: [Signal; 3] = [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP];

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Notification {
    ChildStateChanged,
    Interrupt,
    Suspend,
    Quit,
}

impl Notification {
    fn from_tag(tag: u8) -> Option<Self> {
        match Signal::try_from(tag as i32) {
            Ok(Signal::SIGCHLD) => Some(Notification::ChildStateChanged),
            Ok(Signal::SIGINT) => Some(Notification::Interrupt),
            Ok(Signal::SIGTSTP) => Some(Notification::Suspend),
            Ok(Signal::SIGQUIT) => Some(Notification::Quit),
            _ => None,
        }
    }
}

#[cfg(target_os = "linux")]
unsafe fn errno_location() -> *mut libc::c_int {
    unsafe { libc::__errno_location() }
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
unsafe fn errno_location() -> *mut libc::c_int {
    unsafe { libc::__error() }
}

/// Runs in signal context: one write(2), errno preserved.
extern "C" fn notify(signo: libc::c_int) {
    let fd = NOTIFY_FD.load(Ordering::Relaxed);
    if fd < 0 {
        return;
    }
    unsafe {
        let location = errno_location();
        let saved = *location;
        // EAGAIN on a full pipe is ignored, the reader is woken by what is already there.
        let _ = write(fd, &[signo as u8]);
        *location = saved;
    }
}

/// Self-pipe fed by the shell's signal handlers. The main control flow drains
/// it between commands and blocks on it while a foreground job runs.
#[derive(Debug)]
pub struct SignalChannel {
    reader: RawFd,
    writer: RawFd,
}

impl SignalChannel {
    pub fn install() -> TshResult<Self> {
        let (reader, writer) = pipe().map_err(TshError::system("pipe"))?;
        for fd in [reader, writer] {
            fcntl(fd, FcntlArg::F_SETFL(OFlag::O_NONBLOCK)).map_err(TshError::system("fcntl"))?;
            fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)).map_err(TshError::system("fcntl"))?;
        }
        NOTIFY_FD.store(writer, Ordering::SeqCst);

        let action = SigAction::new(
            SigHandler::Handler(notify),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for signal in NOTIFY_SIGNALS {
            unsafe { sigaction(signal, &action) }.map_err(TshError::system("Signal error"))?;
        }
        debug!(
            "signal channel installed reader:{} writer:{} signals:{:?}",
            reader, writer, NOTIFY_SIGNALS
        );
        Ok(SignalChannel { reader, writer })
    }

    /// Reads every pending notification without blocking.
    pub fn drain(&self) -> TshResult<Vec<Notification>> {
        let mut pending = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match read(self.reader, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    pending.extend(buf[..n].iter().filter_map(|tag| {
                        let notification = Notification::from_tag(*tag);
                        if notification.is_none() {
                            warn!("ignoring unknown notification tag {}", tag);
                        }
                        notification
                    }));
                }
                Err(Errno::EAGAIN) => break,
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(TshError::system("read")(err)),
            }
        }
        Ok(pending)
    }

    /// Blocks until at least one notification is pending. Anything delivered
    /// after the caller's last check is already in the pipe, so the wakeup
    /// cannot be lost.
    pub fn wait(&self) -> TshResult<()> {
        let mut fds = [PollFd::new(self.reader, PollFlags::POLLIN)];
        loop {
            match poll(&mut fds, -1) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(TshError::system("poll")(err)),
            }
        }
    }
}

impl Drop for SignalChannel {
    fn drop(&mut self) {
        NOTIFY_FD.store(-1, Ordering::SeqCst);
        let _ = close(self.reader);
        let _ = close(self.writer);
    }
}

/// Restores default dispositions in a freshly forked job.
pub(crate) fn reset_for_child() -> TshResult<()> {
    NOTIFY_FD.store(-1, Ordering::SeqCst);
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for signal in NOTIFY_SIGNALS {
        unsafe { sigaction(signal, &action) }.map_err(TshError::system("sigaction"))?;
    }
    Ok(())
}

/// Blocks a set of signals for as long as it lives; the previous mask comes
/// back on drop.
pub struct SignalBlock {
    previous: SigSet,
}

impl SignalBlock {
    pub fn new(signals: &[Signal]) -> TshResult<Self> {
        let mut set = SigSet::empty();
        for signal in signals {
            set.add(*signal);
        }
        let mut previous = SigSet::empty();
        sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut previous))
            .map_err(TshError::system("sigprocmask"))?;
        Ok(SignalBlock { previous })
    }

    pub fn restore(&self) -> TshResult<()> {
        sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None)
            .map_err(TshError::system("sigprocmask"))
    }
}

impl Drop for SignalBlock {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            error!("failed to restore signal mask: {}", err);
        }
    }
}

/// Sends `signal` to every process in the job's group.
pub(crate) fn signal_job(pgid: Pid, signal: Signal) -> TshResult<()> {
    debug!("📡 SIGNAL: Sending signal {:?} to process group {}", signal, pgid);
    match killpg(pgid, signal) {
        Ok(_) => Ok(()),
        Err(Errno::ESRCH) => {
            // already gone; the reaper will catch up
            warn!("📡 SIGNAL: process group {} no longer exists", pgid);
            Ok(())
        }
        Err(err) => {
            error!(
                "📡 SIGNAL: Failed to send signal {:?} to process group {}: {}",
                signal, pgid, err
            );
            Err(TshError::system("kill")(err))
        }
    }
}
