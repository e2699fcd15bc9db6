use libc::STDOUT_FILENO;
pub use nix::errno::Errno;
pub use nix::unistd::Pid;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::mem;
use std::os::unix::io::FromRawFd;
use std::os::unix::io::RawFd;
use thiserror::Error;

/// Tiny shell specific error types
#[derive(Error, Debug)]
pub enum TshError {
    /// An OS primitive the shell cannot work without failed.
    #[error("{operation}: {}", .source.desc())]
    System {
        operation: &'static str,
        source: Errno,
    },

    #[error("fork: {}", .0.desc())]
    ResourceExhausted(Errno),

    #[error("Tried to create too many jobs")]
    Full,

    #[error("{0}: No such job")]
    NoSuchJob(String),

    #[error("{0}: Missing process Id or Job id")]
    Usage(String),

    #[error("{path}: {}", .source.desc())]
    File { path: String, source: Errno },

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("job ({requested}) cannot enter the foreground while job ({holder}) holds it")]
    ForegroundBusy { requested: Pid, holder: Pid },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl TshError {
    pub fn system(operation: &'static str) -> impl FnOnce(Errno) -> TshError {
        move |source| TshError::System { operation, source }
    }

    /// Fatal errors end the shell; everything else aborts only the current command.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TshError::System { .. } | TshError::ResourceExhausted(_) | TshError::Io(_)
        )
    }
}

pub type TshResult<T> = std::result::Result<T, TshError>;

#[derive(Clone)]
pub struct Context {
    pub shell_pid: Pid,
    pub shell_pgid: Pid,
    pub verbose: bool,
    pub outfile: RawFd,
}

impl Context {
    pub fn new(shell_pid: Pid, shell_pgid: Pid, verbose: bool) -> Self {
        Context {
            shell_pid,
            shell_pgid,
            verbose,
            outfile: STDOUT_FILENO,
        }
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::result::Result<(), std::fmt::Error> {
        f.debug_struct("Context")
            .field("shell_pid", &self.shell_pid)
            .field("shell_pgid", &self.shell_pgid)
            .field("verbose", &self.verbose)
            .field("outfile", &self.outfile)
            .finish()
    }
}

impl Context {
    pub fn write_stdout(&self, msg: &str) -> TshResult<()> {
        let mut file = unsafe { File::from_raw_fd(self.outfile) };
        let res = writeln!(&mut file, "{msg}");
        mem::forget(file);
        Ok(res?)
    }

    /// Writes without a trailing newline, for the prompt.
    pub fn write_prompt(&self, prompt: &str) -> TshResult<()> {
        let mut file = unsafe { File::from_raw_fd(self.outfile) };
        let res = file.write_all(prompt.as_bytes());
        mem::forget(file);
        Ok(res?)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ExitStatus {
    ExitedWith(i32),
}
