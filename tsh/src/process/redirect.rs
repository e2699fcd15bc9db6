use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use std::os::unix::io::RawFd;
use tracing::debug;
use tsh_types::{TshError, TshResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// `< file`
    Input(String),
    /// `> file`, standard output and standard error
    Output(String),
}

impl Redirect {
    /// Opens the target and moves it onto the standard descriptors of the
    /// calling (already forked) process.
    pub(crate) fn apply(&self) -> TshResult<()> {
        match self {
            Redirect::Input(path) => {
                let fd = open_file(path, OFlag::O_RDONLY, Mode::empty())?;
                copy_fd(fd, STDIN_FILENO)?;
            }
            Redirect::Output(path) => {
                let fd = open_file(
                    path,
                    OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC,
                    Mode::S_IRUSR | Mode::S_IWUSR,
                )?;
                dup2(fd, STDOUT_FILENO).map_err(TshError::system("dup2"))?;
                copy_fd(fd, STDERR_FILENO)?;
            }
        }
        debug!("applied redirect {:?}", self);
        Ok(())
    }
}

fn open_file(path: &str, flags: OFlag, mode: Mode) -> TshResult<RawFd> {
    open(path, flags, mode).map_err(|source| TshError::File {
        path: path.to_string(),
        source,
    })
}

/// Duplicates `src` onto `dst` and closes `src`.
pub(crate) fn copy_fd(src: RawFd, dst: RawFd) -> TshResult<()> {
    if src != dst {
        dup2(src, dst).map_err(TshError::system("dup2"))?;
        close(src).map_err(TshError::system("close"))?;
    }
    Ok(())
}
