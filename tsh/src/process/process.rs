use libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, close, execvp, fork, pipe};
use std::ffi::CString;
use std::os::unix::io::RawFd;
use tracing::{debug, error};
use tsh_types::{TshError, TshResult};

use super::redirect::{Redirect, copy_fd};

pub const PIPE_TOKEN: &str = "|";
pub const INPUT_TOKEN: &str = "<";
pub const OUTPUT_TOKEN: &str = ">";

/// One stage of a pipeline: the program's argument vector and its own
/// redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub(crate) argv: Vec<String>,
    pub(crate) redirects: Vec<Redirect>,
}

impl Process {
    /// Pulls `< file` and `> file` out of a stage, scanning once left to right.
    pub fn parse(tokens: &[String]) -> TshResult<Self> {
        let mut argv = Vec::with_capacity(tokens.len());
        let mut redirects = Vec::new();
        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            match token.as_str() {
                INPUT_TOKEN | OUTPUT_TOKEN => {
                    let path = iter.next().ok_or_else(|| {
                        TshError::Syntax(format!("missing file name after '{token}'"))
                    })?;
                    if token == INPUT_TOKEN {
                        redirects.push(Redirect::Input(path.clone()));
                    } else {
                        redirects.push(Redirect::Output(path.clone()));
                    }
                }
                _ => argv.push(token.clone()),
            }
        }
        if argv.is_empty() {
            return Err(TshError::Syntax("missing command".to_string()));
        }
        Ok(Process { argv, redirects })
    }

    pub fn cmd(&self) -> &str {
        &self.argv[0]
    }

    /// Applies this stage's redirections and replaces the process image.
    /// Only returns control by exiting.
    pub(crate) fn exec(&self) -> ! {
        for redirect in &self.redirects {
            if let Err(err) = redirect.apply() {
                exit_child(err);
            }
        }

        let argv: Result<Vec<CString>, _> = self
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect();
        let argv = match argv {
            Ok(argv) => argv,
            Err(_) => exit_child(TshError::Syntax(format!(
                "{}: argument contains a NUL byte",
                self.cmd()
            ))),
        };

        debug!("launch: execvp argv:{:?}", argv);
        match execvp(&argv[0], &argv) {
            Ok(never) => match never {},
            Err(source) => exit_child(TshError::File {
                path: self.cmd().to_string(),
                source,
            }),
        }
    }
}

/// Stages of one command line in the order the user typed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub(crate) stages: Vec<Process>,
}

impl Pipeline {
    pub fn parse(tokens: &[String]) -> TshResult<Self> {
        let stages = tokens
            .split(|token| token == PIPE_TOKEN)
            .map(Process::parse)
            .collect::<TshResult<Vec<_>>>()?;
        debug!("pipeline stages: {:?}", stages);
        Ok(Pipeline { stages })
    }

    pub fn stages(&self) -> &[Process] {
        &self.stages
    }

    /// Runs inside the job leader. A single stage replaces the leader. With
    /// more stages the leader forks every stage inside the job's process group,
    /// wires stage `n`'s stdout to stage `n + 1`'s stdin, waits for all of
    /// them and exits with the last stage's status, so the job ends when the
    /// whole pipeline has ended.
    pub(crate) fn exec(&self) -> ! {
        match self.stages.as_slice() {
            [] => exit_child(TshError::Syntax("missing command".to_string())),
            [only] => only.exec(),
            stages => supervise(stages),
        }
    }
}

fn supervise(stages: &[Process]) -> ! {
    let mut children = Vec::with_capacity(stages.len());
    let mut upstream: Option<RawFd> = None;

    for (index, stage) in stages.iter().enumerate() {
        let downstream = if index + 1 < stages.len() {
            match pipe() {
                Ok(fds) => Some(fds),
                Err(err) => exit_child(TshError::system("pipe")(err)),
            }
        } else {
            None
        };

        match unsafe { fork() } {
            Ok(ForkResult::Child) => {
                if let Err(err) = wire_stage(upstream, downstream) {
                    exit_child(err);
                }
                stage.exec()
            }
            Ok(ForkResult::Parent { child }) => {
                debug!("pipeline stage {} runs {}", child, stage.cmd());
                children.push(child);
                let closed = upstream
                    .take()
                    .map_or(Ok(()), |fd| close(fd).map_err(TshError::system("close")));
                if let Err(err) = closed {
                    exit_child(err);
                }
                if let Some((reader, writer)) = downstream {
                    if let Err(err) = close(writer) {
                        exit_child(TshError::system("close")(err));
                    }
                    upstream = Some(reader);
                }
            }
            Err(err) => exit_child(TshError::ResourceExhausted(err)),
        }
    }

    let last = children.last().copied();
    std::process::exit(wait_stages(last))
}

/// Moves the pipe ends a stage reads from and writes to onto stdin/stdout.
fn wire_stage(upstream: Option<RawFd>, downstream: Option<(RawFd, RawFd)>) -> TshResult<()> {
    if let Some(fd) = upstream {
        copy_fd(fd, STDIN_FILENO)?;
    }
    if let Some((reader, writer)) = downstream {
        close(reader).map_err(TshError::system("close"))?;
        copy_fd(writer, STDOUT_FILENO)?;
    }
    Ok(())
}

/// Blocks until every stage is gone. Returns the exit code for the leader:
/// the last stage's code, or 128 plus the signal that killed it.
fn wait_stages(last: Option<Pid>) -> i32 {
    let mut code = 0;
    loop {
        match waitpid(Pid::from_raw(-1), None) {
            Ok(WaitStatus::Exited(pid, status)) if Some(pid) == last => code = status,
            Ok(WaitStatus::Signaled(pid, signal, _)) if Some(pid) == last => {
                code = 128 + signal as i32
            }
            Ok(status) => debug!("pipeline stage finished {:?}", status),
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return code,
            Err(err) => {
                error!("pipeline waitpid failed: {}", err);
                return 1;
            }
        }
    }
}

/// Reports a failure inside a forked child and terminates it.
pub(crate) fn exit_child(err: TshError) -> ! {
    error!("child {} failed: {}", std::process::id(), err);
    eprintln!("tsh: {err}");
    std::process::exit(1);
}
