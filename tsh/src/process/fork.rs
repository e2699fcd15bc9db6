use nix::sys::signal::Signal;
use nix::unistd::{ForkResult, Pid, fork, setpgid};
use std::io::Write;
use tracing::{debug, warn};
use tsh_types::{Context, TshError, TshResult};

use super::job::JobTable;
use super::process::{Pipeline, exit_child};
use super::signal::{JOB_CONTROL_SIGNALS, SignalBlock, reset_for_child, signal_job};
use super::state::JobState;

/// Forks the job leader for `pipeline` and records it in `jobs`.
///
/// Child-state, interrupt and suspend signals stay blocked from before the
/// fork until the job is in the table. The child inherits the block, so
/// nothing reaches it before it has left the shell's process group and
/// dropped the shell's handlers; it then restores the old mask before any
/// helper is forked or a program is loaded.
///
/// A failed program load is not visible here: the child reports it and exits,
/// and is reaped like any other job.
pub fn fork_job(
    ctx: &Context,
    jobs: &mut JobTable,
    pipeline: &Pipeline,
    state: JobState,
    cmd: &str,
) -> TshResult<(Pid, usize)> {
    if jobs.is_full() {
        return Err(TshError::Full);
    }

    let block = SignalBlock::new(&JOB_CONTROL_SIGNALS)?;
    std::io::stdout().flush()?;

    debug!("🍴 FORK: About to fork job leader for '{}' ({:?})", cmd, state);
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            // Same call as the child makes; whichever runs first wins.
            if let Err(err) = setpgid(child, child) {
                debug!("🍴 FORK: parent setpgid({}) skipped: {}", child, err);
            }
            let jid = match jobs.insert(child, state, cmd) {
                Ok(jid) => jid,
                Err(err) => {
                    warn!("🍴 FORK: could not register {}: {}", child, err);
                    signal_job(child, Signal::SIGKILL)?;
                    return Err(err);
                }
            };
            if ctx.verbose {
                ctx.write_stdout(&format!("Added job [{}] {} {}", jid, child, cmd))?;
            }
            block.restore()?;
            debug!("🍴 FORK: job [{}] ({}) registered", jid, child);
            Ok((child, jid))
        }
        Ok(ForkResult::Child) => {
            let prepared = setpgid(Pid::from_raw(0), Pid::from_raw(0))
                .map_err(TshError::system("setpgid"))
                .and_then(|_| reset_for_child())
                .and_then(|_| block.restore());
            if let Err(err) = prepared {
                exit_child(err);
            }
            pipeline.exec()
        }
        Err(err) => Err(TshError::ResourceExhausted(err)),
    }
}
