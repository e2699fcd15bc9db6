use super::{ShellProxy, report};
use tsh_types::{Context, ExitStatus};

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    let result = proxy.dispatch(ctx, "jobs", argv);
    report(ctx, proxy, result)
}
