use super::{ShellProxy, report};
use tsh_types::{Context, ExitStatus, TshError};

pub fn command(ctx: &Context, argv: Vec<String>, proxy: &mut dyn ShellProxy) -> ExitStatus {
    if argv.len() < 2 {
        return report(ctx, proxy, Err(TshError::Usage("bg".to_string())));
    }
    let result = proxy.dispatch(ctx, "bg", argv);
    report(ctx, proxy, result)
}
