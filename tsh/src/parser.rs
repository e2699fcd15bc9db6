use tsh_types::{TshError, TshResult};

/// Trailing token that sends a command to the background.
pub const BACKGROUND_TOKEN: &str = "&";

/// Splits a command line into words with POSIX shell quoting rules.
pub fn parse_line(line: &str) -> TshResult<Vec<String>> {
    shell_words::split(line).map_err(|err| TshError::Syntax(err.to_string()))
}

/// Removes a trailing `&`, reporting whether it was there.
pub fn split_background(mut argv: Vec<String>) -> (Vec<String>, bool) {
    if argv.last().is_some_and(|last| last == BACKGROUND_TOKEN) {
        argv.pop();
        (argv, true)
    } else {
        (argv, false)
    }
}
