use clap::Parser;

pub const PROMPT: &str = "tsh> ";

#[derive(Parser, Debug)]
#[command(author, version, about = "A tiny shell with job control", long_about = None)]
pub struct Cli {
    /// Print additional diagnostic information
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not emit a command prompt
    #[arg(short = 'p', long = "no-prompt")]
    pub no_prompt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub emit_prompt: bool,
    pub verbose: bool,
    pub prompt: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            emit_prompt: true,
            verbose: false,
            prompt: PROMPT.to_string(),
        }
    }
}

impl From<&Cli> for ShellConfig {
    fn from(cli: &Cli) -> Self {
        ShellConfig {
            emit_prompt: !cli.no_prompt,
            verbose: cli.verbose,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_config() {
        let cli = Cli::try_parse_from(["tsh", "-v", "-p"]).unwrap();
        let config = ShellConfig::from(&cli);
        assert!(config.verbose);
        assert!(!config.emit_prompt);
        assert_eq!(config.prompt, "tsh> ");

        let cli = Cli::try_parse_from(["tsh"]).unwrap();
        assert_eq!(ShellConfig::from(&cli), ShellConfig::default());
    }

    #[test]
    fn help_is_a_request_not_a_failure() {
        let err = Cli::try_parse_from(["tsh", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
