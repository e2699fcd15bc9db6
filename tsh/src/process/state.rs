use std::fmt;

/// Control state of a job as the shell sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum JobState {
    Foreground,
    Background,
    Stopped,
}

impl fmt::Display for JobState {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobState::Foreground => formatter.write_str("Foreground"),
            JobState::Background => formatter.write_str("Running"),
            JobState::Stopped => formatter.write_str("Stopped"),
        }
    }
}
