use thiserror::Error;

/// Conditions that end the run with exit status 1.
#[derive(Debug, Error)]
pub enum RinseError {
    #[error("No packages specified. Usage: rinse {0} <package>...")]
    MissingArgument(&'static str),

    #[error("Unrecognized command: {0}. Run 'rinse help' for usage")]
    UnrecognizedCommand(String),

    #[error("No AUR helper available, cannot install AUR packages")]
    AurHelperUnavailable,
}

impl RinseError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}
