use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "timesheets")]
#[command(version)]
#[command(about = "Submit and approve PLATO timesheets.", long_about = None)]
pub struct Args {
    /// Subcommand to run.
    #[arg(value_enum)]
    pub command: Command,

    /// Use the supplied value for the NetID authentication.
    #[arg(short = 'u', long = "user")]
    pub username: Option<String>,

    /// Use the supplied value for the password.
    #[arg(short = 'p', long = "password")]
    pub password: Option<String>,

    /// Output extra info (more -v's = more info).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Run in test mode (no changes are made).
    #[arg(short = 't', long = "test")]
    pub test_mode: bool,
}

impl Args {
    /// Default is warnings only; -v adds info, -vv adds debug.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Submit any available personal timesheets.
    Submit,
    /// Approve all overdue timesheets for direct reports.
    Approve,
}
