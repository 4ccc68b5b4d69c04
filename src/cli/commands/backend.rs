use clap::{Arg, ArgAction, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_OFFLINE: &str = "offline";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the hosted auth and data service, example: https://project.example.co")
                .env("CYBERLEARN_API_URL")
                .required_unless_present(ARG_OFFLINE),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Public API key sent with every request")
                .env("CYBERLEARN_API_KEY")
                .hide_env_values(true)
                .required_unless_present(ARG_OFFLINE),
        )
        .arg(
            Arg::new(ARG_OFFLINE)
                .long(ARG_OFFLINE)
                .help("Use an in-memory backend; progress is lost on exit")
                .env("CYBERLEARN_OFFLINE")
                .action(ArgAction::SetTrue),
        )
}
