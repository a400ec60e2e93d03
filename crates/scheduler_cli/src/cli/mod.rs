use clap::{Parser, Subcommand};
use scheduler_core::config::{ConfigOverride, parse_config_override};
use scheduler_core::timefmt;
use time::{Date, Duration, Time};

#[derive(Parser, Debug)]
#[command(author, version, about = "Calendar task scheduler with reminders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(
        long = "config-override",
        value_name = "KEY=VALUE",
        global = true,
        value_parser = parse_override_arg
    )]
    pub config_override: Vec<ConfigOverride>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task to a date
    ///
    /// Example: scheduler add 2024-01-10 Standup 09:00 --remind 0:15
    Add {
        #[arg(value_parser = parse_date_arg)]
        date: Date,
        name: String,
        #[arg(value_parser = parse_time_arg)]
        time: Time,
        /// Remind this long before the start (H:MM)
        #[arg(long, value_name = "H:MM", value_parser = parse_lead_arg)]
        remind: Option<Duration>,
    },
    /// Edit a task's name, start time or reminder
    ///
    /// Example: scheduler edit 2024-01-10 Standup --rename "Daily sync" --time 09:30
    /// Example: scheduler edit 2024-01-10 Standup --no-remind
    Edit {
        #[arg(value_parser = parse_date_arg)]
        date: Date,
        name: String,
        #[arg(long, value_name = "NAME")]
        rename: Option<String>,
        #[arg(long, value_parser = parse_time_arg)]
        time: Option<Time>,
        #[arg(long, value_name = "H:MM", value_parser = parse_lead_arg, conflicts_with = "no_remind")]
        remind: Option<Duration>,
        #[arg(long)]
        no_remind: bool,
    },
    /// Delete a task
    ///
    /// Example: scheduler delete 2024-01-10 Standup
    Delete {
        #[arg(value_parser = parse_date_arg)]
        date: Date,
        name: String,
    },
    /// List a date's tasks ordered by start time
    ///
    /// Example: scheduler list 2024-01-10
    List {
        #[arg(value_parser = parse_date_arg)]
        date: Date,
    },
    /// Show the dates that have tasks
    ///
    /// Example: scheduler dates --selected 2024-01-10
    Dates {
        #[arg(long, value_parser = parse_date_arg)]
        selected: Option<Date>,
    },
    /// Deliver reminder notifications as they come due
    ///
    /// Example: scheduler watch
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
}

fn parse_date_arg(raw: &str) -> Result<Date, String> {
    timefmt::parse_date(raw).map_err(|err| err.to_string())
}

fn parse_time_arg(raw: &str) -> Result<Time, String> {
    timefmt::parse_time(raw).map_err(|err| err.to_string())
}

fn parse_lead_arg(raw: &str) -> Result<Duration, String> {
    timefmt::parse_lead(raw).map_err(|err| err.to_string())
}

fn parse_override_arg(raw: &str) -> Result<ConfigOverride, String> {
    parse_config_override(raw).map_err(|err| err.to_string())
}
