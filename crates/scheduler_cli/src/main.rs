use clap::{CommandFactory, Parser};
use scheduler_cli::cli::{Cli, Command};
use scheduler_core::config::{self, Config, Palette};
use scheduler_core::error::AppError;
use scheduler_core::highlight::Marker;
use scheduler_core::model::Task;
use scheduler_core::notify::{NotificationEvent, notifier_from_env};
use scheduler_core::poller::{self, PollerSettings, ReminderPoller, TickOutcome, WatchOptions};
use scheduler_core::storage::json_store;
use scheduler_core::task_api::{self, PendingWrites, ReminderChange, TaskPatch};
use scheduler_core::timefmt;
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing_subscriber::EnvFilter;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Task")]
    name: String,
    #[tabled(rename = "Reminder")]
    reminder: String,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn reminder_label(task: &Task) -> String {
    match (task.reminder, task.reminder_lead()) {
        (Some(at), Some(lead)) => format!(
            "{} ({} before)",
            timefmt::format_time(at.time()),
            timefmt::format_lead(lead)
        ),
        _ => "-".to_string(),
    }
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "date": timefmt::format_date(task.date()),
        "name": task.name,
        "start": timefmt::format_datetime(task.start),
        "reminder_enabled": task.reminder_enabled(),
        "reminder": task.reminder.map(timefmt::format_datetime),
    })
}

fn event_json(event: &NotificationEvent) -> serde_json::Value {
    serde_json::json!({
        "title": event.title,
        "body": event.body,
        "display_ms": event.display_ms,
        "date": timefmt::format_date(event.date),
        "name": event.task_name,
        "start": timefmt::format_datetime(event.start),
    })
}

fn describe_task(task: &Task) -> String {
    format!(
        "{} on {} at {}",
        task.name,
        timefmt::format_date(task.date()),
        timefmt::format_time(task.start.time())
    )
}

fn print_tasks_table(tasks: &[Task]) {
    let rows = tasks.iter().map(|task| TaskRow {
        time: timefmt::format_time(task.start.time()),
        name: task.name.clone(),
        reminder: reminder_label(task),
    });
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{table}");
}

fn print_markers(markers: &[(time::Date, Marker)], palette: &Palette) {
    for (date, marker) in markers {
        let label = timefmt::format_date(*date);
        match marker {
            Marker::Selected => println!("{} *", palette.selectize(&label)),
            Marker::Task => println!("{}", palette.taskize(&label)),
        }
    }
}

fn print_outcome(outcome: &TickOutcome, json: bool) {
    for event in &outcome.delivered {
        if json {
            println!("{}", event_json(event));
        } else {
            println!(
                "Reminder: {} ({})",
                event.body,
                timefmt::format_date(event.date)
            );
        }
    }
    for failure in &outcome.failures {
        eprintln!("WARN: reminder for {} dropped: {}", failure.event.task_name, failure.error);
    }
}

fn usage_error(err: &clap::Error) -> AppError {
    let rendered = err.to_string();
    let summary = rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("invalid command");
    AppError::invalid_input(summary.trim_start_matches("error: "))
}

/// Splits an interactive line into arguments. A word that starts with a
/// single or double quote runs to the matching quote, so
/// `add 2024-01-10 "Daily standup" 09:00` yields four arguments.
fn split_args(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut word: Option<String> = None;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => word.get_or_insert_with(String::new).push(ch),
            None if (ch == '"' || ch == '\'') && word.is_none() => {
                quote = Some(ch);
                word = Some(String::new());
            }
            None if ch.is_whitespace() => args.extend(word.take()),
            None => word.get_or_insert_with(String::new).push(ch),
        }
    }

    if quote.is_some() {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }
    args.extend(word);
    Ok(args)
}

fn run_command(cli: Cli, base: &Config, pending: &mut PendingWrites) -> Result<(), AppError> {
    let config = config::merge_overrides(base, &cli.config_override);

    match cli.command {
        Command::Add {
            date,
            name,
            time,
            remind,
        } => {
            let task = task_api::add_task(pending, &config, date, &name, time, remind)?;
            if cli.json {
                println!("{}", task_json(&task));
            } else {
                println!("Added task: {}", describe_task(&task));
            }
        }
        Command::Edit {
            date,
            name,
            rename,
            time,
            remind,
            no_remind,
        } => {
            let reminder = match (remind, no_remind) {
                (Some(lead), _) => ReminderChange::Lead(lead),
                (None, true) => ReminderChange::Disable,
                (None, false) => ReminderChange::Keep,
            };
            let patch = TaskPatch {
                rename,
                start_time: time,
                reminder,
            };
            let task = task_api::edit_task(pending, &config, date, &name, &patch)?;
            if cli.json {
                println!("{}", task_json(&task));
            } else {
                println!("Updated task: {}", describe_task(&task));
            }
        }
        Command::Delete { date, name } => {
            let deleted = task_api::delete_task(pending, &config, date, &name)?;
            if cli.json {
                let mut payload = task_json(&deleted.task);
                payload["date_cleared"] = serde_json::Value::Bool(deleted.date_cleared);
                println!("{payload}");
            } else {
                println!("Deleted task: {}", describe_task(&deleted.task));
                if deleted.date_cleared {
                    println!("No tasks left on {}", timefmt::format_date(date));
                }
            }
        }
        Command::List { date } => {
            let view = task_api::select_date(pending, &config, date)?;
            if let Some(err) = view.load_error.as_ref() {
                eprintln!("WARN: {}", err.report());
            }
            if cli.json {
                let payload: Vec<_> = view.tasks.iter().map(task_json).collect();
                println!("{}", serde_json::Value::Array(payload));
            } else if view.tasks.is_empty() {
                println!("No tasks on {}", timefmt::format_date(date));
            } else {
                print_tasks_table(&view.tasks);
            }
        }
        Command::Dates { selected } => {
            let focus = selected.unwrap_or_else(|| timefmt::now_local().date());
            let view = task_api::select_date(pending, &config, focus)?;
            if let Some(err) = view.load_error.as_ref() {
                eprintln!("WARN: {}", err.report());
            }
            let markers: Vec<_> = view
                .markers
                .into_iter()
                .map(|(date, marker)| match selected {
                    Some(_) => (date, marker),
                    None => (date, Marker::Task),
                })
                .collect();
            if cli.json {
                let payload: Vec<_> = markers
                    .iter()
                    .map(|(date, marker)| {
                        serde_json::json!({
                            "date": timefmt::format_date(*date),
                            "selected": *marker == Marker::Selected,
                        })
                    })
                    .collect();
                println!("{}", serde_json::Value::Array(payload));
            } else {
                print_markers(&markers, &config::palette_for_theme(config.theme.as_deref()));
            }
        }
        Command::Watch { ticks } => {
            let path = json_store::store_path(&config)?;
            let mut poller =
                ReminderPoller::new(notifier_from_env(), PollerSettings::from_config(&config));
            let options = WatchOptions::from_config(&config, ticks);
            if !cli.json {
                println!("Watching {} for reminders", path.display());
            }
            poller::watch_store(&path, &mut poller, options, timefmt::now_local, |outcome| {
                print_outcome(outcome, cli.json)
            });
        }
    }

    Ok(())
}

fn run_interactive(config: &Config) -> Result<(), AppError> {
    let mut pending = PendingWrites::new();
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::invalid_input(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            println!("{}", Cli::command().render_help());
            continue;
        }

        if !pending.is_empty()
            && let Err(err) = pending.retry()
        {
            eprintln!("WARN: {}", err.report());
        }

        let args = match split_args(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err.report());
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("scheduler".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", usage_error(&err).report());
                continue;
            }
        };

        if matches!(cli.command, Command::Watch { .. }) {
            let err = AppError::invalid_input("watch is not available in interactive mode");
            eprintln!("ERROR: {}", err.report());
            continue;
        }

        if let Err(err) = run_command(cli, config, &mut pending) {
            eprintln!("ERROR: {}", err.report());
            if !pending.is_empty() {
                eprintln!("WARN: change kept in memory; saving again before the next command");
            }
        }
    }

    pending.retry()
}

fn main() {
    let loaded = config::load_config_with_fallback();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        init_tracing("warn");
        if let Some(err) = loaded.error.as_ref() {
            eprintln!("WARN: config: {}", err.report());
        }
        if let Err(err) = run_interactive(&loaded.config) {
            eprintln!("ERROR: {}", err.report());
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            print!("{err}");
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", usage_error(&err).report());
            std::process::exit(1);
        }
    };

    init_tracing(match cli.command {
        Command::Watch { .. } => "info",
        _ => "warn",
    });
    if let Some(err) = loaded.error.as_ref() {
        eprintln!("WARN: config: {}", err.report());
    }

    if let Err(err) = run_command(cli, &loaded.config, &mut PendingWrites::new()) {
        eprintln!("ERROR: {}", err.report());
        std::process::exit(1);
    }
}
