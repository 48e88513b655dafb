use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use swipeseek_core::action::ActionType;
use swipeseek_core::config::SeekConfig;
use swipeseek_core::executor::{ActionExecutor, ExecutionResult};
use swipeseek_core::gesture::ScrollIntent;
use swipeseek_core::locator::{ContainerLocator, ItemLocator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "swipeseek", about = "Swipe-search automation for mobile UI wheels and lists", version)]
struct Cli {
    /// Agent host (overrides the config file)
    #[arg(long, global = true, env = "SWIPESEEK_HOST")]
    host: Option<String>,

    /// Agent port (overrides the config file)
    #[arg(long, global = true, env = "SWIPESEEK_PORT")]
    port: Option<u16>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Lift the iteration cap on searches
    #[arg(long, global = true)]
    unbounded: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Swipe the screen or a container
    Swipe {
        /// Direction: up, down, left, right
        direction: String,
        /// Identifier of the container to swipe inside
        #[arg(short, long)]
        container: Option<String>,
    },
    /// Tap an element by identifier or label
    Tap {
        selector: String,
        /// Match by accessibility label instead of identifier
        #[arg(short, long)]
        label: bool,
        /// Element type filter (e.g. Button)
        #[arg(short = 'T', long = "type")]
        element_type: Option<String>,
    },
    /// Swipe a container until some text is visible
    ScrollTo {
        /// Identifier of the scrolling container
        container: String,
        /// Text to look for
        text: String,
        /// Scroll towards the start of the content
        #[arg(long)]
        backward: bool,
        /// Tap the text once it is visible
        #[arg(long)]
        tap: bool,
    },
    /// Select a value on a picker wheel
    Select {
        /// Identifier of the wheel
        container: String,
        /// Number, or one of --choices
        value: String,
        /// Ordered wheel contents, comma separated
        #[arg(long, value_delimiter = ',')]
        choices: Option<Vec<String>>,
    },
    /// Set a date on day, month and year wheels
    SelectDate {
        day: String,
        month: String,
        year: String,
        /// Date as YYYY-MM-DD
        date: String,
    },
    /// Set a time on hour and minute wheels
    SelectTime {
        hour: String,
        minute: String,
        /// Time as HH:MM
        time: String,
    },
    /// Print the effective configuration
    Config {
        /// Write it to the config file, making the overrides permanent
        #[arg(long)]
        save: bool,
    },
}

enum CliError {
    Connection(String),
    ActionFailed(String),
    InvalidInput(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Connection(_) => ExitCode::from(2),
            CliError::ActionFailed(_) => ExitCode::from(1),
            CliError::InvalidInput(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Connection(msg) => write!(f, "Connection error: {}", msg),
            CliError::ActionFailed(msg) => write!(f, "Action failed: {}", msg),
            CliError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

fn init_logging(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "swipeseek.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn effective_config(cli: &Cli) -> SeekConfig {
    let mut config = SeekConfig::load();
    if let Some(host) = &cli.host {
        config.agent_host = host.clone();
    }
    if let Some(port) = cli.port {
        config.agent_port = port;
    }
    if cli.unbounded {
        config.max_attempts = None;
    }
    config
}

fn wheel(id: &str) -> ContainerLocator {
    ContainerLocator::id(id)
}

/// Builds the action for a command, validating its arguments before any
/// connection is made.
fn build_action(command: &Command) -> Result<ActionType, CliError> {
    let action = match command {
        Command::Swipe {
            direction,
            container,
        } => ActionType::Swipe {
            direction: direction.clone(),
            container: container.as_deref().map(wheel),
        },
        Command::Tap {
            selector,
            label,
            element_type,
        } => ActionType::Tap {
            selector: selector.clone(),
            by_label: *label,
            element_type: element_type.clone(),
        },
        Command::ScrollTo {
            container,
            text,
            backward,
            tap,
        } => ActionType::ScrollTo {
            container: wheel(container),
            items: ItemLocator::any(),
            text: text.clone(),
            direction: if *backward {
                ScrollIntent::Backward
            } else {
                ScrollIntent::Forward
            },
            tap: *tap,
        },
        Command::Select {
            container,
            value,
            choices,
        } => ActionType::SelectValue {
            container: wheel(container),
            items: ItemLocator::any(),
            value: value.clone(),
            choices: choices.clone(),
        },
        Command::SelectDate {
            day,
            month,
            year,
            date,
        } => ActionType::SelectDate {
            day: wheel(day),
            month: wheel(month),
            year: wheel(year),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                CliError::InvalidInput(format!("'{}' is not a YYYY-MM-DD date: {}", date, e))
            })?,
        },
        Command::SelectTime { hour, minute, time } => ActionType::SelectTime {
            hour: wheel(hour),
            minute: wheel(minute),
            time: NaiveTime::parse_from_str(time, "%H:%M").map_err(|e| {
                CliError::InvalidInput(format!("'{}' is not an HH:MM time: {}", time, e))
            })?,
        },
        Command::Config { .. } => {
            return Err(CliError::InvalidInput("config is not an action".to_string()))
        }
    };
    Ok(action)
}

fn print_result(result: &ExecutionResult, format: OutputFormat) {
    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "success": result.success,
            "message": result.message,
            "data": result
                .data
                .as_ref()
                .and_then(|d| serde_json::from_str::<serde_json::Value>(d).ok()),
        });
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else if result.success {
        println!("{}", result.message);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = effective_config(&cli);

    if let Command::Config { save } = cli.command {
        if save {
            config.save().map_err(|e| {
                CliError::ActionFailed(format!(
                    "cannot write {}: {}",
                    SeekConfig::path().display(),
                    e
                ))
            })?;
            tracing::info!(path = %SeekConfig::path().display(), "config saved");
        }
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| CliError::InvalidInput(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let action = build_action(&cli.command)?;

    let executor = ActionExecutor::from_config_connected(&config.driver_config())
        .await
        .map_err(|e| {
            if e.is_connection_error() {
                CliError::Connection(format!(
                    "{}:{}: {}",
                    config.agent_host, config.agent_port, e
                ))
            } else {
                CliError::ActionFailed(e.to_string())
            }
        })?
        .with_search_config(config.search_config());

    tracing::info!(action = action.name(), "executing");
    let result = executor.execute(action).await;
    print_result(&result, cli.format);

    if result.success {
        Ok(())
    } else {
        Err(CliError::ActionFailed(result.message))
    }
}
