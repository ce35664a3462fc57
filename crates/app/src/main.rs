mod demo;

use std::fmt;

use learn_core::model::UserId;
use learn_core::recommend::RecommendationSettings;
use serde::Serialize;
use services::{AppServices, Clock};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://dashboard.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str, command: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag, command } => {
                write!(f, "{command} requires {flag}")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- progress  [--db <sqlite_url>] [--user <id>]");
    eprintln!(
        "  cargo run -p app -- submit    --subject <name> --completed <n> --total <n> [--db <sqlite_url>] [--user <id>]"
    );
    eprintln!(
        "  cargo run -p app -- recommend [--max <n>] [--threshold <percent>] [--db <sqlite_url>] [--user <id>]"
    );
    eprintln!("  cargo run -p app -- quiz      --answers <i,j,k> [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- analytics [--db <sqlite_url>] [--user <id>]");
    eprintln!("  cargo run -p app -- seed      [--db <sqlite_url>] [--user <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!("  --user 1");
    eprintln!(
        "  --max {}, --threshold {}",
        RecommendationSettings::DEFAULT_MAX_COUNT,
        RecommendationSettings::DEFAULT_ATTENTION_THRESHOLD
    );
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DASHBOARD_DB_URL, DASHBOARD_USER_ID, DASHBOARD_ATTENTION_THRESHOLD, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Progress,
    Submit,
    Recommend,
    Quiz,
    Analytics,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "progress" => Some(Self::Progress),
            "submit" => Some(Self::Submit),
            "recommend" => Some(Self::Recommend),
            "quiz" => Some(Self::Quiz),
            "analytics" => Some(Self::Analytics),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Submit => "submit",
            Self::Recommend => "recommend",
            Self::Quiz => "quiz",
            Self::Analytics => "analytics",
            Self::Seed => "seed",
        }
    }
}

/// Values picked up from the environment before flags are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Defaults {
    db_url: String,
    user_id: UserId,
    threshold: u8,
}

impl Defaults {
    fn from_env() -> Self {
        Self {
            db_url: std::env::var("DASHBOARD_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url),
            user_id: std::env::var("DASHBOARD_USER_ID")
                .ok()
                .and_then(|value| value.parse::<UserId>().ok())
                .unwrap_or(UserId::new(1)),
            threshold: std::env::var("DASHBOARD_ATTENTION_THRESHOLD")
                .ok()
                .and_then(|value| value.trim().parse::<u8>().ok())
                .unwrap_or(RecommendationSettings::DEFAULT_ATTENTION_THRESHOLD),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SubmitArgs {
    subject: String,
    completed: u32,
    total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    db_url: String,
    user_id: UserId,
    threshold: u8,
    max: usize,
    submit: Option<SubmitArgs>,
    answers: Vec<usize>,
}

impl Args {
    fn parse(
        command: Command,
        args: &mut impl Iterator<Item = String>,
        defaults: Defaults,
    ) -> Result<Self, ArgsError> {
        let Defaults {
            mut db_url,
            mut user_id,
            mut threshold,
        } = defaults;
        let mut max = RecommendationSettings::DEFAULT_MAX_COUNT;
        let mut subject = None;
        let mut completed = None;
        let mut total = None;
        let mut answers = None;

        while let Some(arg) = args.next() {
            match (command, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                (_, "--user") => {
                    let value = require_value(args, "--user")?;
                    user_id = parse_number(value, "--user")?;
                }
                (Command::Submit, "--subject") => {
                    subject = Some(require_value(args, "--subject")?);
                }
                (Command::Submit, "--completed") => {
                    let value = require_value(args, "--completed")?;
                    completed = Some(parse_number(value, "--completed")?);
                }
                (Command::Submit, "--total") => {
                    let value = require_value(args, "--total")?;
                    total = Some(parse_number(value, "--total")?);
                }
                (Command::Recommend, "--max") => {
                    let value = require_value(args, "--max")?;
                    max = parse_number(value, "--max")?;
                }
                (Command::Recommend, "--threshold") => {
                    let value = require_value(args, "--threshold")?;
                    threshold = parse_number(value, "--threshold")?;
                }
                (Command::Quiz, "--answers") => {
                    let value = require_value(args, "--answers")?;
                    answers = Some(parse_answers(&value)?);
                }
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let missing = |flag| ArgsError::MissingFlag {
            flag,
            command: command.name(),
        };
        let submit = if command == Command::Submit {
            Some(SubmitArgs {
                subject: subject.ok_or_else(|| missing("--subject"))?,
                completed: completed.ok_or_else(|| missing("--completed"))?,
                total: total.ok_or_else(|| missing("--total"))?,
            })
        } else {
            None
        };
        let answers = match (command, answers) {
            (Command::Quiz, None) => return Err(missing("--answers")),
            (_, answers) => answers.unwrap_or_default(),
        };

        Ok(Self {
            command,
            db_url,
            user_id,
            threshold,
            max,
            submit,
            answers,
        })
    }
}

fn parse_answers(raw: &str) -> Result<Vec<usize>, ArgsError> {
    raw.split(',')
        .map(|part| parse_number(part.to_owned(), "--answers"))
        .collect()
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn emit<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Err(
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing subcommand").into(),
            );
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(cmd, &mut argv, Defaults::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let settings = RecommendationSettings::new(parsed.threshold, parsed.max)?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system(), settings).await?;
    tracing::debug!(db = %parsed.db_url, user = %parsed.user_id, command = cmd.name(), "storage ready");

    let user = parsed.user_id;
    match parsed.command {
        Command::Progress => emit(&app.progress().stats_with_trend(user).await?),
        Command::Submit => {
            let submit = parsed.submit.as_ref().ok_or(ArgsError::MissingFlag {
                flag: "--subject",
                command: parsed.command.name(),
            })?;
            let stats = app
                .progress()
                .submit(user, &submit.subject, submit.completed, submit.total)
                .await?;
            emit(&stats)
        }
        Command::Recommend => emit(&app.recommendations().recommend(user).await?),
        Command::Quiz => {
            let quizzes = app.quizzes();
            let mut session = quizzes.start(demo::algebra_quiz())?;
            for &selected in &parsed.answers {
                quizzes.answer_current(&mut session, selected)?;
            }
            emit(&quizzes.finish(session, user).await?)
        }
        Command::Analytics => emit(&app.analytics().overview(user).await?),
        Command::Seed => {
            let progress = app.progress();
            let mut stats = Vec::new();
            for (subject, completed, total) in demo::SEED_PROGRESS {
                stats = progress.submit(user, subject, completed, total).await?;
            }
            emit(&stats)
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Defaults {
        Defaults {
            db_url: "sqlite::memory:".into(),
            user_id: UserId::new(1),
            threshold: 80,
        }
    }

    fn parse(command: Command, raw: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = raw.iter().map(|s| (*s).to_owned());
        Args::parse(command, &mut iter, defaults())
    }

    #[test]
    fn submit_requires_all_counts() {
        let args = parse(
            Command::Submit,
            &["--subject", "Физика", "--completed", "35", "--total", "40", "--user", "7"],
        )
        .unwrap();
        assert_eq!(args.user_id, UserId::new(7));
        assert_eq!(
            args.submit,
            Some(SubmitArgs {
                subject: "Физика".into(),
                completed: 35,
                total: 40,
            })
        );

        let err = parse(Command::Submit, &["--subject", "Физика", "--total", "40"]).unwrap_err();
        assert!(matches!(
            err,
            ArgsError::MissingFlag {
                flag: "--completed",
                ..
            }
        ));
    }

    #[test]
    fn quiz_answers_are_comma_separated() {
        let args = parse(Command::Quiz, &["--answers", "0, 1,0"]).unwrap();
        assert_eq!(args.answers, vec![0, 1, 0]);

        assert!(matches!(
            parse(Command::Quiz, &["--answers", "0,x"]).unwrap_err(),
            ArgsError::InvalidNumber { flag: "--answers", .. }
        ));
        assert!(matches!(
            parse(Command::Quiz, &[]).unwrap_err(),
            ArgsError::MissingFlag { flag: "--answers", .. }
        ));
    }

    #[test]
    fn flags_are_scoped_to_their_command() {
        let args = parse(Command::Recommend, &["--max", "2", "--threshold", "60"]).unwrap();
        assert_eq!(args.max, 2);
        assert_eq!(args.threshold, 60);

        assert!(matches!(
            parse(Command::Progress, &["--max", "2"]).unwrap_err(),
            ArgsError::UnknownArg(arg) if arg == "--max"
        ));
    }

    #[test]
    fn defaults_apply_without_flags() {
        let args = parse(Command::Analytics, &[]).unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.user_id, UserId::new(1));
        assert_eq!(args.max, RecommendationSettings::DEFAULT_MAX_COUNT);
        assert!(args.submit.is_none());
    }

    #[test]
    fn sqlite_urls_are_made_absolute() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/dash.db".into()),
            "sqlite:///tmp/dash.db"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:/tmp/dash.db".into()),
            "sqlite:///tmp/dash.db"
        );
    }
}
