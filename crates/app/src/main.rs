use std::fmt;
use std::sync::Arc;

use course_core::catalog;
use services::{PanelConfig, PanelController, PanelError, PanelIntent, PanelView};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNamespace { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNamespace { raw } => write!(f, "invalid --namespace value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  devbar [show|modules|next|prev]  [--db <sqlite_url>] [--namespace <ns>]");
    eprintln!("  devbar select <module-key>       [--db <sqlite_url>] [--namespace <ns>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://devbar.sqlite3");
    eprintln!("  --namespace project-react");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  DEVBAR_DB_URL, DEVBAR_NAMESPACE, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show,
    Modules,
    Gesture(PanelIntent),
}

struct Args {
    db_url: String,
    config: PanelConfig,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("DEVBAR_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://devbar.sqlite3".into(), normalize_sqlite_url);
        let mut namespace = std::env::var("DEVBAR_NAMESPACE").ok();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--namespace" => {
                    namespace = Some(require_value(args, "--namespace")?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let config = match namespace {
            Some(raw) => PanelConfig::new(raw.clone())
                .map_err(|_| ArgsError::InvalidNamespace { raw })?,
            None => PanelConfig::default(),
        };

        Ok(Self { db_url, config })
    }
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

fn parse_command(argv: &mut Vec<String>) -> Result<Command, ArgsError> {
    let Some(first) = argv.first().cloned() else {
        return Ok(Command::Show);
    };
    if first.starts_with("--") {
        return Ok(Command::Show);
    }
    argv.remove(0);

    match first.as_str() {
        "show" => Ok(Command::Show),
        "modules" => Ok(Command::Modules),
        "next" => Ok(Command::Gesture(PanelIntent::Next)),
        "prev" => Ok(Command::Gesture(PanelIntent::Previous)),
        "select" => {
            if argv.is_empty() || argv[0].starts_with("--") {
                return Err(ArgsError::MissingValue { flag: "select" });
            }
            let key = argv.remove(0);
            Ok(Command::Gesture(PanelIntent::SelectModule(key)))
        }
        _ => Err(ArgsError::UnknownArg(first)),
    }
}

fn print_view(view: &PanelView) {
    let prev = if view.previous_disabled { "-" } else { "<" };
    let next = if view.next_disabled { "-" } else { ">" };
    println!("{} · step {} [{prev} {next}]", view.module, view.step);
    println!("progress: {:.0}%", view.progress_percentage);
    println!("content:  {}", view.content);
    if !view.persistent {
        println!("(progress is not being saved this session)");
    }
}

fn print_modules(view: &PanelView) {
    for item in &view.modules {
        let marker = if item.key == view.module { "*" } else { " " };
        println!("{marker} {} {}", item.key, item.label);
    }
}

/// Run `cmd` against the panel and return the view to print.
///
/// An unknown module key is reported on stderr and leaves the view as it was.
async fn apply(panel: &mut PanelController, cmd: Command) -> Result<PanelView, PanelError> {
    match cmd {
        Command::Show | Command::Modules => panel.view(),
        Command::Gesture(intent) => match panel.dispatch(intent).await {
            Err(PanelError::Navigation(err)) => {
                eprintln!("{err}");
                panel.view()
            }
            other => other,
        },
    }
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

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let parsed = parse_command(&mut argv).and_then(|cmd| {
        let mut iter = argv.into_iter();
        Args::parse(&mut iter).map(|args| (cmd, args))
    });
    let (cmd, args) = parsed.map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    tracing::info!(db = %args.db_url, namespace = args.config.namespace(), "opening panel store");
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    let curriculum = Arc::new(catalog::project_react()?);

    let mut panel = PanelController::bootstrap(curriculum, storage.kv, &args.config).await;

    let list_modules = matches!(
        cmd,
        Command::Modules | Command::Gesture(PanelIntent::SelectModule(_))
    );
    let view = apply(&mut panel, cmd).await?;

    print_view(&view);
    if list_modules {
        println!();
        print_modules(&view);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryStore, KeyValueStore};

    async fn panel(kv: &InMemoryStore) -> PanelController {
        let curriculum = Arc::new(catalog::project_react().unwrap());
        PanelController::bootstrap(curriculum, Arc::new(kv.clone()), &PanelConfig::default()).await
    }

    #[test]
    fn parses_select_with_key() {
        let mut argv = vec!["select".to_string(), "2-advanced".to_string(), "--db".to_string()];
        let cmd = parse_command(&mut argv).unwrap();
        assert_eq!(
            cmd,
            Command::Gesture(PanelIntent::SelectModule("2-advanced".into()))
        );
        assert_eq!(argv, vec!["--db".to_string()]);
    }

    #[test]
    fn select_without_key_is_an_argument_error() {
        let mut argv = vec!["select".to_string()];
        assert!(matches!(
            parse_command(&mut argv),
            Err(ArgsError::MissingValue { flag: "select" })
        ));
    }

    #[tokio::test]
    async fn unknown_module_select_keeps_the_current_view() {
        let kv = InMemoryStore::new();
        let mut panel = panel(&kv).await;
        let _ = panel.next().await;
        let before = panel.view().unwrap();

        let view = apply(
            &mut panel,
            Command::Gesture(PanelIntent::SelectModule("9-missing".into())),
        )
        .await
        .unwrap();

        assert_eq!(view.module, before.module);
        assert_eq!(view.step, 1);
        assert_eq!(
            kv.get("project-react-module").await.unwrap().as_deref(),
            Some("\"0-introduction\"")
        );
    }

    #[tokio::test]
    async fn known_gesture_returns_the_updated_view() {
        let kv = InMemoryStore::new();
        let mut panel = panel(&kv).await;

        let view = apply(&mut panel, Command::Gesture(PanelIntent::Next))
            .await
            .unwrap();
        assert_eq!(view.step, 1);
        assert!(!view.previous_disabled);
    }
}
