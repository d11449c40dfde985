//! Novelist 命令行

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use novelist::application::observers::{drain_until_terminal, ChannelObserver};
use novelist::application::ports::{
    AuthPort, ChapterWriteRequest, EventSinkPort, PreferenceStorePort, TokenStorePort,
    TransportPort,
};
use novelist::application::{AuthService, BackendPorts, Library};
use novelist::config::{load_config_from_path, print_config, AppConfig};
use novelist::domain::generation::{AgentEvent, StatusUpdate, StreamOutcome};
use novelist::infrastructure::adapters::{
    build_backend, HttpAuthApi, ReqwestTransport, ReqwestTransportConfig,
};
use novelist::infrastructure::events::EventPublisher;
use novelist::infrastructure::http::{ApiClient, RefreshCoordinator};
use novelist::infrastructure::persistence::SledLocalStore;

#[derive(Parser)]
#[command(name = "novelist", version, about = "Client for the novel-writing backend")]
struct Cli {
    /// Config file (defaults to novelist.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session locally
    Login { username: String, password: String },
    /// List novels and their running tasks
    Novels,
    /// List active tasks of a novel
    Tasks { novel_id: String },
    /// Follow a task until it finishes
    Watch { task_id: String },
    /// Stream AI writing of a chapter
    Write { novel_id: String, chapter_id: String },
}

struct App {
    auth: AuthService,
    ports: BackendPorts,
    store: Arc<SledLocalStore>,
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},novelist={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    // 标准输出留给命令结果
    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn build_app(config: &AppConfig) -> anyhow::Result<App> {
    std::fs::create_dir_all(&config.storage.state_dir)
        .with_context(|| format!("creating {}", config.storage.state_dir.display()))?;
    let store = SledLocalStore::open(config.storage.sled_path())?.arc();
    let tokens: Arc<dyn TokenStorePort> = store.clone();
    let preferences: Arc<dyn PreferenceStorePort> = store.clone();

    let transport: Arc<dyn TransportPort> = Arc::new(ReqwestTransport::new(
        ReqwestTransportConfig::from(&config.api),
    )?);

    let events: Arc<dyn EventSinkPort> = Arc::new(EventPublisher::new());
    let refresher = Arc::new(
        RefreshCoordinator::new(transport.clone(), tokens.clone())
            .with_preferences(preferences.clone())
            .with_events(events.clone()),
    );
    refresher.on_session_expired(|| {
        tracing::warn!("Session expired, run `novelist login` again");
    });

    let client = ApiClient::new(transport, refresher);
    let auth_port: Arc<dyn AuthPort> = Arc::new(HttpAuthApi::new(client.clone()));
    let ports = build_backend(client, &config.polling, events);

    Ok(App {
        auth: AuthService::new(auth_port, tokens, preferences),
        ports,
        store,
    })
}

async fn run(app: &App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => {
            let user = app.auth.login(&username, &password).await?;
            println!("logged in as {} ({})", user.username, user.id);
        }
        Command::Novels => {
            let library = Library::new(app.ports.clone());
            let novels = library.refresh().await?;
            let running = library.active_tasks().await;
            for novel in novels {
                println!("{}\t{}\t{}", novel.id, novel.title, novel.genre);
                for task in running.iter().filter(|t| t.novel_id == novel.id) {
                    println!(
                        "  running: {} {} {}%",
                        task.id,
                        task.kind.as_str(),
                        task.progress
                    );
                }
            }
        }
        Command::Tasks { novel_id } => {
            let tasks = app.ports.generation.list_active_tasks(&novel_id).await?;
            if tasks.is_empty() {
                println!("no active tasks");
            }
            for task in tasks {
                println!(
                    "{}\t{}\t{}\t{}%\t{}",
                    task.id,
                    task.kind.as_str(),
                    task.status.as_str(),
                    task.progress,
                    task.progress_message.unwrap_or_default()
                );
            }
        }
        Command::Watch { task_id } => {
            let (observer, rx) = ChannelObserver::new();
            app.ports.watcher.watch(&task_id, observer);
            let task = drain_until_terminal(&task_id, rx, |task| {
                println!(
                    "{}% {}",
                    task.progress,
                    task.progress_message.as_deref().unwrap_or("")
                );
            })
            .await?;
            println!("completed: {}", task.id);
        }
        Command::Write {
            novel_id,
            chapter_id,
        } => {
            write_chapter(app, &novel_id, &chapter_id).await?;
        }
    }
    Ok(())
}

async fn write_chapter(app: &App, novel_id: &str, chapter_id: &str) -> anyhow::Result<()> {
    let library = Library::new(app.ports.clone());
    let workspace = library.open(novel_id).await?;

    let request = ChapterWriteRequest {
        options: app.auth.generation_options()?,
        max_attempts: None,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut current_stage = String::new();
    let report = workspace
        .editor()
        .write_chapter_to_end(chapter_id, &request, &cancel, |event, _| match event {
            AgentEvent::Chunk { stage, text } => {
                if *stage != current_stage {
                    println!("\n== {} ==", stage);
                    current_stage = stage.clone();
                }
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            AgentEvent::StageOutput { stage, text } => {
                println!("\n== {} ==\n{}", stage, text);
                current_stage = stage.clone();
            }
            AgentEvent::Status(StatusUpdate::Progress {
                stage,
                attempt,
                max_attempts,
                retrying,
                message,
            }) => {
                tracing::info!(
                    stage = stage.as_deref().unwrap_or("-"),
                    attempt = ?attempt,
                    max_attempts = ?max_attempts,
                    retrying = *retrying,
                    message = message.as_deref().unwrap_or(""),
                    "Pipeline status"
                );
            }
            _ => {}
        })
        .await?;

    println!();
    match report.outcome {
        StreamOutcome::Done { score } => match score {
            Some(score) => println!("done (score {:.1})", score),
            None => println!("done"),
        },
        StreamOutcome::Failed { message } => bail!("writing failed: {}", message),
        StreamOutcome::Cancelled => println!("cancelled"),
        StreamOutcome::Ended => println!("stream ended without a result"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow!("Failed to load config: {}", e))?;
    init_tracing(&config);
    print_config(&config);

    let app = build_app(&config)?;
    let result = run(&app, cli.command).await;

    app.store.flush()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["novelist", "write", "n1", "c7"]).unwrap();
        assert!(cli.config.is_none());
        assert!(matches!(
            cli.command,
            Command::Write { novel_id, chapter_id } if novel_id == "n1" && chapter_id == "c7"
        ));

        let cli =
            Cli::try_parse_from(["novelist", "tasks", "n2", "--config", "alt.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Command::Tasks { novel_id } if novel_id == "n2"));
    }

    #[test]
    fn test_cli_rejects_missing_arguments() {
        assert!(Cli::try_parse_from(["novelist", "login", "mira"]).is_err());
        assert!(Cli::try_parse_from(["novelist", "watch"]).is_err());
        assert!(Cli::try_parse_from(["novelist"]).is_err());
    }
}
