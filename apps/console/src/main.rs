use std::{io::Write as _, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CannedResponder, ConversationSession, ResponseGenerator, Route, SearchOutcome, SearchSession,
    SendOutcome, QUICK_SEARCHES,
};
use shared::domain::{ConversationId, Mode, SettingsPatch};
use storage::{JsonFileStore, Repositories, SeedSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "console", about = "Chat and product search over the mock backend")]
struct Cli {
    /// TOML config file; defaults to ./console.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat. Type /help for commands.
    Chat {
        #[arg(long)]
        mode: Option<Mode>,
        #[arg(long)]
        open: Option<i64>,
    },
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    History {
        #[arg(long)]
        clear: bool,
    },
    Products {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        popular: Option<usize>,
    },
    Templates {
        #[arg(long)]
        category: Option<String>,
    },
    Settings {
        #[arg(long)]
        mode: Option<Mode>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        reset: bool,
    },
    /// Shows what a URL path maps to.
    Route { path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    init_tracing(&settings.log_filter);

    if let Command::Route { path } = &cli.command {
        describe_route(path);
        return Ok(());
    }

    let snapshot = match &settings.seed_dir {
        Some(dir) => SeedSnapshot::from_dir(dir)?,
        None => SeedSnapshot::bundled()?,
    };
    let repos = snapshot.load(settings.latency_scale);
    info!(
        conversations = snapshot.conversations.len(),
        products = snapshot.products.len(),
        templates = snapshot.templates.len(),
        "repositories seeded"
    );

    match cli.command {
        Command::Chat { mode, open } => run_chat(&repos, &settings, mode, open).await?,
        Command::Search { query } => {
            let session = search_session(&repos, &settings)?;
            run_search(&session, &query.join(" ")).await?;
        }
        Command::History { clear } => {
            let session = search_session(&repos, &settings)?;
            if clear {
                session.clear_history().await?;
                println!("search history cleared");
            } else {
                let history = session.history().await;
                if history.is_empty() {
                    println!("no recent searches; try: {}", QUICK_SEARCHES.join(", "));
                }
                for (n, query) in history.iter().enumerate() {
                    println!("{:>2}. {query}", n + 1);
                }
            }
        }
        Command::Products { category, popular } => {
            let session = search_session(&repos, &settings)?;
            let products = match (category, popular) {
                (Some(category), _) => session.products_in_category(&category).await?,
                (None, limit) => session.popular_products(limit.unwrap_or(10)).await?,
            };
            for product in &products {
                println!("{}", render::product(product));
            }
        }
        Command::Templates { category } => {
            let templates = match category {
                Some(category) => repos.templates.by_category(&category).await?,
                None => repos.templates.get_all().await?,
            };
            for template in &templates {
                println!("{}", render::template(template));
            }
        }
        Command::Settings {
            mode,
            language,
            reset,
        } => {
            let current = if reset {
                repos.settings.reset().await?
            } else if mode.is_some() || language.is_some() {
                let patch = SettingsPatch {
                    default_mode: mode,
                    language,
                    ..SettingsPatch::default()
                };
                repos.settings.update(patch).await?
            } else {
                repos.settings.get().await?
            };
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        Command::Route { .. } => {}
    }

    Ok(())
}

fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn describe_route(path: &str) {
    let Some(route) = Route::parse(path) else {
        println!("unknown route '{path}'");
        return;
    };
    let target = match &route {
        Route::Chat(None) => "new conversation".to_string(),
        Route::Chat(Some(id)) => format!("conversation #{id}"),
        Route::Search(None) => "empty product search".to_string(),
        Route::Search(Some(query)) => format!("product search for '{query}'"),
    };
    println!("{target} (canonical path {})", route.to_path());
}

fn search_session(repos: &Repositories, settings: &Settings) -> Result<SearchSession> {
    let store = JsonFileStore::open(&settings.history_path).with_context(|| {
        format!(
            "failed to open history store '{}'",
            settings.history_path.display()
        )
    })?;
    Ok(SearchSession::new(
        Arc::clone(&repos.products),
        Arc::new(store),
        settings.session_config(),
    ))
}

async fn run_search(session: &SearchSession, query: &str) -> Result<()> {
    match session.submit(query).await? {
        SearchOutcome::Cleared => println!("empty query; try: {}", QUICK_SEARCHES.join(", ")),
        SearchOutcome::Completed { result_count: 0 } => println!("no products match '{query}'"),
        SearchOutcome::Completed { result_count } => {
            println!("{result_count} products match '{}'", query.trim());
            for product in session.snapshot().await.results {
                println!("{}", render::product(&product));
            }
        }
    }
    Ok(())
}

async fn run_chat(
    repos: &Repositories,
    settings: &Settings,
    mode: Option<Mode>,
    open: Option<i64>,
) -> Result<()> {
    let responder: Arc<dyn ResponseGenerator> = match settings.rng_seed {
        Some(seed) => Arc::new(CannedResponder::seeded(seed)),
        None => Arc::new(CannedResponder::new()),
    };
    let session = ConversationSession::new(
        Arc::clone(&repos.conversations),
        responder,
        settings.session_config(),
    );

    let default_mode = repos.settings.get().await?.default_mode;
    let mode = start_chat(&session, open.map(ConversationId), mode, default_mode).await?;
    println!("mode: {} (type /help for commands)", mode.label());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let Some(command) = line.trim().strip_prefix('/') else {
            send(&session, &line).await;
            continue;
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(name, arg)| (name, arg.trim()))
            .unwrap_or((command, ""));

        match name {
            "quit" | "exit" => break,
            "help" => println!(
                "/new  /open <id>  /list [filter]  /delete <id>  /mode <general|coding|creative|analysis>  /retry  /quit"
            ),
            "new" => {
                session.new_conversation().await;
                println!("new conversation");
            }
            "open" => match arg.parse::<i64>() {
                Ok(id) => {
                    open_conversation(&session, ConversationId(id)).await;
                }
                Err(_) => println!("usage: /open <id>"),
            },
            "list" => {
                let filter = (!arg.is_empty()).then_some(arg);
                match session.list_conversations(filter).await {
                    Ok(conversations) => {
                        for c in conversations {
                            println!(
                                "#{:<3} {:<50} {} messages, {}",
                                c.id,
                                c.title,
                                c.messages.len(),
                                c.updated_at.format("%Y-%m-%d %H:%M")
                            );
                        }
                    }
                    Err(err) => println!("! {err}"),
                }
            }
            "delete" => match arg.parse::<i64>() {
                Ok(id) => match session.delete_conversation(ConversationId(id)).await {
                    Ok(true) => println!("deleted #{id}"),
                    Ok(false) => println!("no conversation #{id}"),
                    Err(err) => println!("! {err}"),
                },
                Err(_) => println!("usage: /delete <id>"),
            },
            "mode" => match arg.parse::<Mode>() {
                Ok(mode) => match session.set_mode(mode).await {
                    Ok(()) => println!("mode: {}", mode.label()),
                    Err(err) => println!("! {err}"),
                },
                Err(err) => println!("! {err}"),
            },
            "retry" => match session.retry().await {
                Ok(Some(conversation)) => print_conversation(&conversation.title, &session).await,
                Ok(None) => println!("! conversation still not found"),
                Err(err) => println!("! {err}"),
            },
            other => println!("unknown command /{other}"),
        }
    }

    session.await_reply().await;
    Ok(())
}

/// Opens or starts the first conversation and settles its mode. An opened
/// conversation keeps its stored mode unless `--mode` was given.
async fn start_chat(
    session: &ConversationSession,
    open: Option<ConversationId>,
    explicit: Option<Mode>,
    default_mode: Mode,
) -> Result<Mode> {
    let opened = match open {
        Some(id) => open_conversation(session, id).await,
        None => {
            session.new_conversation().await;
            false
        }
    };
    let mode = match (explicit, opened) {
        (Some(mode), _) => Some(mode),
        (None, true) => None,
        (None, false) => Some(default_mode),
    };
    if let Some(mode) = mode {
        session.set_mode(mode).await?;
    }
    Ok(session.snapshot().await.mode)
}

/// Returns whether the conversation was loaded.
async fn open_conversation(session: &ConversationSession, id: ConversationId) -> bool {
    match session.select_conversation(id).await {
        Ok(Some(conversation)) => {
            print_conversation(&conversation.title, session).await;
            true
        }
        Ok(None) => {
            println!("! conversation #{id} not found (/retry to try again)");
            false
        }
        Err(err) => {
            println!("! {err} (/retry to try again)");
            false
        }
    }
}

async fn print_conversation(title: &str, session: &ConversationSession) {
    println!("== {title} ==");
    for message in session.snapshot().await.messages {
        println!("{}\n", render::message(&message));
    }
}

async fn send(session: &Arc<ConversationSession>, text: &str) {
    match session.send_message(text).await {
        Ok(SendOutcome::Ignored) => {}
        Ok(SendOutcome::Sent {
            conversation_id,
            created,
        }) => {
            if created {
                println!("(started conversation #{conversation_id})");
            }
            println!("assistant is typing...");
            session.await_reply().await;

            let view = session.snapshot().await;
            match (&view.error, view.messages.last()) {
                (Some(failure), _) => println!("! {}", failure.message),
                (None, Some(last)) if !last.is_user() => println!("{}", render::message(last)),
                _ => {}
            }
        }
        Err(err) => println!("! {err}"),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
