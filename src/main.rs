use std::io::Write;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use folio::assistant::{ChatSession, ERROR_REPLY, Speaker, UNAVAILABLE_REPLY};
use folio::cache::{CachedList, ListState};
use folio::config::{Config, DEFAULT_CONFIG_PATH};
use folio::logger::{self, LogConfig};
use folio::render::{self, ResumeView, ViewState};
use folio::routes::Route;
use folio::site::Site;

#[derive(Parser, Debug)]
#[command(author, version, about = "Personal portfolio in the terminal", long_about = None)]
struct Args {
    /// Path to the YAML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// SQLite file for cached feed snapshots (overrides the config)
    #[arg(long)]
    store: Option<String>,

    /// Console log level: off, error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<String>,

    /// API key for the assistant
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resume: intro, skills, principles, work history
    Resume {
        /// Highlight the skills used at this company
        #[arg(long)]
        highlight: Option<String>,
        /// Show one skill's description and the roles that used it
        #[arg(long)]
        skill: Option<String>,
    },
    /// Articles from the writing feed
    Writing {
        /// Only show titles containing this text
        #[arg(short, long)]
        search: Option<String>,
        /// Print share links under each article
        #[arg(long)]
        share: bool,
    },
    /// Podcast show links and episodes
    Podcast {
        /// Expand the episode with this link
        #[arg(short, long)]
        expand: Vec<String>,
        /// Expand every episode
        #[arg(long)]
        expand_all: bool,
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Ways to get in touch
    Connect,
    /// Render the view at a site path, e.g. `/writing` or `#/podcast`
    Open { path: String },
    /// Ask the assistant one question
    Ask { message: String },
    /// Talk to the assistant interactively
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(store) = args.store {
        config.store_path = Some(store);
    }
    if let Some(level) = args.log_level {
        config.log.console_level = level;
    }
    if let Some(file) = args.log_file {
        config.log.file = Some(file);
    }
    logger::init(LogConfig::from(&config.log))?;
    debug!("Using config {:?}", config);

    let site = Site::open(config).await?;
    let api_key = args.api_key.as_deref();

    match args.command {
        Command::Resume { highlight, skill } => {
            let view = ResumeView {
                highlight_company: highlight,
                selected_skill: skill,
            };
            println!("{}", render::render_resume(&site.profile, &view));
        }
        Command::Writing { search, share } => {
            let view = ViewState {
                query: search.unwrap_or_default(),
                show_share: share,
                ..Default::default()
            };
            show_writing(&site, &view).await;
        }
        Command::Podcast {
            expand,
            expand_all,
            search,
        } => {
            let view = ViewState {
                query: search.unwrap_or_default(),
                expanded: expand.into_iter().collect(),
                expand_all,
                show_share: false,
            };
            show_podcast(&site, &view).await;
        }
        Command::Connect => println!("{}", render::render_connect(&site.profile)),
        Command::Open { path } => {
            let route: Route = path.parse()?;
            info!("Opening {} ({})", route, route.path());
            println!("{}\n", render::render_nav(site.profile.notes_url.as_deref()));
            match route {
                Route::Resume => println!("{}", render::render_resume(&site.profile, &ResumeView::default())),
                Route::Writing => show_writing(&site, &ViewState::default()).await,
                Route::Podcast => show_podcast(&site, &ViewState::default()).await,
                Route::Connect => println!("{}", render::render_connect(&site.profile)),
            }
        }
        Command::Ask { message } => {
            let mut session = site.chat(api_key);
            ask(&mut session, &message).await;
        }
        Command::Chat => chat(site.chat(api_key), &site.profile.example_prompts).await?,
    }

    Ok(())
}

/// Print what the view shows on mount, then what it shows once the
/// background refresh settles, if that differs.
async fn show_list<T, F>(list: std::sync::Arc<CachedList<T>>, render: F)
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&ListState<T>) -> String,
{
    let mounted = list.mount().await;
    let initial = mounted.current();
    println!("{}", render(&initial));

    let settled = mounted.settled().await;
    if settled != initial {
        println!("{}", "-".repeat(40));
        println!("{}", render(&settled));
    }
}

async fn show_writing(site: &Site, view: &ViewState) {
    show_list(site.writing(), |state| render::render_writing(state, view, &site.profile)).await;
}

async fn show_podcast(site: &Site, view: &ViewState) {
    show_list(site.podcast(), |state| render::render_podcast(state, view, &site.profile)).await;
}

async fn ask(session: &mut ChatSession, message: &str) {
    let mut streamed = false;
    let reply = session
        .send(message, |chunk| {
            streamed = true;
            print!("{}", chunk);
            let _ = std::io::stdout().flush();
        })
        .await
        .cloned();

    if streamed {
        println!();
    }
    match reply {
        // The fallback apology is never streamed.
        Some(reply) if !streamed || reply.text == ERROR_REPLY => println!("{}", reply.text),
        Some(_) => {}
        None if !session.is_available() => println!("{}", UNAVAILABLE_REPLY),
        None => {}
    }
}

async fn chat(mut session: ChatSession, example_prompts: &[String]) -> Result<()> {
    for message in session.transcript() {
        println!("assistant> {}", message.text);
    }
    if !session.is_available() {
        return Ok(());
    }
    for prompt in example_prompts {
        println!("  try: {}", prompt);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "exit" | "quit" => break,
            "" => continue,
            _ => {}
        }
        print!("assistant> ");
        ask(&mut session, &line).await;
    }

    let turns = session
        .transcript()
        .iter()
        .filter(|message| message.role == Speaker::User)
        .count();
    info!("Chat ended after {} questions", turns);
    Ok(())
}
