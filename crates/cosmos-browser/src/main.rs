use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use cosmos_browser::Result;
use cosmos_browser::api::{HttpApi, SpaceApi};
use cosmos_browser::input::{InputError, Rover};
use cosmos_browser::logging::LogFormat;
use cosmos_browser::pipeline::{self, Request};
use cosmos_browser::render;
use cosmos_browser::session::{Mode, ViewState};
use cosmos_browser::status::StatusLine;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Config file (defaults to ./cosmos.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search the NASA image library
    Search {
        /// Free-text query (words are joined with spaces)
        query: Vec<String>,
        /// Also write the result grid as an HTML page
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Browse Mars rover photos
    Rover {
        /// Curiosity, Perseverance, Opportunity or Spirit (config default when omitted)
        rover: Option<Rover>,
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Near-Earth asteroids approaching within a date range (7 days max)
    Asteroids {
        /// YYYY-MM-DD
        #[arg(long, default_value = "")]
        start: String,
        /// YYYY-MM-DD
        #[arg(long, default_value = "")]
        end: String,
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Interactive terminal UI with search, rover and asteroid panels
    Tui,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let settings = cosmos_browser::config::load_settings(args.config.as_deref())?;

    match args.cmd {
        Command::Tui => cosmos_browser::logging::init_file(
            args.log_format,
            &settings.log.tui_log_path(),
        )?,
        _ => cosmos_browser::logging::init_stderr(args.log_format)?,
    }
    if settings.uses_demo_key() {
        warn!(
            "no NASA_API_KEY configured; using the shared {} (heavily rate limited)",
            cosmos_browser::config::DEMO_API_KEY
        );
    }

    let api = Arc::new(HttpApi::new(&settings.api)?);
    match args.cmd {
        Command::Search { query, html } => {
            let parsed = Request::search(&query.join(" "));
            cmd_oneshot(api.as_ref(), Mode::Search, parsed, html.as_deref())
        }
        Command::Rover { rover, html } => {
            let rover = rover.unwrap_or(settings.ui.default_rover);
            cmd_oneshot(api.as_ref(), Mode::Rover, Ok(Request::Rover(rover)), html.as_deref())
        }
        Command::Asteroids { start, end, html } => {
            let parsed = Request::asteroids(&start, &end);
            cmd_oneshot(api.as_ref(), Mode::Asteroids, parsed, html.as_deref())
        }
        Command::Tui => cosmos_browser::ui::run_tui(api, &settings),
    }
}

fn cmd_oneshot(
    api: &dyn SpaceApi,
    mode: Mode,
    parsed: std::result::Result<Request, InputError>,
    html: Option<&Path>,
) -> Result<()> {
    let mut view = ViewState::new(mode);
    match parsed {
        Err(e) => view.report_invalid(e),
        Ok(request) => {
            let ticket = view.begin(request.mode(), request.query());
            eprintln!("{}", view.status);
            let outcome = pipeline::run(api, &request);
            view.apply(ticket, outcome);
        }
    }

    println!("{}", view.status);
    for (i, card) in view.cards.iter().enumerate() {
        print!("{}", render::card_text(i, card));
    }

    if let Some(path) = html {
        let page = render::page_html(&format!("NASA {}", mode.title()), &view);
        std::fs::write(path, page).map_err(|e| {
            cosmos_browser::Error::msg(format!("failed to write {}: {e}", path.display()))
        })?;
        eprintln!("wrote {}", path.display());
    }

    match view.status {
        StatusLine::Invalid(_) => std::process::exit(2),
        StatusLine::Failed(_) => std::process::exit(1),
        _ => Ok(()),
    }
}
