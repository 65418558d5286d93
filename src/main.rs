use std::{env, fs::File, io::stdout, path::PathBuf};

use anyhow::{Context, Result, bail};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{LevelFilter, WriteLogger};

use handbook::api::HttpHandbookApi;
use handbook::config::Config;
use handbook::event_source::KeyboardEventSource;
use handbook::panic_handler;
use handbook::{App, run_app_with_event_source};

const USAGE: &str = "Usage: handbook [--config <path>] [--api <url>]";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    api: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => parsed.config = Some(args.next().context(USAGE)?.into()),
            "--api" => parsed.api = Some(args.next().context(USAGE)?),
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("Unknown argument '{other}'\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let (config, config_error) = Config::load_or_default(args.config.as_deref());

    WriteLogger::init(
        LevelFilter::Debug,
        simplelog::ConfigBuilder::new()
            .set_max_level(LevelFilter::Debug)
            .add_filter_ignore_str("html5ever")
            .build(),
        File::create(&config.log_file)
            .with_context(|| format!("Failed to create log file {}", config.log_file))?,
    )?;
    if let Some(e) = config_error {
        error!("{e:#}; using default configuration");
    }

    let config = config.with_env_overrides().with_api_override(args.api);
    info!("Starting handbook reader against {}", config.api_base_url);

    let api = HttpHandbookApi::new(&config.api_base_url, config.request_timeout())?;

    panic_handler::initialize_panic_handler();

    enable_raw_mode().map_err(|e| {
        error!("Failed to enable raw mode: {e}");
        anyhow::anyhow!(
            "Failed to initialize terminal: {e}\n\
             Make sure you are running handbook in a terminal, not from a pipe or redirection."
        )
    })?;
    let mut stdout = stdout();

    execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|e| {
        error!("Failed to setup terminal: {e}");
        let _ = disable_raw_mode();
        anyhow::anyhow!("Failed to setup terminal: {e}")
    })?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = match App::new(api, &config) {
        Ok(mut app) => {
            let mut event_source = KeyboardEventSource;
            run_app_with_event_source(&mut terminal, &mut app, &mut event_source)
        }
        Err(e) => Err(e.into()),
    };

    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    );
    let _ = terminal.show_cursor();

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down handbook reader");
    Ok(())
}
