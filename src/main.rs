mod app;
mod codec;
mod config;
mod geometry;
mod input;
mod navigator;
mod projection;
mod rank;
mod rating;
mod store;
mod ui;

use app::App;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use geometry::Point;
use input::{AxisSample, InputFrame};
use navigator::NavGeometry;
use projection::Projection;
use ratatui::layout::Rect;
use std::path::{Path, PathBuf};
use std::time::Duration;
use store::{BlockDevice, FileBlockDevice, RecordStore};

/// Point-of-interest browser: scroll a map, rank nearby places, pick one
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a config file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive browser (default)
    Run {
        /// Packed catalog image
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Pack a JSON catalog into a block image
    Pack {
        /// JSON array of {name, lat, lon, rating}
        #[arg(short, long)]
        input: PathBuf,
        /// Output image file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Rank places around a map point without the UI
    Query {
        /// Packed catalog image
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// Map x in pixels (defaults to the start-up cursor)
        #[arg(short)]
        x: Option<i32>,
        /// Map y in pixels (defaults to the start-up cursor)
        #[arg(short)]
        y: Option<i32>,
        /// Minimum rating, 0 to 4
        #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=4))]
        min_rating: u8,
        /// How many entries to print
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

/// How long the control loop waits for input before polling idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run { catalog: None });
    init_logging(matches!(command, Commands::Run { .. }))?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Config::default()
        }),
    };
    config.validate()?;

    match command {
        Commands::Pack { input, output } => {
            if !input.exists() {
                eprintln!("Error: input file not found: {}", input.display());
                std::process::exit(1);
            }
            eprintln!("Packing {} -> {} ...", input.display(), output.display());
            let report = codec::pack(&input, &output)?;
            eprintln!(
                "Done: {} records in {} blocks ({} names truncated).",
                report.records, report.blocks, report.truncated_names
            );
        }
        Commands::Query {
            catalog,
            x,
            y,
            min_rating,
            limit,
        } => {
            let path = catalog.unwrap_or_else(|| config.storage.catalog.clone());
            let mut store = open_store(&path, &config)?;
            let start = NavGeometry::from_config(&config).initial_viewport().focal_point();
            let focal = Point::new(x.unwrap_or(start.x), y.unwrap_or(start.y));

            let mut engine = rank::RankingEngine::with_capacity(store.len());
            let ranked = engine.rank(&mut store, &config.map, focal, min_rating)?.to_vec();
            tracing::info!(block_reads = store.block_reads(), "query complete");
            println!(
                "{} places rated {}+ around ({}, {})",
                ranked.len(),
                min_rating + 1,
                focal.x,
                focal.y
            );
            for (position, candidate) in ranked.iter().take(limit).enumerate() {
                let record = store.fetch(candidate.index)?;
                let at = config.map.project(record.lat, record.lon);
                println!(
                    "{:>4}. {:<5} {:<40} {:>6} px  at ({}, {})",
                    position + 1,
                    ui::stars(record.rating),
                    record.name(),
                    candidate.distance,
                    at.x,
                    at.y
                );
            }
        }
        Commands::Run { catalog } => {
            let path = catalog.unwrap_or_else(|| config.storage.catalog.clone());
            let store = open_store(&path, &config)?;

            let mut app = App::new(config, store);
            app.init();

            // Init terminal
            let mut terminal = ratatui::init();
            crossterm::execute!(std::io::stdout(), EnableMouseCapture)?;

            // Main loop
            let result = run_app(&mut terminal, &mut app);

            // Restore terminal
            let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
            ratatui::restore();

            if let Err(e) = result {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn open_store(
    path: &Path,
    config: &Config,
) -> Result<RecordStore<FileBlockDevice>, Box<dyn std::error::Error>> {
    if !path.exists() {
        eprintln!("Error: catalog image not found: {}", path.display());
        eprintln!("Create one with: poi-browser pack --input catalog.json --output <image>");
        std::process::exit(1);
    }
    let device = FileBlockDevice::open(path)?;
    tracing::info!(path = %path.display(), blocks = device.block_count(), "opening catalog");
    Ok(RecordStore::open(device, config.storage.read_attempts)?)
}

/// The UI owns the terminal, so `run` logs to a file; other commands log
/// to stderr.
fn init_logging(to_file: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    if to_file {
        let dir = config::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        let log_path = dir.join("poi-browser.log");
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(log_file))
            .with_env_filter(log_filter.as_str())
            .with_ansi(false)
            .init();
        eprintln!("poi-browser log: {}", log_path.display());
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(log_filter.as_str())
            .init();
    }
    Ok(())
}

fn run_app<D: BlockDevice>(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App<D>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        if app.should_quit {
            return Ok(());
        }

        let mut frame = None;
        let mut button_down = false;
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    button_down = key.code == KeyCode::Enter && !app.show_help;
                    frame = handle_key(app, key);
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    frame = handle_mouse(app, mouse, Rect::new(0, 0, size.width, size.height));
                }
                _ => {}
            }
        }

        let mut frame = frame.unwrap_or_else(|| InputFrame::idle(&app.config.joystick));
        frame.select = app.select_button.sample(button_down);
        app.poll(frame);
    }
}

/// Translate a key into one poll of the device inputs.
fn handle_key<D: BlockDevice>(app: &mut App<D>, key: KeyEvent) -> Option<InputFrame> {
    // Help toggle (global)
    if key.code == KeyCode::Char('?') {
        app.show_help = !app.show_help;
        return None;
    }

    // If help is showing, any key closes it
    if app.show_help {
        app.show_help = false;
        return None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return None;
    }

    let joystick = &app.config.joystick;
    let full = |positive: bool| {
        if positive {
            joystick.centre + joystick.centre - 1
        } else {
            0
        }
    };
    let horizontal = |right: bool| full(right != joystick.invert_horizontal);
    let stick = |horizontal: i32, vertical: i32| InputFrame {
        axes: AxisSample {
            horizontal,
            vertical,
        },
        ..InputFrame::idle(joystick)
    };

    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            None
        }
        KeyCode::Up | KeyCode::Char('k') => Some(stick(joystick.centre, full(false))),
        KeyCode::Down | KeyCode::Char('j') => Some(stick(joystick.centre, full(true))),
        KeyCode::Left | KeyCode::Char('h') => Some(stick(horizontal(false), joystick.centre)),
        KeyCode::Right | KeyCode::Char('l') => Some(stick(horizontal(true), joystick.centre)),
        KeyCode::Char(c @ '1'..='5') => {
            let button = c as usize - '1' as usize;
            Some(app.tap_button(button))
        }
        _ => None,
    }
}

fn handle_mouse<D: BlockDevice>(
    app: &App<D>,
    mouse: MouseEvent,
    area: Rect,
) -> Option<InputFrame> {
    if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) || app.show_help {
        return None;
    }
    let at = ui::panel_point(area, mouse.column, mouse.row, &app.config.display)?;
    Some(app.touch_screen(at))
}
