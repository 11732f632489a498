mod config;
mod data;
mod error;
mod gesture;
mod machine;
mod map_draw;
mod projection;
mod quiz;
mod selection;
mod state;
mod topology;
mod ui;

use std::{
    fs::File,
    io,
    path::Path,
    sync::Mutex,
    time::Instant,
};

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use state::AppState;

fn init_logging(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    config.validate()?;
    init_logging(&config.log_file)?;

    // Load before touching the terminal so a broken file is reported plainly.
    let countries = data::load_countries(&config.geodata)?;
    let (cols, rows) = terminal::size()?;
    let mut state = AppState::new(&config, countries, ui::map_area(Rect::new(0, 0, cols, rows)));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    info!(
        right = state.machine.quiz().right(),
        wrong = state.machine.quiz().wrong(),
        "session ended"
    );
    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        terminal.draw(|f| ui::draw(f, state))?;

        if event::poll(state.poll_timeout(Instant::now()))? {
            match event::read()? {
                Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) => {
                    if state.handle_key(code) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse, Instant::now()),
                _ => {}
            }
        }
        state.tick(Instant::now());
    }
}
