// Native terminal binary for chainview

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::OpenOptions,
    io,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use chainview::{
    app::App,
    config::{load, Config},
    provider::DirectoryProvider,
    scheduler::{RefreshEngine, RefreshScheduler},
    types::AppEvent,
    ui, watcher,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();

    let cfg = load().context("Failed to load configuration")?;
    init_logging(&cfg)?;
    log::info!("🚀 chainview starting");
    cfg.log_summary();

    // One directory grant per session; a refusal is fatal before the UI starts
    let provider = DirectoryProvider::open(&cfg.dir)
        .with_context(|| format!("Error accessing directory: {}", cfg.dir.display()))?;

    let (tx, rx) = unbounded_channel::<AppEvent>();
    let engine = RefreshEngine::new(Arc::new(provider), cfg.snapshot_builder());
    let mut scheduler = RefreshScheduler::new(engine, tx.clone());
    if cfg.auto_refresh {
        scheduler.start(cfg.refresh_interval());
    } else {
        scheduler.trigger_once();
    }

    if cfg.watch {
        watcher::start_directory_watcher(cfg.dir.clone(), tx.clone())?;
    }

    // terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut app = App::new(cfg.mode, cfg.theme, cfg.render_fps, cfg.auto_refresh);
    let result = run_loop(&mut app, &mut terminal, rx, &mut scheduler, &cfg).await;

    scheduler.shutdown();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

/// env_logger into a file; stderr belongs to the alternate screen.
fn init_logging(cfg: &Config) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.log_file)
        .with_context(|| format!("Failed to open log file: {}", cfg.log_file.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut rx: UnboundedReceiver<AppEvent>,
    scheduler: &mut RefreshScheduler,
    cfg: &Config,
) -> Result<()> {
    let mut last_frame = Instant::now();

    loop {
        let frame_ms = 1000u32.saturating_div(app.fps()) as u64;
        let budget = Duration::from_millis(frame_ms.max(1));
        let wait = budget.saturating_sub(last_frame.elapsed());

        if event::poll(wait)? {
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    handle_key(app, k, scheduler, cfg);
                }
            }
        }

        // Refresh results are reconciled against the selection as it is right now
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, AppEvent::DirectoryChanged) {
                scheduler.trigger_once();
            }
            app.on_event(ev);
        }

        if last_frame.elapsed() >= budget {
            terminal.draw(|f| ui::draw(f, app))?;
            last_frame = Instant::now();
        }
        if app.quit_flag() {
            break;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, k: KeyEvent, scheduler: &mut RefreshScheduler, cfg: &Config) {
    match (k.code, k.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.on_event(AppEvent::Quit);
        }
        (KeyCode::Tab, _) => app.next_pane(),
        (KeyCode::BackTab, _) => app.prev_pane(),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.up(),
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.down(),
        (KeyCode::Enter, _) => app.enter(),
        (KeyCode::Esc, _) | (KeyCode::Backspace, _) => app.back(),
        (KeyCode::Char('r'), _) => {
            scheduler.trigger_once();
            app.show_toast("Refreshing".to_string());
        }
        (KeyCode::Char('a'), _) => {
            if app.toggle_auto_refresh() {
                scheduler.start(cfg.refresh_interval());
            } else {
                scheduler.stop();
            }
        }
        _ => {}
    }
}
