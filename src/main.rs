mod ui;

use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use folio::{
    analytics::{Analytics, TracingSink},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, Theme},
    page::{Page, PageSetup},
    playlist::{
        load_playlist, BundledPlaylistSource, FilePlaylistSource, HttpPlaylistSource, Playlist,
        PlaylistSource,
    },
    runtime::{Clock, CrosstermEventSource, FixedTicker, FolioEvent, FolioEventSource, Runner, SystemClock, Ticker},
    sim::{ResourceSimulator, SimulatedPlayer},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use webbrowser::Browser;

const TICK_RATE_MS: u64 = 100;

/// portfolio page controllers in the terminal: a loading gate and a focus-session player
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Hosts the portfolio page's loading screen and study-session playlist in a terminal. The loading screen waits for the page's resources, and the player tracks a 30 minute focus session while music plays."
)]
pub struct Cli {
    /// number of images the page waits for (stylesheet and fonts add two more)
    #[clap(short = 'i', long, default_value_t = 6)]
    images: usize,

    /// fetch the playlist from this URL
    #[clap(short = 'u', long)]
    playlist_url: Option<String>,

    /// read the playlist from a local JSON file
    #[clap(short = 'f', long)]
    playlist_file: Option<PathBuf>,

    /// minimum time the loading screen stays up, in milliseconds
    #[clap(long)]
    min_display_ms: Option<u64>,

    /// time after which the loading screen is removed regardless, in milliseconds
    #[clap(long)]
    max_display_ms: Option<u64>,

    /// length of a focus session in seconds
    #[clap(short = 's', long)]
    session_secs: Option<u32>,

    /// simulated length of every track in seconds
    #[clap(long, default_value_t = 180)]
    track_secs: u64,

    /// how long the simulated player takes to become ready, in milliseconds
    #[clap(long, default_value_t = 1500)]
    player_delay_ms: u64,

    /// never attach the player, to see the unavailable fallback
    #[clap(long)]
    no_player: bool,

    /// share of simulated page resources that fail to load
    #[clap(long, default_value_t = 0.1)]
    fail_rate: f64,

    /// colour theme
    #[clap(short = 't', long, value_enum)]
    theme: Option<Theme>,

    /// do not emit analytics events
    #[clap(long)]
    no_analytics: bool,

    /// persist the given overrides to the config file
    #[clap(long)]
    save: bool,
}

impl Cli {
    /// Overlay command-line overrides on the stored config
    fn apply(&self, cfg: &mut Config) {
        if let Some(url) = &self.playlist_url {
            cfg.playlist_url = Some(url.clone());
        }
        if let Some(path) = &self.playlist_file {
            cfg.playlist_file = Some(path.clone());
        }
        if let Some(ms) = self.min_display_ms {
            cfg.min_display_ms = ms;
        }
        if let Some(ms) = self.max_display_ms {
            cfg.max_display_ms = ms;
        }
        if let Some(secs) = self.session_secs {
            cfg.session_duration_secs = secs;
        }
        if let Some(theme) = self.theme {
            cfg.theme = theme;
        }
        if self.no_analytics {
            cfg.analytics = false;
        }
    }
}

/// A local file wins over a URL; with neither, the bundled playlist is used
fn playlist_source(cfg: &Config) -> Box<dyn PlaylistSource> {
    if let Some(path) = &cfg.playlist_file {
        Box::new(FilePlaylistSource::new(path))
    } else if let Some(url) = &cfg.playlist_url {
        Box::new(HttpPlaylistSource::new(url.clone()))
    } else {
        Box::new(BundledPlaylistSource)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub page: Page<SimulatedPlayer>,
    pub config: Config,
    store: Option<FileConfigStore>,
    pending_player: Option<(Duration, SimulatedPlayer)>,
    last_advance: Duration,
}

impl App {
    pub fn new(
        cli: &Cli,
        config: Config,
        playlist: Playlist,
        store: Option<FileConfigStore>,
        now: Duration,
    ) -> Self {
        let analytics = if config.analytics {
            Analytics::new(Some(Box::new(TracingSink)))
        } else {
            Analytics::disabled()
        };
        let setup = PageSetup {
            image_count: cli.images,
            gate: config.gate_config(),
            session: config.session_config(),
            ..PageSetup::default()
        };
        let pending_player = (!cli.no_player).then(|| {
            (
                now + Duration::from_millis(cli.player_delay_ms),
                SimulatedPlayer::new(Duration::from_secs(cli.track_secs)),
            )
        });

        Self {
            page: Page::new(setup, playlist, analytics, now),
            config,
            store,
            pending_player,
            last_advance: now,
        }
    }

    /// Moves the simulated world forward to `now` and fires due timers
    pub fn advance(&mut self, now: Duration) {
        let dt = now.saturating_sub(self.last_advance);
        self.last_advance = now;

        if self
            .pending_player
            .as_ref()
            .is_some_and(|(ready_at, _)| now >= *ready_at)
        {
            if let Some((_, player)) = self.pending_player.take() {
                self.page.attach_player(player, now);
            }
        }
        if let Some(player) = self.page.player_mut() {
            player.advance(dt);
        }
        self.pump_player(now);
        self.page.advance(now);
        self.pump_player(now);
    }

    pub fn on_resource(&mut self, ok: bool, now: Duration) {
        self.page.on_resource_loaded(ok, now);
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Duration) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
            return Control::Quit;
        }
        if !self.page.is_content_visible() {
            // the overlay swallows input
            return Control::Continue;
        }

        match key.code {
            KeyCode::Char(' ') => {
                self.page.toggle_play_pause();
            }
            KeyCode::Char('n') | KeyCode::Right => self.page.next_track(now),
            KeyCode::Char('p') | KeyCode::Left => self.page.previous_track(now),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < self.page.session().playlist().len() {
                    self.page.select_track(index, now);
                }
            }
            KeyCode::Char('o') => self.open_in_browser(),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('x') => self.page.dismiss_notification(now),
            _ => {}
        }
        self.pump_player(now);
        Control::Continue
    }

    /// Feeds the player's state notifications back into the page until it
    /// goes quiet (an ENDED can load the next track, which reports again).
    fn pump_player(&mut self, now: Duration) {
        loop {
            let changes = match self.page.player_mut() {
                Some(player) => player.drain_state_changes(),
                None => return,
            };
            if changes.is_empty() {
                return;
            }
            for state in changes {
                self.page.on_player_state(state, now);
            }
        }
    }

    /// Flips the theme and persists only the theme; one-off CLI overrides in
    /// `self.config` stay out of the file unless `--save` was given.
    fn toggle_theme(&mut self) {
        self.config.theme = self.config.theme.toggled();
        info!(theme = %self.config.theme, "theme toggled");
        if let Some(store) = &self.store {
            let mut stored = store.load();
            stored.theme = self.config.theme;
            if let Err(e) = store.save(&stored) {
                warn!(error = %e, "could not persist theme");
            }
        }
    }

    fn open_in_browser(&self) {
        let url = &self.page.session().current_track().source_url;
        if Browser::is_available() {
            webbrowser::open(url).unwrap_or_default();
        } else {
            warn!(url, "no browser available");
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info"));
    let log_file = AppDirs::log_path().and_then(|path| {
        fs::create_dir_all(path.parent()?).ok()?;
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    // stdout belongs to the TUI
    match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .init(),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();
    info!("folio starting");

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if cli.save {
        store.save(&config)?;
        info!(path = %store.path().display(), "config saved");
    }

    let playlist = load_playlist(playlist_source(&config).as_ref());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let clock = SystemClock::start();
    let events = CrosstermEventSource::new();
    let mut app = App::new(&cli, config, playlist, Some(store), clock.now());

    ResourceSimulator::new(app.page.gate().resource_target())
        .failure_rate(cli.fail_rate)
        .spawn(events.sender());
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    let result = start_tui(&mut terminal, &mut app, &runner, &clock);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: FolioEventSource, T: Ticker, C: Clock>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
    clock: &C,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f, clock.now()))?;

        let event = runner.step();
        let now = clock.now();
        match event {
            FolioEvent::Tick | FolioEvent::Resize => {}
            FolioEvent::ResourceLoaded { ok } => app.on_resource(ok, now),
            FolioEvent::Key(key) => {
                if app.on_key(key, now) == Control::Quit {
                    break;
                }
            }
        }
        app.advance(now);
    }

    info!("folio exiting");
    Ok(())
}
