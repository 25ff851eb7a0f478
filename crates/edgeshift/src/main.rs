//! edgeshift entry point.
//!
//! Parses the command line, opens the source and destination displays, lays
//! out the destination screen chain and runs the event loop until the
//! trigger window is closed or Ctrl-C arrives.
//!
//! # Usage
//!
//! ```text
//! edgeshift -from :0 -to laptop:0 -east
//! edgeshift -to laptop:0 -geometry 120x30-0+0 -label laptop
//! ```
//!
//! Options use the traditional single-dash spelling (`-from`, `-east`,
//! `-buttonmap 8 "Alt_L Left"`) and are matched case-insensitively.  The
//! GNU spelling (`--from`) works too.
//!
//! # Exit status
//!
//! | status | meaning                                                    |
//! |--------|------------------------------------------------------------|
//! | 0      | trigger window closed, Ctrl-C, `--help` or `--version`     |
//! | 1      | source and destination are the same display, or the event  |
//! |        | loop failed after startup                                  |
//! | 2      | source display cannot be opened                            |
//! | 3      | a destination cannot be opened or lacks XTest              |
//! | 4      | usage or configuration error                               |
//!
//! # Startup sequence
//!
//! ```text
//! main()
//!  └─ normalize_legacy_args() + Cli::try_parse_from()
//!  └─ load_config()                   -- TOML file, may be absent
//!  └─ init_tracing()                  -- RUST_LOG > file log_level > info
//!  └─ Cli::into_configuration()
//!  └─ run()
//!       ├─ open source, primary and shadow displays (with -wait retry)
//!       ├─ ScreenChain::build()       -- from the primary's screens
//!       ├─ X11Source::create()        -- trigger window
//!       ├─ run_event_loop()
//!       └─ Session::shutdown()        -- on every exit path
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use edgeshift::infrastructure::storage::config::{load_config, resolve_keysyms, FileConfig};
use edgeshift::AppError;
use edgeshift_core::{Configuration, Edge, WindowGeometry};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drive other X displays with this display's pointer and keyboard.
///
/// Crossing the chosen screen edge (or clicking the trigger window when no
/// edge is given) hands the pointer and keyboard over to the destination.
#[derive(Debug, Parser)]
#[command(name = "edgeshift", version)]
struct Cli {
    /// Source display; defaults to $DISPLAY.
    #[arg(long, value_name = "DISPLAY")]
    from: Option<String>,

    /// Destination display; defaults to $DISPLAY.
    #[arg(long, value_name = "DISPLAY")]
    to: Option<String>,

    /// Additional destination receiving identical input (repeatable).
    #[arg(long = "shadow", value_name = "DISPLAY")]
    shadows: Vec<String>,

    /// Edge of the source screen the destination hangs off.  `-east`,
    /// `-west`, `-north` and `-south` are shorthands; the last one wins.
    #[arg(long = "edge", value_enum, value_name = "EDGE")]
    edges: Vec<EdgeArg>,

    /// Do not connect when the trigger window is clicked.
    #[arg(long = "nomouse")]
    no_mouse: bool,

    /// Ignore the destination's pointer button mapping.
    #[arg(long = "nopointermap")]
    no_pointer_map: bool,

    /// Do not keep ownership of the PRIMARY selection.
    #[arg(long = "nosel")]
    no_selection: bool,

    /// Leave keys and buttons held on the destination when disconnecting.
    #[arg(long = "noautoup")]
    no_auto_up: bool,

    /// Refuse to leave the destination while a button is held.
    #[arg(long = "buttonblock")]
    button_block: bool,

    /// Keysym always forwarded as press+release (repeatable).
    #[arg(long, value_name = "KEYSYM")]
    sticky: Vec<String>,

    /// Make a button type a key sequence instead of clicking, e.g.
    /// `-buttonmap 8 "Alt_L Left"` (repeatable).
    #[arg(long = "buttonmap", num_args = 2, value_names = ["BUTTON", "KEYSYMS"])]
    button_map: Vec<String>,

    /// Width of the edge trigger strip in pixels.
    #[arg(long = "triggerw", value_name = "PIXELS")]
    trigger_width: Option<u32>,

    /// Number of cells at the far end of each screen that lead onward.
    #[arg(long, value_name = "CELLS")]
    padding: Option<u32>,

    /// Translate Caps Lock into shifted keys on the destination.
    #[arg(long = "capslockhack", overrides_with = "no_capslock_hack")]
    capslock_hack: bool,

    #[arg(long = "nocapslockhack", overrides_with = "capslock_hack")]
    no_capslock_hack: bool,

    /// Wake destination monitors on every forwarded motion.
    #[arg(long = "dpmsmouse")]
    dpms_mouse: bool,

    /// Shift applied to the coordinate along the edge.
    #[arg(long, value_name = "PIXELS", allow_negative_numbers = true)]
    offset: Option<i32>,

    /// Keep retrying displays that cannot be opened yet.
    #[arg(long)]
    wait: bool,

    /// Trigger window geometry (window mode), e.g. `120x30-0+0`.
    #[arg(long, value_name = "GEOMETRY", allow_hyphen_values = true)]
    geometry: Option<String>,

    /// Text drawn in the trigger window.
    #[arg(long, allow_hyphen_values = true)]
    label: Option<String>,

    /// Trigger window title.
    #[arg(long, allow_hyphen_values = true)]
    title: Option<String>,

    /// Font for the trigger window label.
    #[arg(long)]
    font: Option<String>,

    /// Cover the source screen with an input-only window while connected.
    #[arg(long)]
    big: bool,

    /// Raise the trigger window whenever it is obscured.
    #[arg(long)]
    resurface: bool,

    /// Configuration file; defaults to the platform config directory.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EdgeArg {
    East,
    West,
    North,
    South,
}

impl From<EdgeArg> for Edge {
    fn from(edge: EdgeArg) -> Self {
        match edge {
            EdgeArg::East => Edge::East,
            EdgeArg::West => Edge::West,
            EdgeArg::North => Edge::North,
            EdgeArg::South => Edge::South,
        }
    }
}

/// Options taking values, with their value count.
const VALUED_OPTIONS: &[(&str, usize)] = &[
    ("from", 1),
    ("to", 1),
    ("shadow", 1),
    ("edge", 1),
    ("sticky", 1),
    ("buttonmap", 2),
    ("triggerw", 1),
    ("padding", 1),
    ("offset", 1),
    ("geometry", 1),
    ("label", 1),
    ("title", 1),
    ("font", 1),
    ("config", 1),
];

const FLAG_OPTIONS: &[&str] = &[
    "nomouse",
    "nopointermap",
    "nosel",
    "noautoup",
    "buttonblock",
    "capslockhack",
    "nocapslockhack",
    "dpmsmouse",
    "wait",
    "big",
    "resurface",
    "help",
    "version",
];

const EDGE_OPTIONS: &[&str] = &["east", "west", "north", "south"];

/// Rewrites `-from`, `-EAST`, `--Sticky` and friends into clap's `--long`
/// form.  Edge shorthands become `--edge <name>`.  Option values are passed
/// through untouched; unknown options are left for clap to reject.
fn normalize_legacy_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut args = args.into_iter();
    let mut out: Vec<String> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let name = arg.trim_start_matches('-');
        let dashes = arg.len() - name.len();
        if !(1..=2).contains(&dashes) || name.len() < 2 || name.contains('=') {
            out.push(arg);
            continue;
        }
        let name = name.to_ascii_lowercase();

        if EDGE_OPTIONS.contains(&name.as_str()) {
            out.push("--edge".to_string());
            out.push(name);
        } else if FLAG_OPTIONS.contains(&name.as_str()) {
            out.push(format!("--{name}"));
        } else if let Some(&(_, count)) = VALUED_OPTIONS.iter().find(|(known, _)| *known == name)
        {
            out.push(format!("--{name}"));
            out.extend(args.by_ref().take(count));
        } else {
            out.push(arg);
        }
    }
    out
}

impl Cli {
    /// Applies the command line on top of the configuration file.
    ///
    /// # Errors
    ///
    /// - [`AppError::Usage`] for a malformed `-buttonmap` button number.
    /// - [`AppError::Config`] for an invalid geometry or a configuration
    ///   rejected by [`Configuration::validate`].
    /// - [`AppError::ConfigFile`] for invalid values in the file.
    fn into_configuration(self, file: &FileConfig) -> Result<Configuration, AppError> {
        let mut config = file.to_configuration()?;

        if self.from.is_some() {
            config.from_display = self.from;
        }
        if self.to.is_some() {
            config.to_display = self.to;
        }
        config.shadows.extend(self.shadows);
        if let Some(&edge) = self.edges.last() {
            config.edge = Some(edge.into());
        }

        config.capture_mouse &= !self.no_mouse;
        config.pointer_map &= !self.no_pointer_map;
        config.selection &= !self.no_selection;
        config.auto_up &= !self.no_auto_up;
        config.button_block |= self.button_block;
        config.dpms_wake |= self.dpms_mouse;
        config.wait |= self.wait;
        config.big_window |= self.big;
        config.resurface |= self.resurface;
        if self.capslock_hack {
            config.capslock_hack = true;
        } else if self.no_capslock_hack {
            config.capslock_hack = false;
        }

        config
            .sticky
            .extend(resolve_keysyms(self.sticky.iter().map(String::as_str)));
        for pair in self.button_map.chunks(2) {
            let [button, keys] = pair else {
                return Err(AppError::Usage("-buttonmap needs a button and keysyms".into()));
            };
            let button = button
                .parse::<u32>()
                .map_err(|_| AppError::Usage(format!("invalid -buttonmap button {button:?}")))?;
            config
                .button_keys
                .insert(button, resolve_keysyms(keys.split_whitespace()));
        }

        if let Some(width) = self.trigger_width {
            config.trigger_width = width;
        }
        if let Some(padding) = self.padding {
            config.boundary_padding = padding;
        }
        if let Some(offset) = self.offset {
            config.offset = offset;
        }
        if let Some(geometry) = self.geometry {
            config.geometry = Some(geometry.parse::<WindowGeometry>()?);
        }
        config.label = self.label.or(config.label);
        config.title = self.title.or(config.title);
        config.font = self.font.or(config.font);

        config.validate()?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Installs the `tracing` subscriber.  `RUST_LOG` wins over `level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = normalize_legacy_args(
        std::env::args_os().map(|arg| arg.to_string_lossy().into_owned()),
    );
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(&AppError::Usage(e.to_string())),
            };
        }
    };

    let file = load_config(cli.config.as_deref());
    init_tracing(file.as_ref().map_or("info", |f| f.log_level.as_str()));

    let result = file
        .map_err(AppError::from)
        .and_then(|file| cli.into_configuration(&file));
    let config = match result {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from(&e);
        }
    };

    info!("edgeshift {} starting", env!("CARGO_PKG_VERSION"));
    match platform::run(config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(&e)
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use std::process::ExitCode;
    use std::rc::Rc;

    use anyhow::Context;
    use tracing::{error, info};

    use edgeshift::application::connection::SourceControl;
    use edgeshift::application::forward_input::Destination;
    use edgeshift::application::session::{DestinationEvent, Session};
    use edgeshift::infrastructure::display::x11::{
        install_error_handler, X11Destination, X11Source, XConnection,
    };
    use edgeshift::infrastructure::display::{open_with_retry, resolve_display_name, DisplayError};
    use edgeshift::infrastructure::event_loop::{run_event_loop, EventPump};
    use edgeshift::AppError;
    use edgeshift_core::{Configuration, ScreenChain};

    /// Opens a destination, retrying under the wait policy, then checks it
    /// for XTest.
    async fn open_destination(
        name: &str,
        config: &Configuration,
        primary: bool,
    ) -> Result<X11Destination, DisplayError> {
        let conn = open_with_retry(name, config.wait, config.wait_interval, |name| {
            XConnection::open(name)
                .ok_or_else(|| DisplayError::DestinationUnavailable(name.to_string()))
        })
        .await?;
        X11Destination::new(conn, primary)
    }

    pub async fn run(config: Configuration) -> Result<ExitCode, AppError> {
        let from = resolve_display_name(config.from_display.as_deref())
            .map_err(|e| DisplayError::SourceUnavailable(format!("({e})")))?;
        let to = resolve_display_name(config.to_display.as_deref())
            .map_err(|e| DisplayError::DestinationUnavailable(format!("({e})")))?;
        Configuration::check_distinct(&from, &to)?;

        install_error_handler();

        let source_conn = open_with_retry(&from, config.wait, config.wait_interval, |name| {
            XConnection::open(name).ok_or_else(|| DisplayError::SourceUnavailable(name.to_string()))
        })
        .await?;
        let mut destinations = vec![Rc::new(open_destination(&to, &config, true).await?)];
        for shadow in &config.shadows {
            destinations.push(Rc::new(open_destination(shadow, &config, false).await?));
        }

        let primary = &destinations[0];
        let chain = ScreenChain::build(
            source_conn.default_screen(),
            &primary.screens(),
            &config.chain_layout(),
        )?;
        let pointer_mapping = primary.pointer_mapping();
        info!(
            screens = chain.screen_count(),
            shadows = config.shadows.len(),
            edge = ?config.edge,
            "destination chain ready"
        );

        let config = Rc::new(config);
        let source = Rc::new(X11Source::create(source_conn, &config, &chain, &to));
        let mut session = Session::new(
            Rc::clone(&config),
            chain,
            Rc::clone(&source) as Rc<dyn SourceControl>,
            destinations
                .iter()
                .map(|d| Rc::clone(d) as Rc<dyn Destination>)
                .collect(),
            &pointer_mapping,
        );

        let pumps: Vec<&dyn EventPump<Event = DestinationEvent>> = destinations
            .iter()
            .map(|d| d.as_ref() as &dyn EventPump<Event = DestinationEvent>)
            .collect();
        let result = run_event_loop(&mut session, source.as_ref(), &pumps)
            .await
            .context("event loop failed");

        session.shutdown();

        match result {
            Ok(reason) => {
                info!(?reason, "edgeshift stopped");
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                error!("{e:#}");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use std::process::ExitCode;

    use edgeshift::infrastructure::display::{resolve_display_name, DisplayError};
    use edgeshift::AppError;
    use edgeshift_core::Configuration;

    pub async fn run(config: Configuration) -> Result<ExitCode, AppError> {
        let from = resolve_display_name(config.from_display.as_deref()).unwrap_or_default();
        Err(DisplayError::SourceUnavailable(format!("{from} (X11 support is only built on Linux)")).into())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
