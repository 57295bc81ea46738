use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::classify::{Classifier, NodeIdGrammar, RoleMarkers};
use crate::snapshot::{SnapshotBuilder, ViewerMode};
use crate::theme::Theme;

/// chainview - live viewer for node snapshot directories
///
/// Polls a directory of per-node blockchain, mempool and complete-games JSON
/// files and shows them in the terminal.
/// Configuration priority: CLI args > Environment variables > Config file > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "chainview")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal viewer for node blockchain snapshots", long_about = None)]
pub struct CliArgs {
    /// Directory the nodes write their snapshot files to
    #[arg(env = "CHAINVIEW_DIR")]
    pub dir: Option<PathBuf>,

    /// File layout: paired (`N_mainBlockchain.json` + `N_mainMempool.json`) or rich
    #[arg(short, long, env = "CHAINVIEW_MODE", value_parser = clap::value_parser!(ViewerMode))]
    pub mode: Option<ViewerMode>,

    /// Refresh interval in milliseconds (100-60000)
    #[arg(long, env = "CHAINVIEW_REFRESH_MS")]
    pub refresh_ms: Option<u64>,

    /// Start with auto refresh off ('a' toggles it, 'r' refreshes once)
    #[arg(long, env = "CHAINVIEW_NO_AUTO_REFRESH")]
    pub no_auto_refresh: bool,

    /// How node ids are read from filenames: integer, token, integer-or-token
    #[arg(long, env = "CHAINVIEW_NODE_ID_GRAMMAR", value_parser = clap::value_parser!(NodeIdGrammar))]
    pub node_id_grammar: Option<NodeIdGrammar>,

    /// Filename marker of blockchain files
    #[arg(long, env = "CHAINVIEW_CHAIN_MARKER")]
    pub chain_marker: Option<String>,

    /// Filename marker of mempool files
    #[arg(long, env = "CHAINVIEW_MEMPOOL_MARKER")]
    pub mempool_marker: Option<String>,

    /// Filename marker of complete-games files
    #[arg(long, env = "CHAINVIEW_COMPLETE_GAMES_MARKER")]
    pub complete_games_marker: Option<String>,

    /// Also refresh when files in the directory change
    #[arg(short, long, env = "CHAINVIEW_WATCH")]
    pub watch: bool,

    /// Target UI rendering FPS (1-120)
    #[arg(long, env = "CHAINVIEW_RENDER_FPS")]
    pub render_fps: Option<u32>,

    /// Colour theme: nord, dos-blue, amber-crt, green-phosphor
    #[arg(long, env = "CHAINVIEW_THEME", value_parser = clap::value_parser!(Theme))]
    pub theme: Option<Theme>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long, env = "CHAINVIEW_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// TOML config file with [viewer] and [markers] sections
    #[arg(short, long, env = "CHAINVIEW_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub viewer: ViewerSection,

    #[serde(default)]
    pub markers: MarkersSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerSection {
    pub dir: Option<PathBuf>,
    pub mode: Option<ViewerMode>,
    pub refresh_ms: Option<u64>,
    pub auto_refresh: Option<bool>,
    pub node_id_grammar: Option<NodeIdGrammar>,
    pub watch: Option<bool>,
    pub render_fps: Option<u32>,
    pub theme: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkersSection {
    pub chain: Option<String>,
    pub mempool: Option<String>,
    pub complete_games: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub dir: PathBuf,
    pub mode: ViewerMode,
    pub refresh_ms: u64,
    pub auto_refresh: bool,
    pub node_id_grammar: NodeIdGrammar,
    pub markers: RoleMarkers,
    pub watch: bool,
    pub render_fps: u32,
    pub theme: Theme,
    pub log_file: PathBuf,
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

fn validate_marker(marker: String, name: &str) -> Result<String> {
    if marker.trim().is_empty() {
        Err(anyhow!("{name} cannot be empty"))
    } else {
        Ok(marker)
    }
}

/// Load configuration from CLI args, environment variables and the optional config file
/// Priority: CLI args > Environment variables > Config file > Defaults
pub fn load() -> Result<Config> {
    Config::from_args(CliArgs::parse())
}

/// Load configuration from TOML file
pub fn load_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
}

impl Config {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => {
                log::info!("📄 Loading configuration from {}", path.display());
                load_file(path)?
            }
            None => ConfigFile::default(),
        };
        Self::merge(args, file)
    }

    /// Resolve every setting: CLI/env first, then file, then the mode's defaults.
    pub fn merge(args: CliArgs, file: ConfigFile) -> Result<Self> {
        let viewer = file.viewer;

        let mode = args.mode.or(viewer.mode).unwrap_or(ViewerMode::Rich);

        let dir = args
            .dir
            .or(viewer.dir)
            .unwrap_or_else(|| PathBuf::from("./data"));

        let refresh_ms = args.refresh_ms.or(viewer.refresh_ms).unwrap_or(1000);
        let refresh_ms = validate_in_range(refresh_ms, 100, 60_000, "CHAINVIEW_REFRESH_MS")?;

        let render_fps = args.render_fps.or(viewer.render_fps).unwrap_or(30);
        let render_fps = validate_in_range(render_fps, 1, 120, "CHAINVIEW_RENDER_FPS")?;

        let theme = match (args.theme, viewer.theme) {
            (Some(theme), _) => theme,
            (None, Some(name)) => name.parse()?,
            (None, None) => Theme::default(),
        };

        let auto_refresh = if args.no_auto_refresh {
            false
        } else {
            viewer.auto_refresh.unwrap_or(true)
        };
        let watch = args.watch || viewer.watch.unwrap_or(false);

        let node_id_grammar = args
            .node_id_grammar
            .or(viewer.node_id_grammar)
            .unwrap_or_else(|| mode.default_grammar());

        let defaults = mode.default_markers();
        let markers = RoleMarkers {
            chain: validate_marker(
                args.chain_marker.or(file.markers.chain).unwrap_or(defaults.chain),
                "CHAINVIEW_CHAIN_MARKER",
            )?,
            mempool: validate_marker(
                args.mempool_marker.or(file.markers.mempool).unwrap_or(defaults.mempool),
                "CHAINVIEW_MEMPOOL_MARKER",
            )?,
            complete_games: args
                .complete_games_marker
                .or(file.markers.complete_games)
                .or(defaults.complete_games)
                .map(|m| validate_marker(m, "CHAINVIEW_COMPLETE_GAMES_MARKER"))
                .transpose()?,
        };

        Ok(Config {
            dir,
            mode,
            refresh_ms,
            auto_refresh,
            node_id_grammar,
            markers,
            watch,
            render_fps,
            theme,
            log_file: args
                .log_file
                .unwrap_or_else(|| PathBuf::from("chainview.log")),
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.node_id_grammar, self.markers.clone())
    }

    pub fn snapshot_builder(&self) -> SnapshotBuilder {
        SnapshotBuilder::new(self.mode, self.classifier())
    }

    /// Log the resolved configuration at startup
    pub fn log_summary(&self) {
        log::info!("chainview configuration:");
        log::info!("  Directory: {}", self.dir.display());
        log::info!("  Mode: {}", self.mode);
        log::info!("  Node ids: {}", self.node_id_grammar);
        log::info!("  Chain marker: {}", self.markers.chain);
        log::info!("  Mempool marker: {}", self.markers.mempool);
        if let Some(m) = &self.markers.complete_games {
            log::info!("  Complete games marker: {m}");
        }
        log::info!(
            "  Refresh: every {}ms ({})",
            self.refresh_ms,
            if self.auto_refresh { "auto" } else { "manual" }
        );
        log::info!("  Watch: {}", self.watch);
        log::info!("  Render FPS: {}", self.render_fps);
        log::info!("  Theme: {}", self.theme);
        log::info!("  Log file: {}", self.log_file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["chainview"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::merge(CliArgs::default(), ConfigFile::default()).unwrap();
        assert_eq!(cfg.mode, ViewerMode::Rich);
        assert_eq!(cfg.dir, PathBuf::from("./data"));
        assert_eq!(cfg.refresh_ms, 1000);
        assert!(cfg.auto_refresh);
        assert!(!cfg.watch);
        assert_eq!(cfg.node_id_grammar, NodeIdGrammar::IntegerOrToken);
        assert_eq!(cfg.markers, RoleMarkers::rich());
        assert_eq!(cfg.render_fps, 30);
        assert_eq!(cfg.theme, Theme::Nord);
    }

    #[test]
    fn test_paired_mode_defaults() {
        let cfg = Config::merge(args(&["--mode", "paired", "/tmp/nodes"]), ConfigFile::default()).unwrap();
        assert_eq!(cfg.dir, PathBuf::from("/tmp/nodes"));
        assert_eq!(cfg.node_id_grammar, NodeIdGrammar::Integer);
        assert_eq!(cfg.markers, RoleMarkers::paired());
    }

    #[test]
    fn test_refresh_range() {
        assert!(Config::merge(args(&["--refresh-ms", "50"]), ConfigFile::default()).is_err());
        assert!(Config::merge(args(&["--refresh-ms", "60001"]), ConfigFile::default()).is_err());
        let cfg = Config::merge(args(&["--refresh-ms", "250"]), ConfigFile::default()).unwrap();
        assert_eq!(cfg.refresh_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_empty_marker_rejected() {
        assert!(Config::merge(args(&["--chain-marker", " "]), ConfigFile::default()).is_err());
    }

    #[test]
    fn test_file_fills_gaps_cli_wins() {
        let file: ConfigFile = toml::from_str(
            r#"
            [viewer]
            mode = "paired"
            refresh_ms = 2000
            auto_refresh = false
            theme = "amber"

            [markers]
            chain = "_chain.json"
            "#,
        )
        .unwrap();
        let cfg = Config::merge(args(&["--refresh-ms", "500"]), file).unwrap();
        assert_eq!(cfg.mode, ViewerMode::Paired);
        assert_eq!(cfg.refresh_ms, 500);
        assert!(!cfg.auto_refresh);
        assert_eq!(cfg.theme, Theme::AmberCrt);
        assert_eq!(cfg.markers.chain, "_chain.json");
        assert_eq!(cfg.markers.mempool, "_mainMempool.json");
        assert_eq!(cfg.markers.complete_games, None);
    }

    #[test]
    fn test_grammar_override() {
        let cfg = Config::merge(
            args(&["--mode", "paired", "--node-id-grammar", "token"]),
            ConfigFile::default(),
        )
        .unwrap();
        assert_eq!(cfg.node_id_grammar, NodeIdGrammar::Token);
        assert_eq!(cfg.classifier().classify("alice_mainMempool.json").map(|c| c.node_id), Some("alice".to_string()));
    }

    #[test]
    fn test_bad_mode_rejected() {
        let argv = ["chainview", "--mode", "sideways"];
        assert!(CliArgs::try_parse_from(argv).is_err());
    }
}
