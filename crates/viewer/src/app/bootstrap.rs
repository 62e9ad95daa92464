use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FIXTURE_ENV_VAR: &str = "ISO_VIEWER_FIXTURE";
const FRAMES_ENV_VAR: &str = "ISO_VIEWER_FRAMES";
const PROFILE_ENV_VAR: &str = "ISO_VIEWER_PROFILE";
const DEFAULT_FRAMES: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ViewerConfig {
    /// Scene fixture; the built-in demo when unset.
    pub(crate) fixture: Option<PathBuf>,
    /// Render profile overriding the fixture's own.
    pub(crate) profile: Option<PathBuf>,
    pub(crate) frames: u64,
}

pub(crate) fn build_app() -> ViewerConfig {
    init_tracing();
    info!("=== iso viewer startup ===");

    let config = config_from_vars(|key| std::env::var(key).ok());
    info!(
        fixture = ?config.fixture,
        profile = ?config.profile,
        frames = config.frames,
        "viewer_config"
    );
    config
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn config_from_vars(lookup: impl Fn(&str) -> Option<String>) -> ViewerConfig {
    let path = |key: &str| {
        lookup(key)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from)
    };
    ViewerConfig {
        fixture: path(FIXTURE_ENV_VAR),
        profile: path(PROFILE_ENV_VAR),
        frames: parse_frames(lookup(FRAMES_ENV_VAR)),
    }
}

fn parse_frames(raw: Option<String>) -> u64 {
    let Some(raw) = raw else {
        return DEFAULT_FRAMES;
    };
    match raw.trim().parse::<u64>() {
        Ok(frames) if frames > 0 => frames,
        _ => {
            warn!(value = %raw, default = DEFAULT_FRAMES, "invalid_frame_count");
            DEFAULT_FRAMES
        }
    }
}
