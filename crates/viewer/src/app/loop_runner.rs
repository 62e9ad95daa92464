use std::path::Path;
use std::process::ExitCode;

use iso_engine::scene::{
    Bucket, FrameError, FrameSummary, ProfileError, RenderProfile, SceneRenderer,
};
use iso_engine::world::MapError;
use thiserror::Error;
use tracing::{debug, error, info};

use super::bootstrap::ViewerConfig;
use super::demo::demo_fixture;
use super::fixture::{Fixture, FixtureError, LoadedScene};

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error("failed to load render profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("failed to move player at frame {frame}: {source}")]
    Walk {
        frame: u64,
        #[source]
        source: MapError,
    },
    #[error("frame {frame} failed: {source}")]
    Frame {
        frame: u64,
        #[source]
        source: FrameError,
    },
}

pub(crate) fn run(config: ViewerConfig) -> ExitCode {
    match run_frames(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "viewer_failed");
            ExitCode::FAILURE
        }
    }
}

fn load_scene(config: &ViewerConfig) -> Result<LoadedScene, RunError> {
    let mut scene = match &config.fixture {
        Some(path) => Fixture::load(path)?.into_scene(path)?,
        None => demo_fixture().into_scene(Path::new("<demo>"))?,
    };
    if let Some(path) = &config.profile {
        scene.input.profile = RenderProfile::load(path)?;
    }
    Ok(scene)
}

fn run_frames(config: &ViewerConfig) -> Result<(), RunError> {
    let mut scene = load_scene(config)?;
    info!(
        objects = scene.map.len(),
        width = scene.map.width(),
        height = scene.map.height(),
        frames = config.frames,
        "scene_loaded"
    );

    let mut renderer = SceneRenderer::new();
    let stats = renderer.stats_handle();
    let mut last_fingerprint = String::new();

    for frame in 0..config.frames {
        step_player(&mut scene, frame).map_err(|source| RunError::Walk { frame, source })?;
        scene.input.now_ms = frame * scene.frame_ms;

        let summary = renderer
            .build_frame(&mut scene.map, &scene.table, &scene.input)
            .map_err(|source| RunError::Frame { frame, source })?;
        let fingerprint = renderer.render_lists().fingerprint();
        if fingerprint != last_fingerprint {
            log_frame(frame, &summary, &renderer, &fingerprint);
            last_fingerprint = fingerprint;
        } else {
            debug!(frame, "frame_unchanged");
        }
    }

    let timing = stats.build_timing();
    info!(
        frames = config.frames,
        last_ms = timing.last_ms,
        avg_ms = timing.avg_ms,
        max_ms = timing.max_ms,
        "run_complete"
    );
    Ok(())
}

/// Moves the player to the next walk tile every `step_frames` frames.
fn step_player(scene: &mut LoadedScene, frame: u64) -> Result<(), MapError> {
    if frame == 0 || frame % scene.step_frames != 0 {
        return Ok(());
    }
    let step = usize::try_from(frame / scene.step_frames - 1).unwrap_or(usize::MAX);
    let Some(&(x, y)) = scene.walk.get(step) else {
        return Ok(());
    };
    let player = scene.input.player;
    let z = match scene.map.tile_elevation(i32::from(x), i32::from(y)) {
        Some(z) => z,
        None => scene.map.get(player).map_or(0, |object| object.z()),
    };
    scene.map.relocate(player, x, y, z, &scene.table)?;
    debug!(frame, x, y, z, "player_moved");
    Ok(())
}

fn log_frame(frame: u64, summary: &FrameSummary, renderer: &SceneRenderer, fingerprint: &str) {
    let count = |bucket| summary.stats.bucket(bucket);
    let short = fingerprint.get(..16).unwrap_or(fingerprint);
    info!(
        frame,
        terrain_flat = count(Bucket::TerrainFlat),
        terrain_stretched = count(Bucket::TerrainStretched),
        statics = count(Bucket::Statics),
        animations = count(Bucket::Animations),
        effects = count(Bucket::Effects),
        transparent = count(Bucket::Transparent),
        picked = ?renderer.picked().map(|handle| handle.index()),
        lights = renderer.lights().len(),
        labeled = renderer.labeled().len(),
        max_z = summary.max_draw_z.max_z,
        fingerprint = %short,
        "frame"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config(frames: u64) -> ViewerConfig {
        ViewerConfig {
            fixture: None,
            profile: None,
            frames,
        }
    }

    #[test]
    fn demo_walk_enters_the_house() {
        let mut scene = load_scene(&demo_config(1)).expect("demo");
        let steps = scene.walk.len() as u64;
        for frame in 0..=steps * scene.step_frames {
            step_player(&mut scene, frame).expect("step");
        }
        let player = scene.map.get(scene.input.player).expect("player");
        assert_eq!((player.x(), player.y()), (23, 23));
    }

    #[test]
    fn roof_lifts_once_the_player_is_inside() {
        let mut scene = load_scene(&demo_config(1)).expect("demo");
        let mut renderer = SceneRenderer::new();
        let outside = renderer
            .build_frame(&mut scene.map, &scene.table, &scene.input)
            .expect("outside");
        assert!(!outside.max_draw_z.no_draw_roofs);

        let player = scene.input.player;
        scene
            .map
            .relocate(player, 22, 22, 0, &scene.table)
            .expect("move inside");
        let inside = renderer
            .build_frame(&mut scene.map, &scene.table, &scene.input)
            .expect("inside");
        assert!(inside.max_draw_z.no_draw_roofs);
        assert_eq!(inside.max_draw_z.max_z, 20);
    }

    #[test]
    fn missing_fixture_is_a_load_error() {
        let config = ViewerConfig {
            fixture: Some("does/not/exist.json".into()),
            profile: None,
            frames: 1,
        };
        assert!(matches!(
            load_scene(&config),
            Err(RunError::Fixture(FixtureError::Read { .. }))
        ));
    }

    #[test]
    fn demo_runs_to_completion() {
        assert!(run_frames(&demo_config(12)).is_ok());
    }
}
