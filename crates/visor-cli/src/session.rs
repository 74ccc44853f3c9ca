//! The per-frame session loop shared by both viewer modes.
//!
//! One tick: capture → (skip-unchanged guard) annotate → compose → feed the
//! recorder → present with HUD → handle keys. The loop is owned by a single
//! call and guarded by its running flag, so it cannot be scheduled twice.

use crate::config::Config;
use crate::hud;
use crate::view::View;
use anyhow::{Context, Result};
use minifb::Key;
use std::path::Path;
use visor_capture::{timestamped_name, write_snapshot, CaptureError, Recorder};
use visor_core::{Annotator, FrameAnnotations};
use visor_hw::{Camera, Frame};
use visor_render::overlay::{self, draw_annotations};
use visor_render::Canvas;

/// What the snapshot key exports.
pub enum SnapshotMode {
    /// The canvas exactly as composed this tick.
    Composed,
    /// Redraw the frame and annotate it fresh, landmarks in the snapshot
    /// color — the landmark page behavior.
    Reannotated,
}

pub struct SessionOptions {
    pub title: &'static str,
    pub snapshot_mode: SnapshotMode,
}

/// Run a viewer session until the window closes or the user quits.
pub fn run(
    config: &Config,
    annotator: &mut dyn Annotator,
    options: &SessionOptions,
) -> Result<()> {
    let camera = Camera::open(&config.camera_device, config.camera_width, config.camera_height)
        .with_context(|| format!("cannot access camera {}", config.camera_device))?;

    tracing::info!(
        mode = annotator.name(),
        device = %config.camera_device,
        width = camera.width,
        height = camera.height,
        "session starting"
    );

    // The drawing surface takes its extents from the negotiated settings.
    let mut canvas = Canvas::new(camera.width, camera.height);
    let mut recorder = Recorder::new(config.record_fps, config.jpeg_quality);
    let mut view = View::new(options.title, camera.width, camera.height)?;
    let mut stream = camera.stream().context("cannot start capture stream")?;

    let mut last_sequence: Option<u32> = None;
    let mut annotations = FrameAnnotations::None;
    let mut running = true;

    while running && view.is_open() {
        let frame = match stream.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed, skipping tick");
                continue;
            }
        };

        // Skip re-running inference on an unchanged driver frame; the
        // previous annotations still pair with the frame on screen.
        if last_sequence != Some(frame.sequence) {
            last_sequence = Some(frame.sequence);
            annotations = match annotator.annotate(&frame.data, frame.width, frame.height) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "inference failed for this frame");
                    FrameAnnotations::None
                }
            };
        }

        canvas.draw_frame(&frame.data, frame.width, frame.height);
        draw_annotations(&mut canvas, &annotations, &config.style);

        if recorder.is_recording() {
            if let Err(e) = recorder.push_frame(canvas.data(), canvas.width(), canvas.height()) {
                tracing::warn!(error = %e, "dropping recorded frame");
            }
        }

        for key in view.keys_pressed() {
            match key {
                Key::R => toggle_recording(&mut recorder),
                Key::S => save_recording(&recorder, &config.output_dir),
                Key::P => take_snapshot(&mut canvas, &frame, annotator, options, config),
                Key::Q | Key::Escape => running = false,
                _ => {}
            }
        }

        let mut presented = canvas.clone();
        hud::draw(&mut presented, recorder.is_recording());
        view.present(presented.data())?;
    }

    tracing::info!(mode = annotator.name(), "session ended");
    Ok(())
}

/// One key drives both record buttons; the recorder state picks which.
fn toggle_recording(recorder: &mut Recorder) {
    let result = if recorder.is_recording() {
        recorder.stop()
    } else {
        recorder.start()
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "recording toggle ignored");
    }
}

/// Save is best-effort: state misuse warns the user and changes nothing.
fn save_recording(recorder: &Recorder, output_dir: &Path) {
    let path = output_dir.join(timestamped_name("recording", "avi"));
    match recorder.save_to(&path) {
        Ok(()) => {}
        Err(e @ (CaptureError::StillRecording | CaptureError::NoData)) => {
            tracing::warn!("{e}");
        }
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "failed to save recording");
        }
    }
}

fn take_snapshot(
    canvas: &mut Canvas,
    frame: &Frame,
    annotator: &mut dyn Annotator,
    options: &SessionOptions,
    config: &Config,
) {
    if let SnapshotMode::Reannotated = options.snapshot_mode {
        canvas.draw_frame(&frame.data, frame.width, frame.height);
        match annotator.annotate(&frame.data, frame.width, frame.height) {
            Ok(FrameAnnotations::LandmarkSets(sets)) => {
                for set in &sets {
                    overlay::draw_landmark_set(
                        canvas,
                        set,
                        config.style.snapshot_landmark_color,
                        &config.style,
                    );
                }
            }
            Ok(other) => draw_annotations(canvas, &other, &config.style),
            Err(e) => {
                tracing::warn!(error = %e, "snapshot re-annotation failed, saving plain frame");
            }
        }
    }

    let path = config.output_dir.join(timestamped_name("snapshot", "png"));
    if let Err(e) = write_snapshot(canvas.data(), canvas.width(), canvas.height(), &path) {
        tracing::error!(error = %e, path = %path.display(), "failed to save snapshot");
    }
}
