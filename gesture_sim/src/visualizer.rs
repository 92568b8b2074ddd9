//! Rerun renderer for slave frames.
//!
//! Visualization is optional and only available with the `visualization` feature.
//!
//! # What Gets Logged
//!
//! - Trail segments per object as coloured line strips
//! - Afterimages as fading points
//! - The current position of each object as a sphere in its drawing colour
//! - Frame number as the `frame` timeline

use gesture_core::render::{FrameView, Renderer};
#[cfg(feature = "visualization")]
use gesture_core::render::{dirty_segment_blocks, segment_block};
#[cfg(feature = "visualization")]
use std::collections::HashMap;
#[cfg(feature = "visualization")]
use rerun::{Color, LineStrips3D, Points3D, Radius, RecordingStream};

/// Scale from the configured line width to scene units.
#[cfg(feature = "visualization")]
const LINE_RADIUS_SCALE: f64 = 0.001;

/// Rerun renderer for the slave.
pub struct RerunRenderer {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Segment pushes already sent, per object
    #[cfg(feature = "visualization")]
    logged: HashMap<String, u64>,

    /// Whether visualization is enabled
    enabled: bool,

    frames: u64,
}

impl RerunRenderer {
    /// Creates a renderer with visualization disabled; frames are only counted.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            #[cfg(feature = "visualization")]
            logged: HashMap::new(),
            enabled: false,
            frames: 0,
        }
    }

    /// Creates a renderer that spawns a Rerun viewer.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to watch the trails");
                Self {
                    rec: Some(rec),
                    logged: HashMap::new(),
                    enabled: true,
                    frames: 0,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a renderer - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[cfg(feature = "visualization")]
    fn log_frame(&mut self, frame: &FrameView<'_>) {
        let Some(rec) = &self.rec else {
            return;
        };
        rec.set_time_sequence("frame", frame.frame as i64);

        for record in frame.tracks() {
            let path = format!("trails/{}", record.name().replace(['/', ' '], "_"));

            // Only blocks written since the last frame are sent again
            let segments = record.segments();
            let pushed = segments.total_pushed();
            let logged = self.logged.entry(record.name().to_string()).or_insert(0);
            for block in dirty_segment_blocks(segments.capacity(), *logged, pushed) {
                let slice = segment_block(segments, block);
                let strips: Vec<[[f32; 3]; 2]> = slice.iter().map(|s| [to_f32(s.p1), to_f32(s.p2)]).collect();
                let colors: Vec<Color> = slice
                    .iter()
                    .map(|s| {
                        let [r, g, b] = s.color.to_rgb8();
                        Color::from_rgb(r, g, b)
                    })
                    .collect();
                let radii: Vec<Radius> = slice
                    .iter()
                    .map(|s| Radius::new_scene_units((frame.line_width(s) * LINE_RADIUS_SCALE).max(0.0) as f32))
                    .collect();
                let _ = rec.log(
                    format!("{}/segments/{}", path, block),
                    &LineStrips3D::new(strips).with_colors(colors).with_radii(radii),
                );
            }
            *logged = pushed;

            let ghosts = frame.ghosts(record);
            let [r, g, b] = frame.color_for(record.name()).to_rgb8();
            let _ = rec.log(
                format!("{}/afterimages", path),
                &Points3D::new(ghosts.iter().map(|p| to_f32(p.position)))
                    .with_colors(ghosts.iter().map(|p| [r, g, b, (p.alpha * 255.0).round() as u8]))
                    .with_radii(ghosts.iter().map(|p| Radius::new_scene_units(p.radius as f32))),
            );

            let (markers, marker_colors): (Vec<[f32; 3]>, Vec<Color>) = frame
                .marker(record)
                .map(|(position, color)| {
                    let [r, g, b] = color.to_rgb8();
                    (to_f32(position), Color::from_rgb(r, g, b))
                })
                .into_iter()
                .unzip();
            let _ = rec.log(
                format!("{}/position", path),
                &Points3D::new(markers)
                    .with_colors(marker_colors)
                    .with_radii([Radius::new_scene_units(frame.style.sphere_radius as f32)]),
            );
        }
    }
}

#[cfg(feature = "visualization")]
fn to_f32(sample: gesture_core::Sample) -> [f32; 3] {
    [sample.x as f32, sample.y as f32, sample.z as f32]
}

impl Renderer for RerunRenderer {
    fn render(&mut self, frame: &FrameView<'_>) {
        self.frames += 1;
        #[cfg(feature = "visualization")]
        self.log_frame(frame);
        #[cfg(not(feature = "visualization"))]
        let _ = frame;
    }

    fn finish(&mut self) {
        tracing::debug!("rerun renderer drew {} frames", self.frames);
    }
}
