//! Frame rendering: rigid-body model placement and the per-tick animation driver.
use crate::attitude::quaternion_to_rotation_matrix;
use crate::canvas::{Canvas, PolylineHandle};
use crate::config::ModelConfig;
use crate::log_store::LogSampleStore;
use crate::playback::PlaybackController;
use crate::ReplayError;
use nalgebra::{Matrix3, Point3, Vector3};
use serde::Deserialize;
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Height of the motor posts and nose marker of the quadrotor wireframe
const QUAD_MARKER: f64 = 0.1;

/// Wireframe vertices in the body frame, drawn as one polyline
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyModel {
    pub points: Vec<Point3<f64>>,
}

impl RigidBodyModel {
    /// X-frame quadrotor with motor posts, 18 vertices
    /// # Arguments
    /// * `arm_length` - Distance from the center to each motor
    pub fn quadrotor(arm_length: f64) -> Self {
        let c = arm_length * FRAC_1_SQRT_2;
        let m = QUAD_MARKER;
        let xs = [
            c, c, 0.0, m, 0.0, -c, -c, -c, 0.0, -c, -c, -c, 0.0, c, c, c, 0.0, 0.0,
        ];
        let ys = [
            -c, -c, 0.0, 0.0, 0.0, -c, -c, -c, 0.0, c, c, c, 0.0, c, c, c, 0.0, 0.0,
        ];
        let zs = [
            m, 0.0, 0.0, 0.0, 0.0, 0.0, m, 0.0, 0.0, 0.0, m, 0.0, 0.0, 0.0, m, 0.0, 0.0, m,
        ];
        Self {
            points: (0..xs.len())
                .map(|i| Point3::new(xs[i], ys[i], -zs[i]))
                .collect(),
        }
    }
    /// Fixed-wing outline: wings, fin and tail, 9 vertices
    pub fn fixed_wing() -> Self {
        let xs = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -0.2, -0.2, 0.0];
        let ys = [0.0, 0.5, -0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let zs = [0.5, -0.5, -0.5, 0.5, 0.7, 0.0, -0.1, -0.2, -0.2];
        Self {
            points: (0..xs.len())
                .map(|i| Point3::new(xs[i], ys[i], zs[i]))
                .collect(),
        }
    }
    /// Builds the model selected in the configuration
    /// # Errors
    /// * `InvalidConfig` if a custom model has fewer than two points
    pub fn from_config(config: &ModelConfig) -> Result<Self, ReplayError> {
        match config {
            ModelConfig::Quadrotor { arm_length } => Ok(Self::quadrotor(*arm_length)),
            ModelConfig::FixedWing => Ok(Self::fixed_wing()),
            ModelConfig::Custom { points } if points.len() >= 2 => Ok(Self {
                points: points.iter().map(|p| Point3::from(*p)).collect(),
            }),
            ModelConfig::Custom { .. } => Err(ReplayError::InvalidConfig(
                "custom model needs at least two points".to_string(),
            )),
        }
    }
    /// Rotates every vertex by `rotation`, then translates by `translation`
    pub fn transform(
        &self,
        rotation: &Matrix3<f64>,
        translation: &Vector3<f64>,
    ) -> Vec<Point3<f64>> {
        self.points
            .iter()
            .map(|p| Point3::from(rotation * p.coords + translation))
            .collect()
    }
}

/// Cube of visible space, `center ± span / 2` on every axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    pub center: Point3<f64>,
    pub span: f64,
}

impl ViewWindow {
    pub fn centered_at_origin(span: f64) -> Self {
        Self {
            center: Point3::origin(),
            span,
        }
    }
    /// Lower and upper limit for the x, y and z axes
    pub fn ranges(&self) -> [(f64, f64); 3] {
        let half = self.span / 2.0;
        [0, 1, 2].map(|i| (self.center[i] - half, self.center[i] + half))
    }
}

/// How the view window follows the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Centered at the origin, for attitude-only replays
    Fixed,
    /// Re-centered on the vehicle every frame
    Follow,
    /// Re-centered per axis only once the vehicle drifts past half the span
    #[default]
    Hysteresis,
}

/// Everything the canvas needs to show one frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGeometry {
    /// Playback frame that was rendered
    pub frame: usize,
    /// Raw sample index behind the frame
    pub sample_index: usize,
    /// Model placed at the logged attitude
    pub observed: Vec<Point3<f64>>,
    /// Model placed at the attitude setpoint, when one was logged
    pub desired: Option<Vec<Point3<f64>>>,
    pub window: ViewWindow,
}

/// Places the rigid-body model at the pose of a playback frame
pub struct FrameRenderer {
    store: Arc<LogSampleStore>,
    model: RigidBodyModel,
    z_sign: f64,
    window_mode: WindowMode,
    span: f64,
}

impl FrameRenderer {
    /// Creates a renderer with an unflipped vertical axis and a 2 m hysteresis window
    /// # Arguments
    /// * `store` - Samples to render
    /// * `model` - Wireframe to place at every pose
    pub fn new(store: Arc<LogSampleStore>, model: RigidBodyModel) -> Self {
        Self {
            store,
            model,
            z_sign: 1.0,
            window_mode: WindowMode::Hysteresis,
            span: 2.0,
        }
    }
    /// Sets the factor applied to the logged vertical position.
    ///
    /// Use `-1.0` to show a down-positive log with the display z axis up.
    pub fn with_z_sign(mut self, z_sign: f64) -> Self {
        self.z_sign = z_sign;
        self
    }
    pub fn with_window(mut self, mode: WindowMode, span: f64) -> Self {
        self.window_mode = mode;
        self.span = span;
        self
    }
    pub fn store(&self) -> &LogSampleStore {
        &self.store
    }
    pub fn initial_window(&self) -> ViewWindow {
        ViewWindow::centered_at_origin(self.span)
    }
    /// Renders a playback frame
    /// # Arguments
    /// * `frame` - Position in the playback index set
    /// * `previous` - Window shown for the previous frame
    /// # Returns
    /// * The placed model, the optional setpoint overlay, and the window to show
    /// # Errors
    /// * `FrameOutOfRange` if `frame` is not a valid playback frame
    pub fn render_frame(
        &self,
        frame: usize,
        previous: &ViewWindow,
    ) -> Result<RenderedGeometry, ReplayError> {
        let sample_index = self
            .store
            .sample_index(frame)
            .ok_or(ReplayError::FrameOutOfRange {
                frame,
                len: self.store.playback_len(),
            })?;
        let sample = &self.store.samples()[sample_index];
        let p = sample.position;
        let translation = Vector3::new(p.x, p.y, self.z_sign * p.z);
        let observed = self
            .model
            .transform(&quaternion_to_rotation_matrix(&sample.attitude), &translation);
        let desired = sample
            .attitude_setpoint
            .map(|q| self.model.transform(&quaternion_to_rotation_matrix(&q), &translation));
        Ok(RenderedGeometry {
            frame,
            sample_index,
            observed,
            desired,
            window: self.next_window(previous, &Point3::from(translation)),
        })
    }

    fn next_window(&self, previous: &ViewWindow, position: &Point3<f64>) -> ViewWindow {
        let center = match self.window_mode {
            WindowMode::Fixed => Point3::origin(),
            WindowMode::Follow => *position,
            WindowMode::Hysteresis => {
                let mut center = previous.center;
                for i in 0..3 {
                    if (position[i] - center[i]).abs() > self.span / 2.0 {
                        center[i] = position[i];
                    }
                }
                center
            }
        };
        ViewWindow {
            center,
            span: self.span,
        }
    }
}

/// Drives the animation: one call per render tick
pub struct FrameAnimator {
    window: ViewWindow,
    observed: Option<PolylineHandle>,
    desired: Option<PolylineHandle>,
}

impl FrameAnimator {
    pub fn new(renderer: &FrameRenderer) -> Self {
        Self {
            window: renderer.initial_window(),
            observed: None,
            desired: None,
        }
    }
    /// Advances the controller, renders the resulting frame and draws it
    /// # Arguments
    /// * `controller` - Playback state, advanced by one tick
    /// * `renderer` - Renderer for the frame
    /// * `canvas` - Surface to draw on
    /// # Returns
    /// * The geometry that was drawn
    /// # Errors
    /// * If the frame cannot be rendered or the canvas rejects an update
    pub fn on_tick<C: Canvas>(
        &mut self,
        controller: &PlaybackController,
        renderer: &FrameRenderer,
        canvas: &mut C,
    ) -> Result<RenderedGeometry, ReplayError> {
        let frame = controller.tick();
        let geometry = renderer.render_frame(frame, &self.window)?;
        self.window = geometry.window;
        canvas.set_bounds(&geometry.window)?;
        self.observed = Some(draw(canvas, self.observed, &geometry.observed)?);
        match (&geometry.desired, self.desired) {
            (Some(points), handle) => self.desired = Some(draw(canvas, handle, points)?),
            (None, Some(handle)) => canvas.update_polyline(handle, &[])?,
            (None, None) => {}
        }
        Ok(geometry)
    }
    /// Plays once through the log, stopping when playback wraps
    ///
    /// The pass ends at the first frame not after the one before it, or after
    /// `playback_len` ticks, whichever comes first.
    /// # Arguments
    /// * `controller` - Playback state, advanced once per tick
    /// * `renderer` - Renderer for each frame
    /// * `canvas` - Surface to draw on
    /// * `interval` - Minimum wall-clock time per tick
    /// # Returns
    /// * The frames rendered, in order
    /// # Errors
    /// * If a frame cannot be rendered or the canvas rejects an update
    pub fn run_pass<C: Canvas>(
        &mut self,
        controller: &PlaybackController,
        renderer: &FrameRenderer,
        canvas: &mut C,
        interval: Duration,
    ) -> Result<Vec<usize>, ReplayError> {
        let mut frames = Vec::new();
        let mut previous = controller.snapshot().frame;
        for _ in 0..controller.playback_len() {
            let tick_start = Instant::now();
            let geometry = self.on_tick(controller, renderer, canvas)?;
            log::debug!("Frame {} (sample {})", geometry.frame, geometry.sample_index);
            frames.push(geometry.frame);
            if geometry.frame <= previous {
                break;
            }
            previous = geometry.frame;
            pace(tick_start, interval);
        }
        Ok(frames)
    }
}

/// Sleeps for what is left of the tick interval
pub fn pace(tick_start: Instant, interval: Duration) {
    thread::sleep(interval.saturating_sub(tick_start.elapsed()));
}

fn draw<C: Canvas>(
    canvas: &mut C,
    handle: Option<PolylineHandle>,
    points: &[Point3<f64>],
) -> Result<PolylineHandle, ReplayError> {
    match handle {
        Some(handle) => {
            canvas.update_polyline(handle, points)?;
            Ok(handle)
        }
        None => canvas.draw_polyline(points),
    }
}
