//! Drawing surfaces for the replay animation.
use crate::log_store::Sample;
use crate::render::ViewWindow;
use crate::ReplayError;
use nalgebra::{Point3, UnitQuaternion};

/// Identifies a polyline previously drawn on a canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolylineHandle(pub usize);

/// A 3D surface the animation draws on once per render tick
///
/// Implementations must not assume the previous frame finished drawing.
pub trait Canvas {
    /// Sets the visible axis ranges
    /// # Arguments
    /// * `window` - The window to show
    /// # Errors
    /// * If the surface rejects the update
    fn set_bounds(&mut self, window: &ViewWindow) -> Result<(), ReplayError>;
    /// Draws a new polyline
    /// # Arguments
    /// * `points` - Ordered vertices of the line
    /// # Returns
    /// * A handle for later updates
    /// # Errors
    /// * If the surface rejects the line
    fn draw_polyline(&mut self, points: &[Point3<f64>]) -> Result<PolylineHandle, ReplayError>;
    /// Replaces the vertices of an existing polyline
    /// # Arguments
    /// * `handle` - Handle returned by `draw_polyline`
    /// * `points` - New ordered vertices, may be empty to hide the line
    /// # Errors
    /// * If the surface rejects the update
    fn update_polyline(
        &mut self,
        handle: PolylineHandle,
        points: &[Point3<f64>],
    ) -> Result<(), ReplayError>;
}

const LINE_COLORS: [(u8, u8, u8); 3] = [(0, 255, 255), (255, 255, 255), (255, 128, 128)];

/// Canvas backed by a rerun recording stream
pub struct RerunCanvas {
    rec: rerun::RecordingStream,
    line_count: usize,
}

impl RerunCanvas {
    /// Creates a canvas logging into `rec`
    pub fn new(rec: rerun::RecordingStream) -> Self {
        Self { rec, line_count: 0 }
    }
    /// Moves the `frame` timeline to the current render tick
    pub fn set_tick(&self, tick: i64) {
        self.rec.set_time_sequence("frame", tick);
    }
    /// Moves the `log_time` timeline
    /// # Arguments
    /// * `log_seconds` - Log time of the shown sample in seconds since the first sample
    pub fn set_log_time(&self, log_seconds: f64) {
        self.rec.set_time_seconds("log_time", log_seconds);
    }
    /// Logs position and Euler angles of a sample as scalar series
    /// # Arguments
    /// * `sample` - The sample on screen
    /// # Errors
    /// * If the data cannot be logged to the recording stream
    pub fn log_sample_telemetry(&self, sample: &Sample) -> Result<(), ReplayError> {
        let (roll, pitch, yaw) = UnitQuaternion::from_quaternion(sample.attitude).euler_angles();
        for (name, value) in [
            ("position/x", sample.position.x),
            ("position/y", sample.position.y),
            ("position/z", sample.position.z),
            ("orientation/roll", roll),
            ("orientation/pitch", pitch),
            ("orientation/yaw", yaw),
        ] {
            self.rec.log(name, &rerun::Scalar::new(value))?;
        }
        Ok(())
    }
}

impl Canvas for RerunCanvas {
    fn set_bounds(&mut self, window: &ViewWindow) -> Result<(), ReplayError> {
        let c = window.center;
        let half = (window.span / 2.0) as f32;
        self.rec.log(
            "world/view_window",
            &rerun::Boxes3D::from_centers_and_half_sizes(
                [rerun::external::glam::Vec3::new(c.x as f32, c.y as f32, c.z as f32)],
                [rerun::external::glam::Vec3::splat(half)],
            )
            .with_colors([rerun::Color::from_rgb(128, 128, 128)]),
        )?;
        Ok(())
    }

    fn draw_polyline(&mut self, points: &[Point3<f64>]) -> Result<PolylineHandle, ReplayError> {
        let handle = PolylineHandle(self.line_count);
        self.line_count += 1;
        self.update_polyline(handle, points)?;
        Ok(handle)
    }

    fn update_polyline(
        &mut self,
        handle: PolylineHandle,
        points: &[Point3<f64>],
    ) -> Result<(), ReplayError> {
        let strip = points
            .iter()
            .map(|p| (p.x as f32, p.y as f32, p.z as f32))
            .collect::<Vec<(f32, f32, f32)>>();
        let (r, g, b) = LINE_COLORS[handle.0 % LINE_COLORS.len()];
        self.rec.log(
            format!("world/vehicle/line_{}", handle.0),
            &rerun::LineStrips3D::new([strip])
                .with_colors([rerun::Color::from_rgb(r, g, b)])
                .with_radii([0.01]),
        )?;
        Ok(())
    }
}

/// Canvas keeping the latest bounds and polylines in memory
///
/// Backs headless replays, where nothing is displayed.
#[derive(Debug, Default)]
pub struct MemoryCanvas {
    /// Last window passed to `set_bounds`
    pub bounds: Option<ViewWindow>,
    /// Current vertices of every polyline, indexed by handle
    pub lines: Vec<Vec<Point3<f64>>>,
    /// Number of `update_polyline` calls
    pub updates: usize,
}

impl Canvas for MemoryCanvas {
    fn set_bounds(&mut self, window: &ViewWindow) -> Result<(), ReplayError> {
        self.bounds = Some(*window);
        Ok(())
    }

    fn draw_polyline(&mut self, points: &[Point3<f64>]) -> Result<PolylineHandle, ReplayError> {
        self.lines.push(points.to_vec());
        Ok(PolylineHandle(self.lines.len() - 1))
    }

    fn update_polyline(
        &mut self,
        handle: PolylineHandle,
        points: &[Point3<f64>],
    ) -> Result<(), ReplayError> {
        let line = self
            .lines
            .get_mut(handle.0)
            .ok_or(ReplayError::UnknownPolyline(handle.0))?;
        *line = points.to_vec();
        self.updates += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_canvas_tracks_lines() {
        let mut canvas = MemoryCanvas::default();
        let a = canvas.draw_polyline(&[Point3::origin()]).unwrap();
        let b = canvas.draw_polyline(&[]).unwrap();
        assert_ne!(a, b);
        canvas
            .update_polyline(b, &[Point3::new(1.0, 2.0, 3.0)])
            .unwrap();
        assert_eq!(canvas.lines[1], vec![Point3::new(1.0, 2.0, 3.0)]);
        assert_eq!(canvas.updates, 1);
        assert!(canvas.update_polyline(PolylineHandle(7), &[]).is_err());
    }

    #[test]
    fn memory_canvas_keeps_last_bounds() {
        let mut canvas = MemoryCanvas::default();
        canvas.set_bounds(&ViewWindow::centered_at_origin(2.0)).unwrap();
        let window = ViewWindow {
            center: Point3::new(1.0, 0.0, 0.0),
            span: 4.0,
        };
        canvas.set_bounds(&window).unwrap();
        assert_eq!(canvas.bounds, Some(window));
    }
}
