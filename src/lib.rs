//! # Flight Log Replay
//! This crate replays recorded vehicle flight logs as an animated 3D wireframe.
//! It decodes a CSV export of a flight log, reconstructs the vehicle attitude at every
//! sample, and drives a frame-by-frame animation under interactive playback control.
//! ## Features
//! - Euler angle, quaternion and rotation matrix conversions
//! - Zero-quaternion fallback to logged Euler angles
//! - Strided playback with pause, resume, single-step, seek and speed queries
//! - Observed and desired (setpoint) attitude overlays
//! - Integration with the `rerun` crate for visualization
pub mod attitude;
pub mod canvas;
pub mod command;
pub mod config;
pub mod decoder;
pub mod log_store;
pub mod playback;
pub mod render;

pub use canvas::{Canvas, MemoryCanvas, PolylineHandle, RerunCanvas};
pub use command::{Command, CommandConsole, CommandSyntaxError};
pub use decoder::{ColumnIndex, DecodedLog};
pub use log_store::{LogFields, LogSampleStore, Sample};
pub use playback::{PlaybackController, PlaybackMode, PlaybackState};
pub use render::{FrameAnimator, FrameRenderer, RenderedGeometry, RigidBodyModel, ViewWindow};

#[derive(thiserror::Error, Debug)]
/// Represents errors that can occur while loading or replaying a flight log
pub enum ReplayError {
    /// A mandatory field is absent from the log header or from a row
    #[error("Missing field {field} (row: {row:?})")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Row the field was missing from, `None` when absent from the header
        row: Option<usize>,
    },
    /// A cell could not be parsed as a floating point number
    #[error("Malformed number {value:?} in row {row}, column {column}")]
    MalformedNumeric {
        /// Zero-based data row
        row: usize,
        /// Column name from the header
        column: String,
        /// The offending cell content
        value: String,
    },
    /// The log holds no data rows
    #[error("Log contains no samples")]
    EmptyLog,
    /// A configuration value is outside its valid domain
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// A frame index past the end of the playback index set
    #[error("Frame {frame} out of range for {len} playback frames")]
    FrameOutOfRange {
        /// Requested frame
        frame: usize,
        /// Number of playback frames
        len: usize,
    },
    /// A polyline handle the canvas never issued
    #[error("Unknown polyline handle {0}")]
    UnknownPolyline(usize),
    /// Error related to CSV decoding
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    /// Error related to file or terminal I/O
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Error related to YAML configuration parsing
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    /// Error related to Rerun visualization
    #[error("Rerun error: {0}")]
    RerunError(#[from] rerun::RecordingStreamError),
    /// Error related to Rerun spawn process
    #[error("Rerun spawn error: {0}")]
    RerunSpawnError(#[from] rerun::SpawnError),
}
