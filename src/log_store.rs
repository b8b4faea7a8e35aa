//! In-memory, time-ordered flight samples and the strided playback index set.
use crate::attitude::{euler_to_quaternion, is_zero_quaternion};
use crate::decoder::ColumnIndex;
use crate::ReplayError;
use nalgebra::{Quaternion, Vector3};
use rayon::prelude::*;
use serde::Deserialize;

/// One logged instant of the vehicle state
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Log timestamp in source units
    pub time: f64,
    /// Local position (x, y, z)
    pub position: Vector3<f64>,
    /// Attitude quaternion (w, x, y, z)
    pub attitude: Quaternion<f64>,
    /// Desired attitude, `None` when not logged
    pub attitude_setpoint: Option<Quaternion<f64>>,
}

/// Names of the log fields read into a [`Sample`]
///
/// Defaults are the column names of a PX4 sdlog2 CSV export.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogFields {
    /// Timestamp
    pub time: String,
    /// Local position x, y, z
    pub position: [String; 3],
    /// Attitude quaternion w, x, y, z
    pub attitude: [String; 4],
    /// Roll, pitch, yaw used when the attitude quaternion is all zero
    pub euler: [String; 3],
    /// Attitude setpoint quaternion w, x, y, z, optional
    pub setpoint: [String; 4],
}

impl Default for LogFields {
    fn default() -> Self {
        Self {
            time: "TIME_StartTime".to_string(),
            position: [
                "LPOS_X".to_string(),
                "LPOS_Y".to_string(),
                "LPOS_Z".to_string(),
            ],
            attitude: [
                "ATT_qw".to_string(),
                "ATT_qx".to_string(),
                "ATT_qy".to_string(),
                "ATT_qz".to_string(),
            ],
            euler: [
                "ATT_Roll".to_string(),
                "ATT_Pitch".to_string(),
                "ATT_Yaw".to_string(),
            ],
            setpoint: [
                "ATSP_qw".to_string(),
                "ATSP_qx".to_string(),
                "ATSP_qy".to_string(),
                "ATSP_qz".to_string(),
            ],
        }
    }
}

/// A mandatory value absent from a row
struct MissingCell {
    field: String,
    row: usize,
}

impl From<MissingCell> for ReplayError {
    fn from(missing: MissingCell) -> Self {
        ReplayError::MissingField {
            field: missing.field,
            row: Some(missing.row),
        }
    }
}

/// Column positions resolved once from the header
struct Columns<'a> {
    fields: &'a LogFields,
    time: usize,
    position: [usize; 3],
    attitude: [usize; 4],
    euler: Option<[usize; 3]>,
    setpoint: Option<[usize; 4]>,
}

impl<'a> Columns<'a> {
    fn resolve(fields: &'a LogFields, index: &ColumnIndex) -> Result<Self, ReplayError> {
        let required = |name: &String| {
            index.get(name).copied().ok_or_else(|| ReplayError::MissingField {
                field: name.clone(),
                row: None,
            })
        };
        let optional = |names: &[String]| -> Option<Vec<usize>> {
            names.iter().map(|n| index.get(n).copied()).collect()
        };
        Ok(Self {
            fields,
            time: required(&fields.time)?,
            position: [
                required(&fields.position[0])?,
                required(&fields.position[1])?,
                required(&fields.position[2])?,
            ],
            attitude: [
                required(&fields.attitude[0])?,
                required(&fields.attitude[1])?,
                required(&fields.attitude[2])?,
                required(&fields.attitude[3])?,
            ],
            euler: optional(&fields.euler).map(|c| [c[0], c[1], c[2]]),
            setpoint: optional(&fields.setpoint).map(|c| [c[0], c[1], c[2], c[3]]),
        })
    }

    fn sample(&self, row_number: usize, row: &[f64]) -> Result<Sample, MissingCell> {
        let cell = |column: usize, name: &String| {
            row.get(column).copied().ok_or_else(|| MissingCell {
                field: name.clone(),
                row: row_number,
            })
        };
        let f = self.fields;
        let time = cell(self.time, &f.time)?;
        let position = Vector3::new(
            cell(self.position[0], &f.position[0])?,
            cell(self.position[1], &f.position[1])?,
            cell(self.position[2], &f.position[2])?,
        );
        let logged = Quaternion::new(
            cell(self.attitude[0], &f.attitude[0])?,
            cell(self.attitude[1], &f.attitude[1])?,
            cell(self.attitude[2], &f.attitude[2])?,
            cell(self.attitude[3], &f.attitude[3])?,
        );
        let attitude = if is_zero_quaternion(&logged) {
            let euler = self.euler.ok_or_else(|| MissingCell {
                field: f.euler[0].clone(),
                row: row_number,
            })?;
            euler_to_quaternion(
                cell(euler[0], &f.euler[0])?,
                cell(euler[1], &f.euler[1])?,
                cell(euler[2], &f.euler[2])?,
            )
        } else {
            logged
        };
        let attitude_setpoint = match self.setpoint {
            Some(c) => {
                let q = Quaternion::new(
                    cell(c[0], &f.setpoint[0])?,
                    cell(c[1], &f.setpoint[1])?,
                    cell(c[2], &f.setpoint[2])?,
                    cell(c[3], &f.setpoint[3])?,
                );
                (!is_zero_quaternion(&q)).then_some(q)
            }
            None => None,
        };
        Ok(Sample {
            time,
            position,
            attitude,
            attitude_setpoint,
        })
    }
}

/// Ordered flight samples with the playback index set derived from them
#[derive(Debug, Clone)]
pub struct LogSampleStore {
    samples: Vec<Sample>,
    playback_indices: Vec<usize>,
}

impl LogSampleStore {
    /// Builds the store from decoded rows
    /// # Arguments
    /// * `rows` - Numeric rows in log order
    /// * `column_index` - Field name to column lookup for `rows`
    /// * `fields` - Names of the fields to read
    /// * `stride` - Keep every `stride`-th row as a playback frame
    /// # Returns
    /// * The store, with attitudes resolved once per row
    /// # Errors
    /// * `MissingField` if a mandatory field is absent, or a zero attitude quaternion
    ///   needs Euler angles that were not logged
    /// * `EmptyLog` if there are no rows
    /// * `InvalidConfig` if `stride` is zero
    pub fn build(
        rows: &[Vec<f64>],
        column_index: &ColumnIndex,
        fields: &LogFields,
        stride: usize,
    ) -> Result<Self, ReplayError> {
        if stride == 0 {
            return Err(ReplayError::InvalidConfig(
                "playback stride must be at least 1".to_string(),
            ));
        }
        let columns = Columns::resolve(fields, column_index)?;
        if columns.setpoint.is_none() {
            log::warn!("Attitude setpoint not logged, desired overlay disabled");
        }
        if rows.is_empty() {
            return Err(ReplayError::EmptyLog);
        }
        let samples = rows
            .par_iter()
            .enumerate()
            .map(|(i, row)| columns.sample(i, row))
            .collect::<Result<Vec<Sample>, MissingCell>>()?;
        let playback_indices: Vec<usize> = (0..samples.len()).step_by(stride).collect();
        log::info!(
            "Loaded {} samples, {} playback frames (stride {})",
            samples.len(),
            playback_indices.len(),
            stride
        );
        Ok(Self {
            samples,
            playback_indices,
        })
    }
    /// Number of raw samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    /// Always false: an empty log is rejected by [`LogSampleStore::build`]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    /// Raw sample indices used as animation frames, strictly increasing
    pub fn playback_indices(&self) -> &[usize] {
        &self.playback_indices
    }
    pub fn playback_len(&self) -> usize {
        self.playback_indices.len()
    }
    /// Raw sample index behind a playback frame
    pub fn sample_index(&self, frame: usize) -> Option<usize> {
        self.playback_indices.get(frame).copied()
    }
    /// Sample shown at a playback frame
    pub fn sample_at_frame(&self, frame: usize) -> Option<&Sample> {
        self.samples.get(self.sample_index(frame)?)
    }
    /// Log time elapsed between the first sample and the sample at `frame`
    /// # Returns
    /// * Elapsed time in source units, `None` if `frame` is out of range
    pub fn elapsed_at_frame(&self, frame: usize) -> Option<f64> {
        let start = self.samples.first()?.time;
        Some(self.sample_at_frame(frame)?.time - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodedLog;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_4;

    const HEADER: &str = "TIME_StartTime,LPOS_X,LPOS_Y,LPOS_Z,ATT_qw,ATT_qx,ATT_qy,ATT_qz,\
                          ATT_Roll,ATT_Pitch,ATT_Yaw";

    fn decode(body: &str) -> DecodedLog {
        DecodedLog::from_reader(format!("{}\n{}", HEADER, body).as_bytes()).unwrap()
    }

    fn build(log: &DecodedLog, stride: usize) -> Result<LogSampleStore, ReplayError> {
        LogSampleStore::build(&log.rows, &log.column_index(), &LogFields::default(), stride)
    }

    #[test]
    fn zero_quaternion_falls_back_to_euler() {
        let log = decode(&format!("0,1,2,3,0,0,0,0,{},0,0\n", FRAC_PI_4));
        let store = build(&log, 1).unwrap();
        let expected = euler_to_quaternion(FRAC_PI_4, 0.0, 0.0);
        assert_relative_eq!(store.samples()[0].attitude.coords, expected.coords);
        assert_eq!(store.samples()[0].position, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn logged_quaternion_used_as_is() {
        let log = decode("0,0,0,0,0.5,0.5,0.5,0.5,1.0,1.0,1.0\n");
        let store = build(&log, 1).unwrap();
        assert_eq!(
            store.samples()[0].attitude,
            Quaternion::new(0.5, 0.5, 0.5, 0.5)
        );
    }

    #[test]
    fn missing_mandatory_column() {
        let text = "TIME_StartTime,LPOS_X,LPOS_Y,ATT_qw,ATT_qx,ATT_qy,ATT_qz\n0,0,0,1,0,0,0\n";
        let log = DecodedLog::from_reader(text.as_bytes()).unwrap();
        match build(&log, 1) {
            Err(ReplayError::MissingField { field, row }) => {
                assert_eq!(field, "LPOS_Z");
                assert_eq!(row, None);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn short_row_reports_row_number() {
        let log = decode("0,0,0,0,1,0,0,0,0,0,0\n1,0,0\n");
        assert!(matches!(
            build(&log, 1),
            Err(ReplayError::MissingField { row: Some(1), .. })
        ));
    }

    #[test]
    fn euler_needed_only_for_zero_quaternion() {
        let text = "TIME_StartTime,LPOS_X,LPOS_Y,LPOS_Z,ATT_qw,ATT_qx,ATT_qy,ATT_qz\n\
                    0,0,0,0,1,0,0,0\n\
                    1,0,0,0,0,0,0,0\n";
        let log = DecodedLog::from_reader(text.as_bytes()).unwrap();
        match build(&log, 1) {
            Err(ReplayError::MissingField { field, row }) => {
                assert_eq!(field, "ATT_Roll");
                assert_eq!(row, Some(1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn setpoint_absent_or_zero_is_none() {
        let log = decode("0,0,0,0,1,0,0,0,0,0,0\n");
        assert_eq!(build(&log, 1).unwrap().samples()[0].attitude_setpoint, None);

        let text = format!(
            "{},ATSP_qw,ATSP_qx,ATSP_qy,ATSP_qz\n\
             0,0,0,0,1,0,0,0,0,0,0,0,0,0,0\n\
             1,0,0,0,1,0,0,0,0,0,0,0,1,0,0\n",
            HEADER
        );
        let log = DecodedLog::from_reader(text.as_bytes()).unwrap();
        let store = build(&log, 1).unwrap();
        assert_eq!(store.samples()[0].attitude_setpoint, None);
        assert_eq!(
            store.samples()[1].attitude_setpoint,
            Some(Quaternion::new(0.0, 1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn strided_playback_indices() {
        let body: String = (0..12).map(|t| format!("{},0,0,0,1,0,0,0,0,0,0\n", t)).collect();
        let log = decode(&body);
        assert_eq!(build(&log, 5).unwrap().playback_indices(), &[0, 5, 10]);
        let store = build(&log, 1).unwrap();
        assert_eq!(store.playback_len(), 12);
        assert_eq!(store.len(), 12);
        assert!(store.playback_indices().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rejects_zero_stride_and_empty_log() {
        let log = decode("0,0,0,0,1,0,0,0,0,0,0\n");
        assert!(matches!(build(&log, 0), Err(ReplayError::InvalidConfig(_))));
        let empty = DecodedLog::from_reader(HEADER.as_bytes()).unwrap();
        assert!(matches!(build(&empty, 1), Err(ReplayError::EmptyLog)));
    }

    #[test]
    fn frame_lookup_follows_stride() {
        let body: String = (0..10)
            .map(|t| format!("{},{},0,0,1,0,0,0,0,0,0\n", 1000 + t * 100, t))
            .collect();
        let store = build(&decode(&body), 3).unwrap();
        assert_eq!(store.sample_index(2), Some(6));
        assert_eq!(store.sample_at_frame(2).unwrap().position.x, 6.0);
        assert_eq!(store.elapsed_at_frame(3), Some(900.0));
        assert_eq!(store.sample_at_frame(4), None);
        assert_eq!(store.elapsed_at_frame(4), None);
    }
}
