//! Playback state machine shared between the render loop and the command loop.
//!
//! Every operation takes the single state lock exactly once, so a command can never
//! interleave with a render tick halfway through an update.
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Whether the render tick advances the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Running,
    Paused,
}

/// Current frame and mode, as observed atomically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackState {
    /// Position in the playback index set
    pub frame: usize,
    pub mode: PlaybackMode,
}

/// Owns the playback frame pointer and run/paused mode
/// # Example
/// ```
/// use flight_replay::PlaybackController;
/// let controller = PlaybackController::new(100);
/// controller.pause();
/// controller.step(1);
/// assert_eq!(controller.snapshot().frame, 1);
/// ```
#[derive(Debug)]
pub struct PlaybackController {
    state: Mutex<PlaybackState>,
    playback_len: usize,
    loop_threshold: usize,
}

impl PlaybackController {
    /// Creates a controller, running at frame 0
    ///
    /// The loop threshold is `playback_len - 2`: playback wraps two frames before the
    /// true end of the log.
    /// # Arguments
    /// * `playback_len` - Number of playback frames, at least 1
    pub fn new(playback_len: usize) -> Self {
        Self::with_loop_threshold(playback_len, playback_len.saturating_sub(2))
    }
    /// Creates a controller with an explicit loop threshold
    /// # Arguments
    /// * `playback_len` - Number of playback frames, at least 1
    /// * `loop_threshold` - Frame at which a running tick wraps back to 0
    pub fn with_loop_threshold(playback_len: usize, loop_threshold: usize) -> Self {
        Self {
            state: Mutex::new(PlaybackState {
                frame: 0,
                mode: PlaybackMode::Running,
            }),
            playback_len: playback_len.max(1),
            loop_threshold,
        }
    }

    // Every writer leaves the state valid, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn last_frame(&self) -> usize {
        self.playback_len - 1
    }
    pub fn playback_len(&self) -> usize {
        self.playback_len
    }
    pub fn loop_threshold(&self) -> usize {
        self.loop_threshold
    }
    /// Returns the current frame and mode
    pub fn snapshot(&self) -> PlaybackState {
        *self.lock()
    }
    pub fn pause(&self) {
        self.lock().mode = PlaybackMode::Paused;
    }
    pub fn resume(&self) {
        self.lock().mode = PlaybackMode::Running;
    }
    /// Moves the frame by `delta` while paused
    ///
    /// The result is clamped to the valid frame range. Ignored while running.
    /// # Returns
    /// * The state after the step
    pub fn step(&self, delta: isize) -> PlaybackState {
        let mut state = self.lock();
        if state.mode == PlaybackMode::Running {
            log::debug!("Step ignored while running");
            return *state;
        }
        state.frame = state
            .frame
            .saturating_add_signed(delta)
            .min(self.last_frame());
        *state
    }
    /// Jumps to a percentage of the playback
    ///
    /// Callers are expected to pass `percent` within `[0, 100]`; the resulting frame is
    /// still clamped to the last frame so that 100% stays in range.
    /// # Arguments
    /// * `percent` - Target position in percent of the playback length
    /// # Returns
    /// * The frame that was set
    pub fn seek_percent(&self, percent: f64) -> usize {
        let target = (percent / 100.0 * self.playback_len as f64).floor();
        // `as` saturates: negative and NaN become 0.
        let frame = (target as usize).min(self.last_frame());
        self.lock().frame = frame;
        frame
    }
    /// Advances one render frame
    ///
    /// While running the frame moves forward by one and wraps to 0 once it reaches
    /// the loop threshold.
    /// # Returns
    /// * The frame to render
    pub fn tick(&self) -> usize {
        let mut state = self.lock();
        if state.mode == PlaybackMode::Running {
            state.frame += 1;
            if state.frame >= self.loop_threshold {
                state.frame = 0;
            }
        }
        if state.frame >= self.playback_len {
            log::info!("looping");
            state.frame = 0;
        }
        state.frame
    }
    /// Current position in percent of the playback length
    pub fn query_percent(&self) -> f64 {
        self.lock().frame as f64 / self.playback_len as f64 * 100.0
    }
}
