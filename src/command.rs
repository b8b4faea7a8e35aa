//! Interactive playback commands, one per input line.
use crate::log_store::LogSampleStore;
use crate::playback::PlaybackController;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const HELP: &str = "Usage:
    time: Shows momentary time in percentage
    reset: Resets animation
    set time <value>: Sets the time to value [in percent]
    p: Pauses the animation
    r: Resumes the animation
    +: Steps one frame forward while paused
    -: Steps one frame back while paused
    sec: Shows log seconds elapsed since the start
    rtf: Measures the real-time factor";

/// Reason a line is not a valid command
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CommandSyntaxError {
    #[error("Empty command")]
    Empty,
    #[error("Invalid percent value {0:?}")]
    InvalidPercent(String),
    #[error("Unrecognized command {0:?}")]
    Unrecognized(String),
}

/// A parsed interactive command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Help,
    /// Print the current position in percent
    QueryTime,
    /// Seek to the first frame
    Reset,
    /// Seek to a percentage, already clamped to `[0, 100]`
    SeekPercent(f64),
    Pause,
    Resume,
    /// Move by a number of frames while paused
    Step(isize),
    /// Print log seconds elapsed since the first sample
    QuerySeconds,
    /// Measure and print the real-time factor
    QueryRtf,
    Unknown,
}

impl FromStr for Command {
    type Err = CommandSyntaxError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [] => Err(CommandSyntaxError::Empty),
            ["help"] => Ok(Command::Help),
            ["time"] => Ok(Command::QueryTime),
            ["reset"] => Ok(Command::Reset),
            ["set", "time", value] => {
                let percent = value
                    .parse::<f64>()
                    .ok()
                    .filter(|p| p.is_finite())
                    .ok_or_else(|| CommandSyntaxError::InvalidPercent(value.to_string()))?;
                let clamped = percent.clamp(0.0, 100.0);
                if clamped != percent {
                    log::warn!("Seek percent {} clamped to {}", percent, clamped);
                }
                Ok(Command::SeekPercent(clamped))
            }
            ["p"] => Ok(Command::Pause),
            ["r"] => Ok(Command::Resume),
            ["+"] => Ok(Command::Step(1)),
            ["-"] => Ok(Command::Step(-1)),
            ["sec"] => Ok(Command::QuerySeconds),
            ["rtf"] => Ok(Command::QueryRtf),
            _ => Err(CommandSyntaxError::Unrecognized(line.trim().to_string())),
        }
    }
}

impl Command {
    /// Parses a line, mapping every syntax error to [`Command::Unknown`]
    pub fn parse(line: &str) -> Self {
        line.parse().unwrap_or_else(|e: CommandSyntaxError| {
            log::debug!("{}", e);
            Command::Unknown
        })
    }
}

/// Executes commands against the shared playback state
pub struct CommandConsole {
    controller: Arc<PlaybackController>,
    store: Arc<LogSampleStore>,
    time_scale: f64,
    rtf_window: Duration,
}

impl CommandConsole {
    /// Creates a console
    /// # Arguments
    /// * `controller` - Playback state shared with the render loop
    /// * `store` - Samples being replayed
    /// * `time_scale` - Log time units per second
    /// * `rtf_window` - Wall-clock time the `rtf` command samples over
    pub fn new(
        controller: Arc<PlaybackController>,
        store: Arc<LogSampleStore>,
        time_scale: f64,
        rtf_window: Duration,
    ) -> Self {
        Self {
            controller,
            store,
            time_scale,
            rtf_window,
        }
    }
    /// Executes one command, writing any response to `out`
    /// # Errors
    /// * If writing the response fails
    pub fn dispatch<W: Write>(&self, command: Command, out: &mut W) -> io::Result<()> {
        match command {
            Command::Help => writeln!(out, "{}", HELP),
            Command::QueryTime => writeln!(out, "{}", self.controller.query_percent()),
            Command::Reset => {
                self.controller.seek_percent(0.0);
                Ok(())
            }
            Command::SeekPercent(percent) => {
                self.controller.seek_percent(percent);
                Ok(())
            }
            Command::Pause => {
                self.controller.pause();
                Ok(())
            }
            Command::Resume => {
                self.controller.resume();
                Ok(())
            }
            Command::Step(delta) => {
                self.controller.step(delta);
                Ok(())
            }
            Command::QuerySeconds => {
                let frame = self.controller.snapshot().frame;
                let elapsed = self.store.elapsed_at_frame(frame).unwrap_or(0.0);
                writeln!(out, "{}", elapsed / self.time_scale)
            }
            Command::QueryRtf => writeln!(out, "{}", self.measure_rtf()),
            Command::Unknown => writeln!(out, "unknown input command"),
        }
    }
    /// Log seconds replayed per wall-clock second over the sampling window.
    ///
    /// Sleeps on the calling thread without holding the playback lock. A wrap or seek
    /// inside the window makes the result meaningless, often negative.
    pub fn measure_rtf(&self) -> f64 {
        let log_time = |frame| self.store.sample_at_frame(frame).map_or(0.0, |s| s.time);
        let start = log_time(self.controller.snapshot().frame);
        let wall = Instant::now();
        thread::sleep(self.rtf_window);
        let end = log_time(self.controller.snapshot().frame);
        (end - start) / self.time_scale / wall.elapsed().as_secs_f64()
    }
    /// Reads commands line by line until the input closes
    /// # Arguments
    /// * `input` - Line source, typically locked stdin
    /// * `out` - Response sink, typically stdout
    /// # Errors
    /// * If reading a line or writing a response fails
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut out: W) -> io::Result<()> {
        writeln!(out, "type 'help' for help")?;
        out.flush()?;
        for line in input.lines() {
            self.dispatch(Command::parse(&line?), &mut out)?;
            out.flush()?;
        }
        log::info!("Command input closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecodedLog;
    use crate::log_store::LogFields;
    use crate::playback::PlaybackMode;

    fn console(frames: usize) -> CommandConsole {
        let rows: String = (0..frames)
            .map(|i| format!("{},0,0,0,1,0,0,0\n", i * 500_000))
            .collect();
        let text = format!(
            "TIME_StartTime,LPOS_X,LPOS_Y,LPOS_Z,ATT_qw,ATT_qx,ATT_qy,ATT_qz\n{}",
            rows
        );
        let log = DecodedLog::from_reader(text.as_bytes()).unwrap();
        let store =
            LogSampleStore::build(&log.rows, &log.column_index(), &LogFields::default(), 1)
                .unwrap();
        CommandConsole::new(
            Arc::new(PlaybackController::new(frames)),
            Arc::new(store),
            1e6,
            Duration::from_millis(1),
        )
    }

    fn run(console: &CommandConsole, input: &str) -> String {
        let mut out = Vec::new();
        console.run(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_every_command_form() {
        let cases = [
            ("help", Command::Help),
            ("time", Command::QueryTime),
            ("reset", Command::Reset),
            ("set time 40", Command::SeekPercent(40.0)),
            ("  set   time 12.5 ", Command::SeekPercent(12.5)),
            ("p", Command::Pause),
            ("r", Command::Resume),
            ("+", Command::Step(1)),
            ("-", Command::Step(-1)),
            ("sec", Command::QuerySeconds),
            ("rtf", Command::QueryRtf),
        ];
        for (line, expected) in cases {
            assert_eq!(line.parse::<Command>(), Ok(expected), "{}", line);
        }
    }

    #[test]
    fn seek_argument_is_clamped() {
        assert_eq!(Command::parse("set time 150"), Command::SeekPercent(100.0));
        assert_eq!(Command::parse("set time -3"), Command::SeekPercent(0.0));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandSyntaxError::Empty));
        assert_eq!(
            "set time abc".parse::<Command>(),
            Err(CommandSyntaxError::InvalidPercent("abc".to_string()))
        );
        assert_eq!(
            "set time NaN".parse::<Command>(),
            Err(CommandSyntaxError::InvalidPercent("NaN".to_string()))
        );
        assert_eq!(
            "jump".parse::<Command>(),
            Err(CommandSyntaxError::Unrecognized("jump".to_string()))
        );
        assert_eq!(Command::parse("set time"), Command::Unknown);
        assert_eq!(Command::parse("help me"), Command::Unknown);
    }

    #[test]
    fn unknown_input_leaves_state_alone() {
        let console = console(10);
        let output = run(&console, "bogus\n");
        assert_eq!(output, "type 'help' for help\nunknown input command\n");
        assert_eq!(console.controller.snapshot().frame, 0);
        assert_eq!(console.controller.snapshot().mode, PlaybackMode::Running);
    }

    #[test]
    fn seek_then_query() {
        let console = console(10);
        let output = run(&console, "set time 50\ntime\nsec\n");
        assert_eq!(output, "type 'help' for help\n50\n2.5\n");
    }

    #[test]
    fn pause_step_resume() {
        let console = console(10);
        run(&console, "+\np\n+\n+\n-\n");
        let state = console.controller.snapshot();
        assert_eq!(state.frame, 1);
        assert_eq!(state.mode, PlaybackMode::Paused);
        run(&console, "r\nreset\n");
        let state = console.controller.snapshot();
        assert_eq!(state.frame, 0);
        assert_eq!(state.mode, PlaybackMode::Running);
    }

    #[test]
    fn help_lists_commands() {
        let output = run(&console(3), "help\n");
        assert!(output.contains("set time <value>"));
        assert!(output.contains("rtf"));
    }

    #[test]
    fn rtf_is_negative_after_seeking_back() {
        let mut console = console(10);
        console.rtf_window = Duration::from_millis(200);
        console.controller.pause();
        console.controller.seek_percent(50.0);
        let controller = Arc::clone(&console.controller);
        let seeker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            controller.seek_percent(0.0);
        });
        assert!(console.measure_rtf() < 0.0);
        seeker.join().unwrap();
    }

    #[test]
    fn rtf_is_zero_while_paused() {
        let console = console(10);
        console.controller.pause();
        assert_eq!(console.measure_rtf(), 0.0);
    }
}
