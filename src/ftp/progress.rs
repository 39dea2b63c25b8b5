//! Throttled transfer progress reporting.
//!
//! Rendering is a pure function of one [`ProgressSample`]; the reporter
//! only adds rate limiting so small chunk sizes cannot flood the terminal.
//! Lines go to stderr, carriage-return style, so piped stdout stays clean.

use crate::ftp::types::{ProgressSample, TransferDirection};
use std::io::Write;
use std::time::{Duration, Instant};

/// Minimum time between progress lines.
const MIN_EMIT_INTERVAL: Duration = Duration::from_millis(120);
/// A byte jump this large is emitted even inside the interval.
const MIN_EMIT_DELTA: u64 = 1024 * 1024;

/// Renders progress for one file at a time.
pub struct ProgressReporter {
    enabled: bool,
    file_name: String,
    direction: TransferDirection,
    total: Option<u64>,
    started: Instant,
    last_emit: Option<(Instant, u64)>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// A reporter that swallows everything (quiet mode, tests).
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            file_name: String::new(),
            direction: TransferDirection::Upload,
            total: None,
            started: Instant::now(),
            last_emit: None,
        }
    }

    /// Start reporting for one file. `offset` is the resume position the
    /// transfer continues from.
    pub fn begin(
        &mut self,
        file_name: &str,
        direction: TransferDirection,
        total: Option<u64>,
        offset: u64,
    ) {
        self.file_name = file_name.to_string();
        self.direction = direction;
        self.total = total;
        self.started = Instant::now();
        self.last_emit = None;
        if self.enabled && offset > 0 {
            self.emit(offset, Instant::now());
        }
    }

    /// Record the running byte total; emits a line when the throttle allows.
    pub fn update(&mut self, transferred: u64) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        if should_emit(self.last_emit, now, transferred) {
            self.emit(transferred, now);
        }
    }

    /// Emit the final line and terminate it with a newline.
    pub fn finish(&mut self, transferred: u64) {
        if !self.enabled {
            return;
        }
        let line = render(&self.sample(transferred), self.started.elapsed());
        eprintln!("\r{}", line);
        self.last_emit = None;
    }

    fn emit(&mut self, transferred: u64, now: Instant) {
        let line = render(&self.sample(transferred), self.started.elapsed());
        eprint!("\r{}", line);
        let _ = std::io::stderr().flush();
        self.last_emit = Some((now, transferred));
    }

    fn sample(&self, transferred: u64) -> ProgressSample {
        ProgressSample {
            file_name: self.file_name.clone(),
            direction: self.direction,
            transferred,
            total: self.total,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Throttle decision: first sample always passes, later ones when the
/// interval elapsed or the byte delta is large enough.
fn should_emit(last: Option<(Instant, u64)>, now: Instant, transferred: u64) -> bool {
    match last {
        None => true,
        Some((at, bytes)) => {
            now.duration_since(at) >= MIN_EMIT_INTERVAL
                || transferred.saturating_sub(bytes) >= MIN_EMIT_DELTA
        }
    }
}

/// Render one progress line. Percentage when the total is known, raw byte
/// count otherwise (some servers cannot answer SIZE).
pub fn render(sample: &ProgressSample, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64().max(0.001);
    let speed = (sample.transferred as f64 / secs) as u64;
    match sample.total {
        Some(total) if total > 0 => {
            let percent = sample.transferred as f64 / total as f64 * 100.0;
            format!(
                "{} {}: {:.1}% ({}/{} bytes, {}/s)",
                sample.direction.label(),
                sample.file_name,
                percent,
                sample.transferred,
                total,
                format_bytes(speed)
            )
        }
        _ => format!(
            "{} {}: {} bytes ({}/s)",
            sample.direction.label(),
            sample.file_name,
            sample.transferred,
            format_bytes(speed)
        ),
    }
}

/// Human-readable byte count (binary units).
pub fn format_bytes(n: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    const GIB: u64 = 1024 * MIB;
    if n >= GIB {
        format!("{:.1} GiB", n as f64 / GIB as f64)
    } else if n >= MIB {
        format!("{:.1} MiB", n as f64 / MIB as f64)
    } else if n >= KIB {
        format!("{:.1} KiB", n as f64 / KIB as f64)
    } else {
        format!("{} B", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftp::types::TransferDirection;

    fn sample(transferred: u64, total: Option<u64>) -> ProgressSample {
        ProgressSample {
            file_name: "a.bin".into(),
            direction: TransferDirection::Download,
            transferred,
            total,
        }
    }

    #[test]
    fn render_with_known_total() {
        let line = render(&sample(50, Some(200)), Duration::from_secs(1));
        assert!(line.starts_with("get a.bin: 25.0% (50/200 bytes"), "{line}");
    }

    #[test]
    fn render_with_unknown_total() {
        let line = render(&sample(4096, None), Duration::from_secs(1));
        assert!(line.contains("4096 bytes"), "{line}");
        assert!(!line.contains('%'));
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn throttle_suppresses_rapid_samples() {
        let t0 = Instant::now();
        assert!(should_emit(None, t0, 10));
        // Same instant, tiny delta: suppressed.
        assert!(!should_emit(Some((t0, 10)), t0, 20));
        // Interval elapsed: emitted.
        assert!(should_emit(Some((t0, 10)), t0 + Duration::from_millis(150), 20));
        // Large byte jump inside the interval: emitted.
        assert!(should_emit(Some((t0, 10)), t0, 10 + MIN_EMIT_DELTA));
    }
}
