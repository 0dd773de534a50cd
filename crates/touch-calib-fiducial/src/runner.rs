//! Off-thread execution of the detection sweep.
//!
//! The sweep performs many image-processing passes and must not run on an
//! interactive caller's primary thread. [`spawn_detection`] moves one sweep
//! onto a dedicated thread and hands back a pollable handle. Callers are
//! expected to serialize sweeps (one in flight per image source);
//! abandoning a handle is safe, the sweep runs to completion or budget
//! expiry and its result is discarded.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use touch_calib_core::GrayBuffer;

use crate::params::SweepConfig;
use crate::pipeline::{detect_markers, DetectionReport};

/// Handle to a detection sweep running on its own thread.
#[derive(Debug)]
pub struct DetectionHandle {
    rx: Receiver<DetectionReport>,
    join: Option<JoinHandle<()>>,
}

/// Run `detect_markers` on a dedicated thread.
pub fn spawn_detection(image: GrayBuffer, cfg: SweepConfig) -> DetectionHandle {
    let (tx, rx) = mpsc::channel();
    let join = thread::spawn(move || {
        let report = detect_markers(&image.view(), &cfg);
        // The receiver may be gone if the caller abandoned the sweep.
        let _ = tx.send(report);
    });
    DetectionHandle {
        rx,
        join: Some(join),
    }
}

impl DetectionHandle {
    /// Non-blocking poll. Returns the report once, as soon as the sweep has
    /// finished.
    pub fn try_result(&mut self) -> Option<DetectionReport> {
        match self.rx.try_recv() {
            Ok(report) => {
                self.reap();
                Some(report)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.reap();
                None
            }
        }
    }

    /// Block until the sweep finishes. A worker that died without reporting
    /// yields an empty failed report.
    pub fn wait(mut self) -> DetectionReport {
        let report = self.rx.recv().unwrap_or_else(|_| {
            log::error!("detection worker exited without a report");
            DetectionReport {
                markers: Vec::new(),
                strategy: None,
                dictionary: None,
                elapsed: Duration::ZERO,
                success: false,
            }
        });
        self.reap();
        report
    }

    fn reap(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn wait_returns_a_report_for_a_blank_image() {
        let img = GrayBuffer::filled(64, 64, 255);
        let handle = spawn_detection(img, SweepConfig::default());
        let report = handle.wait();
        assert!(!report.success);
    }

    #[test]
    fn polling_eventually_yields_a_report() {
        let img = GrayBuffer::filled(64, 64, 255);
        let mut handle = spawn_detection(img, SweepConfig::default());

        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            if let Some(report) = handle.try_result() {
                assert!(!report.success);
                break;
            }
            assert!(Instant::now() < deadline, "sweep never reported");
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
