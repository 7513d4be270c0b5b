//! Client-side audio capture helpers.
//!
//! Thin lifecycle wrapper over a platform capture capability: initialize once,
//! expose a normalized input level, tear down cleanly. No protocol logic.

use anyhow::Result;

/// Platform media-capture capability.
pub trait AudioSource: Send {
    /// Acquires the underlying device or track.
    fn start(&mut self) -> Result<()>;

    /// Reads up to `buf.len()` signed 16-bit samples, returning the count.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;

    /// Releases the device. Must be safe to call when not started.
    fn stop(&mut self);
}

/// Capture pipeline with an idempotent initialize/cleanup lifecycle.
pub struct AudioPipeline<S> {
    source: S,
    initialized: bool,
}

impl<S: AudioSource> AudioPipeline<S> {
    pub fn new(source: S) -> AudioPipeline<S> {
        AudioPipeline {
            source,
            initialized: false,
        }
    }

    /// Starts the capture source. Returns `Ok(true)` immediately when already
    /// initialized; a failed start leaves the pipeline fully reset.
    pub fn initialize(&mut self) -> Result<bool> {
        if self.initialized {
            return Ok(true);
        }
        match self.source.start() {
            Ok(()) => {
                self.initialized = true;
                Ok(true)
            }
            Err(e) => {
                self.source.stop();
                self.initialized = false;
                Err(e)
            }
        }
    }

    /// Stops the source and returns the pipeline to its pristine state.
    pub fn cleanup(&mut self) {
        self.source.stop();
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mean absolute amplitude of the next sample block, normalized to 0..1.
    /// Yields 0.0 before initialization or when no samples are available.
    pub fn level(&mut self) -> f32 {
        if !self.initialized {
            return 0.0;
        }

        let mut buf = [0i16; 2048];
        let n = self.source.read(&mut buf).unwrap_or(0);
        if n == 0 {
            return 0.0;
        }

        let sum: f64 = buf[..n].iter().map(|s| f64::from(s.unsigned_abs())).sum();
        (sum / (n as f64 * f64::from(i16::MAX))) as f32
    }
}
