//! Time-grid chunking of extrusion deltas
//!
//! The firmware polls the printer at a fixed rate and sees extrusion as
//! "how much moved since last poll". A single G-code move can push tens of
//! millimetres of filament, so the chunker spreads large moves over several
//! ticks, never reporting more than `max_chunk_mm` per tick.

use flowsim_core::{Error, FlowSample, Result, EXTRUSION_EPSILON};
use serde::{Deserialize, Serialize};

/// Default tick size (ms)
pub const DEFAULT_INTERVAL_MS: u64 = 250;

/// Default per-sample extrusion ceiling (mm)
pub const DEFAULT_MAX_CHUNK_MM: f64 = 3.0;

/// Chunking parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Simulated time per emitted sample (ms)
    pub interval_ms: u64,
    /// Largest extrusion reported in one sample (mm)
    pub max_chunk_mm: f64,
    /// Emit negative samples for retractions instead of skipping them
    pub include_retractions: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            max_chunk_mm: DEFAULT_MAX_CHUNK_MM,
            include_retractions: false,
        }
    }
}

impl ChunkerConfig {
    /// Check that the parameters describe a terminating decomposition
    pub fn validate(&self) -> Result<()> {
        if !self.max_chunk_mm.is_finite() || self.max_chunk_mm <= 0.0 {
            return Err(Error::invalid_parameter(
                "max_chunk_mm",
                format!("must be a finite value > 0, got {}", self.max_chunk_mm),
            ));
        }
        Ok(())
    }
}

/// Decomposition of one delta that is still being emitted
#[derive(Debug, Clone, Copy)]
struct PendingDelta {
    remaining: f64,
    sign: f64,
}

/// Lazy iterator turning extrusion deltas into [`FlowSample`]s
///
/// Each emitted sample consumes one tick. Excluded retractions consume one
/// tick without emitting anything, so the printer's silence during a
/// retraction is reproduced as a gap in the timestamps.
pub struct FlowChunker<I> {
    deltas: I,
    config: ChunkerConfig,
    timestamp: u64,
    total: f64,
    pending: Option<PendingDelta>,
}

impl<I: Iterator<Item = f64>> FlowChunker<I> {
    /// Create a chunker over `deltas`
    ///
    /// # Errors
    /// Returns an invalid-parameter error when `max_chunk_mm` is not a finite
    /// positive number.
    pub fn new(deltas: I, config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            deltas,
            config,
            timestamp: 0,
            total: 0.0,
            pending: None,
        })
    }

    /// Chunking parameters in use
    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Timestamp the next sample will carry (ms)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Running total of everything emitted so far (mm)
    pub fn total(&self) -> f64 {
        self.total
    }

    fn advance_clock(&mut self) {
        self.timestamp = self.timestamp.saturating_add(self.config.interval_ms);
    }
}

impl<I: Iterator<Item = f64>> Iterator for FlowChunker<I> {
    type Item = FlowSample;

    fn next(&mut self) -> Option<FlowSample> {
        loop {
            if let Some(pending) = self.pending.as_mut() {
                if pending.remaining > EXTRUSION_EPSILON {
                    let chunk = self.config.max_chunk_mm.min(pending.remaining);
                    pending.remaining -= chunk;

                    let signed = chunk * pending.sign;
                    self.total += signed;
                    let sample = FlowSample::new(self.timestamp, signed, self.total);
                    self.advance_clock();
                    return Some(sample);
                }
                self.pending = None;
            }

            let delta = self.deltas.next()?;
            if !delta.is_finite() {
                tracing::warn!("Skipping non-finite extrusion delta {}", delta);
                continue;
            }

            let sign = if delta > 0.0 { 1.0 } else { -1.0 };
            if sign < 0.0 && !self.config.include_retractions {
                self.advance_clock();
                continue;
            }

            self.pending = Some(PendingDelta {
                remaining: delta.abs(),
                sign,
            });
        }
    }
}

/// Chunk an iterable of deltas
pub fn chunk_extrusion<I>(deltas: I, config: ChunkerConfig) -> Result<FlowChunker<I::IntoIter>>
where
    I: IntoIterator<Item = f64>,
{
    FlowChunker::new(deltas.into_iter(), config)
}
