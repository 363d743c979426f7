//! Stage Trait
//!
//! Defines the interface shared by every effect stage in the signal chain.

/// Context passed to stages containing stream metadata
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub sample_rate: f32,
    pub block_size: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
        }
    }

    /// Playback duration of one block in seconds
    pub fn block_seconds(&self) -> f32 {
        self.block_size as f32 / self.sample_rate
    }
}

/// Trait for effect stages in the signal chain
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()` and `reset()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait Stage: Send {
    /// Process a mono buffer in-place
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Clear internal state (delay lines, envelopes, filter memory)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;
}
