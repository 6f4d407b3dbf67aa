//! Overlapping-window segmentation for chunked conversion.
//!
//! With chunk size `C` and input length `L`, the input is padded with `C`
//! zeros in front and `4C` zeros behind. Window `i` is the `3C` samples
//! starting at `i*C` in the padded buffer, i.e. original samples
//! `[i*C - C, i*C + 2C)`. After conversion only the middle `C` samples of
//! each window (the body) are kept; bodies are concatenated in window order
//! and the result truncated to `L`.
//!
//! Every body is converted with a full chunk of context on both sides, so
//! segment edges never land in the kept audio.

use std::num::NonZeroUsize;
use std::ops::Range;

use crate::error::ConvertError;

/// Largest accepted chunk size: ten minutes at the 16kHz working rate. A
/// window holds three chunks.
pub const MAX_CHUNK_SIZE: usize = 16_000 * 600;

/// How the working-rate signal is fed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionMode {
    /// The whole signal in one engine call.
    #[default]
    WholeFile,
    /// Overlapping windows of three chunks, keeping the middle one.
    Chunked(NonZeroUsize),
}

impl ConversionMode {
    /// Maps a configured chunk size to a mode; `0` means whole-file.
    pub fn from_chunk_size(chunk: usize) -> Self {
        match NonZeroUsize::new(chunk) {
            Some(c) => ConversionMode::Chunked(c),
            None => ConversionMode::WholeFile,
        }
    }

    /// Chunk size, or `0` in whole-file mode.
    pub fn chunk_size(&self) -> usize {
        match self {
            ConversionMode::WholeFile => 0,
            ConversionMode::Chunked(c) => c.get(),
        }
    }
}

/// Window geometry for one input signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    chunk: usize,
    input_len: usize,
}

impl ChunkPlan {
    /// Fails with [`ConvertError::Config`] if the chunk exceeds
    /// [`MAX_CHUNK_SIZE`] or the padded geometry does not fit in `usize`.
    pub fn new(input_len: usize, chunk: NonZeroUsize) -> Result<Self, ConvertError> {
        let chunk = chunk.get();
        if chunk > MAX_CHUNK_SIZE {
            return Err(ConvertError::Config(format!(
                "chunk size {chunk} exceeds the maximum of {MAX_CHUNK_SIZE}"
            )));
        }
        // The last window ends at most 6C past the input start.
        chunk
            .checked_mul(6)
            .and_then(|pad| pad.checked_add(input_len))
            .ok_or_else(|| {
                ConvertError::Config(format!(
                    "chunk size {chunk} with {input_len} samples overflows the window layout"
                ))
            })?;
        Ok(Self { chunk, input_len })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Samples per window (three chunks).
    pub fn window_len(&self) -> usize {
        3 * self.chunk
    }

    /// Length of the zero-padded buffer: `C + L + 4C`.
    pub fn padded_len(&self) -> usize {
        self.input_len + 5 * self.chunk
    }

    /// Number of windows: `ceil((L + 3C) / C)`.
    pub fn window_count(&self) -> usize {
        (self.input_len + 3 * self.chunk).div_ceil(self.chunk)
    }

    /// Start of window `i` in the padded buffer.
    pub fn window_start(&self, i: usize) -> usize {
        i * self.chunk
    }

    /// Range of a converted window that is kept.
    pub fn body_range(&self) -> Range<usize> {
        self.chunk..2 * self.chunk
    }

    /// Extracts window `i` from the unpadded input. Positions outside the
    /// input read as zeros, so windows reaching past the padded buffer are
    /// still full length.
    pub fn window(&self, input: &[f32], i: usize) -> Vec<f32> {
        debug_assert_eq!(input.len(), self.input_len);
        let mut out = vec![0.0f32; self.window_len()];
        // Original index of the window's first sample, offset by one chunk.
        let first = self.window_start(i);
        let lo = first.max(self.chunk);
        let hi = (first + self.window_len()).min(self.chunk + self.input_len);
        if lo < hi {
            let src = &input[lo - self.chunk..hi - self.chunk];
            out[lo - first..hi - first].copy_from_slice(src);
        }
        out
    }

    /// Iterates all windows in order.
    pub fn windows<'a>(&'a self, input: &'a [f32]) -> impl Iterator<Item = Vec<f32>> + 'a {
        (0..self.window_count()).map(move |i| self.window(input, i))
    }

    /// Returns the body of one converted window.
    pub fn trim<'a>(&self, converted: &'a [f32]) -> Result<&'a [f32], ConvertError> {
        if converted.len() != self.window_len() {
            return Err(ConvertError::LengthMismatch {
                expected: self.window_len(),
                got: converted.len(),
            });
        }
        Ok(&converted[self.body_range()])
    }

    /// Concatenates bodies in order and truncates to the input length.
    pub fn assemble<I, B>(&self, bodies: I) -> Vec<f32>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[f32]>,
    {
        let mut out = Vec::with_capacity(self.window_count() * self.chunk);
        for body in bodies {
            out.extend_from_slice(body.as_ref());
        }
        out.truncate(self.input_len);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ramp(n: usize) -> Vec<f32> {
        (1..=n).map(|i| i as f32).collect()
    }

    /// Passes windows through unchanged, trims and reassembles.
    fn identity_round_trip(input: &[f32], chunk: usize) -> Vec<f32> {
        let plan = ChunkPlan::new(input.len(), nz(chunk)).unwrap();
        let converted: Vec<Vec<f32>> = plan.windows(input).collect();
        let bodies: Vec<&[f32]> = converted.iter().map(|w| plan.trim(w).unwrap()).collect();
        plan.assemble(bodies)
    }

    #[test]
    fn mode_from_chunk_size() {
        assert_eq!(ConversionMode::from_chunk_size(0), ConversionMode::WholeFile);
        assert_eq!(
            ConversionMode::from_chunk_size(4000),
            ConversionMode::Chunked(nz(4000))
        );
        assert_eq!(ConversionMode::Chunked(nz(7)).chunk_size(), 7);
        assert_eq!(ConversionMode::default().chunk_size(), 0);
    }

    #[test]
    fn window_count_follows_padding() {
        // 50000 samples at 44.1kHz become 18141 at 16kHz.
        let plan = ChunkPlan::new(18141, nz(8000)).unwrap();
        assert_eq!(plan.window_count(), 6);
        assert_eq!(ChunkPlan::new(50000, nz(8000)).unwrap().window_count(), 10);
        assert_eq!(ChunkPlan::new(10, nz(5)).unwrap().window_count(), 5);
        assert_eq!(ChunkPlan::new(3, nz(10)).unwrap().window_count(), 4);
        assert_eq!(ChunkPlan::new(0, nz(4)).unwrap().window_count(), 3);
    }

    #[test]
    fn windows_read_padded_input() {
        let input = ramp(10);
        let plan = ChunkPlan::new(10, nz(4)).unwrap();
        assert_eq!(plan.padded_len(), 30);
        assert_eq!(plan.window(&input, 0), vec![0., 0., 0., 0., 1., 2., 3., 4., 5., 6., 7., 8.]);
        assert_eq!(plan.window(&input, 1), vec![1., 2., 3., 4., 5., 6., 7., 8., 9., 10., 0., 0.]);
        let last = plan.window_count() - 1;
        assert!(plan.window(&input, last).iter().all(|s| *s == 0.0));
        assert!(plan.windows(&input).all(|w| w.len() == 12));
    }

    #[test]
    fn identity_reassembly_divisible() {
        let input = ramp(24);
        assert_eq!(identity_round_trip(&input, 8), input);
    }

    #[test]
    fn identity_reassembly_non_divisible() {
        let input = ramp(23);
        assert_eq!(identity_round_trip(&input, 5), input);
    }

    #[test]
    fn identity_reassembly_shorter_than_chunk() {
        let input = ramp(3);
        assert_eq!(identity_round_trip(&input, 10), input);
    }

    #[test]
    fn trim_rejects_wrong_length() {
        let plan = ChunkPlan::new(100, nz(10)).unwrap();
        let err = plan.trim(&[0.0; 29]).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::LengthMismatch {
                expected: 30,
                got: 29
            }
        ));
        assert_eq!(plan.trim(&[1.0; 30]).unwrap().len(), 10);
    }

    #[test]
    fn oversized_chunk_is_rejected() {
        let err = ChunkPlan::new(100, nz(MAX_CHUNK_SIZE + 1)).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
        let err = ChunkPlan::new(usize::MAX - 10, nz(4)).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
        let plan = ChunkPlan::new(100, nz(MAX_CHUNK_SIZE)).unwrap();
        assert_eq!(plan.window_count(), 4);
    }

    #[test]
    fn bodies_come_from_window_middles() {
        let plan = ChunkPlan::new(6, nz(2)).unwrap();
        // Tag every sample with its window index.
        let bodies: Vec<Vec<f32>> = (0..plan.window_count())
            .map(|i| {
                let w = vec![i as f32; plan.window_len()];
                plan.trim(&w).unwrap().to_vec()
            })
            .collect();
        assert_eq!(plan.assemble(bodies), vec![0., 0., 1., 1., 2., 2.]);
    }
}
