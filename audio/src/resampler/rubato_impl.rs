//! Rubato-based resampler implementation.

use rubato::{FftFixedInOut, Resampler as RubatoResampler};
use tracing::trace;

use super::output_len;
use crate::error::AudioError;

/// Preferred number of input frames per processing block.
const CHUNK_SIZE: usize = 1024;

/// Resamples planar channels, compensating the resampler's delay so that
/// output frame 0 lines up with input frame 0.
pub(super) fn resample_planar(
    channels: &[Vec<f32>],
    src_rate: u32,
    dst_rate: u32,
) -> Result<Vec<Vec<f32>>, AudioError> {
    let num_channels = channels.len();
    let len = channels.first().map(Vec::len).unwrap_or(0);
    if src_rate == dst_rate || len == 0 || num_channels == 0 {
        return Ok(channels.to_vec());
    }

    let expected = output_len(len, src_rate, dst_rate);
    let mut resampler = FftFixedInOut::<f32>::new(
        src_rate as usize,
        dst_rate as usize,
        CHUNK_SIZE,
        num_channels,
    )?;
    let delay = resampler.output_delay();
    let chunk_in = resampler.input_frames_next();
    trace!(src_rate, dst_rate, len, chunk_in, delay, "resampling");

    let wanted = delay + expected;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted + chunk_in); num_channels];
    let mut input_buf = vec![vec![0.0f32; chunk_in]; num_channels];
    let mut pos = 0;

    while output[0].len() < wanted {
        // Feed real frames while they last, zeros afterwards to flush the filter.
        let n = chunk_in.min(len.saturating_sub(pos));
        for (buf, src) in input_buf.iter_mut().zip(channels) {
            buf[..n].copy_from_slice(&src[pos..pos + n]);
            buf[n..].fill(0.0);
        }
        pos += n;

        let processed = resampler.process(&input_buf, None)?;
        for (out, block) in output.iter_mut().zip(processed) {
            out.extend_from_slice(&block);
        }
    }

    Ok(output
        .into_iter()
        .map(|ch| ch[delay..wanted].to_vec())
        .collect())
}
