//! Audio file decoding and WAV encoding.
//!
//! Input files are decoded with symphonia, so any container and codec it
//! supports (WAV, FLAC, MP3, OGG/Vorbis, AAC, ...) can be read. Output is
//! always written as 32-bit float WAV with hound.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::AudioError;
use crate::waveform::Waveform;

/// Decodes the first audio track of a file into a planar waveform at the
/// file's own sample rate and channel count.
pub fn read_audio(path: &Path) -> Result<Waveform, AudioError> {
    let decode_err = |reason: String| AudioError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let src = File::open(path).map_err(|e| AudioError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| decode_err(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no supported audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut num_channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(format!("unsupported codec: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(decode_err(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(path = %path.display(), "skipping corrupt packet: {msg}");
                continue;
            }
            Err(e) => return Err(decode_err(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        num_channels = spec.channels.count();

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buf.samples());
    }

    if sample_rate == 0 {
        return Err(decode_err("unknown sample rate".into()));
    }
    if num_channels == 0 {
        return Err(decode_err("unknown channel layout".into()));
    }

    let wave = Waveform::from_interleaved(&interleaved, num_channels, sample_rate)?;
    debug!(
        path = %path.display(),
        sample_rate,
        channels = num_channels,
        frames = wave.len(),
        "decoded audio"
    );
    Ok(wave)
}

/// Writes a waveform as 32-bit float WAV at the waveform's sample rate.
///
/// The data goes to a hidden temporary file next to `path`, which is renamed
/// into place only once the WAV is complete. On failure nothing is left at
/// `path`.
pub fn write_wav(path: &Path, wave: &Waveform) -> Result<(), AudioError> {
    let encode_err = |reason: String| AudioError::Encode {
        path: path.to_path_buf(),
        reason,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".voxshift-")
        .suffix(".wav.tmp")
        .tempfile_in(dir)
        .map_err(|e| encode_err(e.to_string()))?;

    let spec = hound::WavSpec {
        channels: wave.num_channels() as u16,
        sample_rate: wave.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::new(BufWriter::new(tmp.as_file_mut()), spec)
        .map_err(|e| encode_err(e.to_string()))?;
    for s in wave.interleaved() {
        writer.write_sample(s).map_err(|e| encode_err(e.to_string()))?;
    }
    writer.finalize().map_err(|e| encode_err(e.to_string()))?;

    tmp.persist(path).map_err(|e| encode_err(e.error.to_string()))?;
    debug!(path = %path.display(), frames = wave.len(), "wav written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_pcm16(path: &Path, channels: u16, rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for s in frame {
                w.write_sample(*s).unwrap();
            }
        }
        w.finalize().unwrap();
    }

    #[test]
    fn test_write_then_read_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples: Vec<f32> = (0..2205).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let wave = Waveform::mono(samples.clone(), 22050).unwrap();

        write_wav(&path, &wave).unwrap();
        let back = read_audio(&path).unwrap();

        assert_eq!(back.sample_rate(), 22050);
        assert_eq!(back.num_channels(), 1);
        assert_eq!(back.len(), samples.len());
        for (a, b) in samples.iter().zip(back.first_channel()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_read_stereo_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<Vec<i16>> = (0..1000).map(|_| vec![16384, -16384]).collect();
        write_pcm16(&path, 2, 44100, &frames);

        let wave = read_audio(&path).unwrap();
        assert_eq!(wave.sample_rate(), 44100);
        assert_eq!(wave.num_channels(), 2);
        assert_eq!(wave.len(), 1000);
        assert!((wave.channel(0).unwrap()[10] - 0.5).abs() < 1e-3);
        assert!((wave.channel(1).unwrap()[10] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_audio(Path::new("/nonexistent/voxshift/missing.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Open { .. }));
    }

    #[test]
    fn test_read_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not audio data at all").unwrap();
        let err = read_audio(&path).unwrap_err();
        assert!(matches!(err, AudioError::Decode { .. }));
    }

    #[test]
    fn test_write_into_missing_dir() {
        let wave = Waveform::mono(vec![0.0; 16], 16000).unwrap();
        let err = write_wav(Path::new("/nonexistent/voxshift/out.wav"), &wave).unwrap_err();
        assert!(matches!(err, AudioError::Encode { .. }));
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let wave = Waveform::mono(vec![0.25; 4000], 16000).unwrap();

        // Renaming a file over a non-empty directory fails after encoding.
        let blocked = dir.path().join("take.wav");
        std::fs::create_dir(&blocked).unwrap();
        std::fs::write(blocked.join("keep"), b"x").unwrap();
        let err = write_wav(&blocked, &wave).unwrap_err();
        assert!(matches!(err, AudioError::Encode { .. }));
        assert!(blocked.join("keep").is_file());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["take.wav"]);
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        std::fs::write(&path, b"stale").unwrap();
        let wave = Waveform::mono(vec![0.5; 100], 8000).unwrap();

        write_wav(&path, &wave).unwrap();
        let back = read_audio(&path).unwrap();
        assert_eq!(back.len(), 100);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
