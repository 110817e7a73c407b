//! WAV capture inspection and encoding

use std::io::Cursor;

use serde::Serialize;

use crate::{Error, Result};

/// Sample rate used for generated test captures (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Header facts about a recorded capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub duration_secs: f32,
}

impl WavInfo {
    /// Whether the capture is 16-bit integer PCM (`LINEAR16`)
    #[must_use]
    pub const fn is_linear16(&self) -> bool {
        self.bits_per_sample == 16
    }
}

/// Read the WAV header of a browser capture
///
/// # Errors
///
/// Returns error if the bytes are not a readable WAV file
pub fn inspect(audio: &[u8]) -> Result<WavInfo> {
    let reader = hound::WavReader::new(Cursor::new(audio))
        .map_err(|e| Error::Audio(format!("invalid WAV data: {e}")))?;

    let spec = reader.spec();
    let frames = reader.duration();

    #[allow(clippy::cast_precision_loss)]
    let duration_secs = if spec.sample_rate == 0 {
        0.0
    } else {
        frames as f32 / spec.sample_rate as f32
    };

    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        duration_secs,
    })
}

/// Convert f32 samples to 16-bit mono WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
