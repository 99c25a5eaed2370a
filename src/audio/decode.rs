use std::io::{ErrorKind, Read};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// A stream of mono signed 16-bit samples at a fixed rate.
///
/// `read_samples` fills as much of `buf` as it can and returns the count;
/// `Ok(0)` marks the end of the stream.
pub trait SampleSource {
    fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize>;

    fn sample_rate(&self) -> u32;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize> {
        (**self).read_samples(buf)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize> {
        (**self).read_samples(buf)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

/// Fully decoded samples held in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    samples: Vec<i16>,
    sample_rate: u32,
    pos: usize,
}

impl MemorySource {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self { samples, sample_rate, pos: 0 }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Start reading from the first sample again.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl SampleSource for MemorySource {
    fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize> {
        let remaining = &self.samples[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Raw headerless PCM: mono, signed 16-bit, little-endian.
pub struct PcmReader<R> {
    inner: R,
    sample_rate: u32,
    bytes: Vec<u8>,
}

impl<R: Read> PcmReader<R> {
    pub fn new(inner: R, sample_rate: u32) -> Self {
        Self {
            inner,
            sample_rate,
            bytes: Vec::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> SampleSource for PcmReader<R> {
    fn read_samples(&mut self, buf: &mut [i16]) -> std::io::Result<usize> {
        self.bytes.resize(buf.len() * 2, 0);
        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.inner.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        // An odd trailing byte cannot form a sample
        let count = filled / 2;
        for (dst, pair) in buf.iter_mut().zip(self.bytes[..count * 2].chunks_exact(2)) {
            *dst = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(count)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Decode an audio file into mono 16-bit samples.
///
/// Multi-channel tracks are averaged down to one channel.
pub fn decode_file(path: &Path) -> Result<MemorySource> {
    let file = std::fs::File::open(path)?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("failed to probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no audio tracks found".into()))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("failed to create decoder: {}", e)))?;

    let mut all_samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(symphonia::core::errors::Error::IoError(e)) => return Err(Error::Acquisition(e)),
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<i16>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let samples = sample_buf.samples();

        if channels == 1 {
            all_samples.extend_from_slice(samples);
        } else {
            all_samples.extend(samples.chunks(channels).map(downmix));
        }
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f32 / sample_rate as f32
    );

    Ok(MemorySource::new(all_samples, sample_rate))
}

fn downmix(frame: &[i16]) -> i16 {
    let sum: i32 = frame.iter().map(|&s| s as i32).sum();
    (sum / frame.len().max(1) as i32) as i16
}
