use serde::Deserialize;
use std::io::ErrorKind;

use super::decode::SampleSource;
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};

/// What to do with samples left over after the last full frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingFrame {
    /// Emit one extra frame, filled with zeros past the end of the input
    #[default]
    ZeroPad,
    /// Discard the leftover samples
    Drop,
}

/// A window of normalized samples cut from the input stream.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Position in the frame sequence, starting at 0
    pub index: usize,
    /// Index of the first sample in the original stream
    pub offset: usize,
    /// Number of trailing zeros appended past the end of the input
    pub padded: usize,
    /// Samples in [-1, 1)
    pub samples: Vec<f32>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Convert a 16-bit sample to [-1, 1).
pub fn normalize(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Number of frames produced for `len` input samples.
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize, trailing: TrailingFrame) -> usize {
    if len < frame_size || hop_size == 0 {
        return 0;
    }
    let full = (len - frame_size) / hop_size + 1;
    let leftover = (len - frame_size) % hop_size != 0;
    match trailing {
        TrailingFrame::ZeroPad if leftover => full + 1,
        _ => full,
    }
}

/// Lazily cuts a sample stream into overlapping frames.
///
/// Frame `i` covers samples `[i * hop, i * hop + frame_size)`. Nothing is
/// produced when the stream holds fewer than `frame_size` samples. A read
/// error is yielded once and ends the sequence.
pub struct FrameSource<S> {
    source: S,
    frame_size: usize,
    hop_size: usize,
    trailing: TrailingFrame,
    window: Vec<f32>,
    scratch: Vec<i16>,
    next_index: usize,
    done: bool,
}

impl<S: SampleSource> FrameSource<S> {
    pub fn new(source: S, frame_size: usize, hop_size: usize, trailing: TrailingFrame) -> Result<Self> {
        if frame_size == 0 {
            return Err(Error::InvalidFrameSize(frame_size));
        }
        if hop_size == 0 || hop_size > frame_size {
            return Err(Error::InvalidHop { hop: hop_size, frame_size });
        }
        Ok(Self {
            source,
            frame_size,
            hop_size,
            trailing,
            window: vec![0.0; frame_size],
            scratch: vec![0; frame_size],
            next_index: 0,
            done: false,
        })
    }

    pub fn from_config(source: S, config: &AnalysisConfig) -> Result<Self> {
        Self::new(source, config.frame_size, config.hop_size, config.trailing)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> S {
        self.source
    }

    fn read_full(&mut self, want: usize) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < want {
            match self.source.read_samples(&mut self.scratch[filled..want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn advance(&mut self) -> Result<Option<Frame>> {
        let mut padded = 0;

        if self.next_index == 0 {
            let got = self.read_full(self.frame_size)?;
            if got < self.frame_size {
                return Ok(None);
            }
            for (dst, &s) in self.window.iter_mut().zip(&self.scratch) {
                *dst = normalize(s);
            }
        } else {
            let got = self.read_full(self.hop_size)?;
            if got == 0 {
                return Ok(None);
            }
            if got < self.hop_size {
                if self.trailing == TrailingFrame::Drop {
                    return Ok(None);
                }
                padded = self.hop_size - got;
            }

            let keep = self.frame_size - self.hop_size;
            self.window.copy_within(self.hop_size.., 0);
            for (i, dst) in self.window[keep..].iter_mut().enumerate() {
                *dst = if i < got { normalize(self.scratch[i]) } else { 0.0 };
            }
        }

        let frame = Frame {
            index: self.next_index,
            offset: self.next_index * self.hop_size,
            padded,
            samples: self.window.clone(),
        };
        self.next_index += 1;
        if padded > 0 {
            self.done = true;
        }
        Ok(Some(frame))
    }
}

impl<S: SampleSource> Iterator for FrameSource<S> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
