//! Draggable start/end markers and ratio <-> time conversion.
//!
//! Positions are normalized to [0, 1] of the visible recording so the same
//! selection works for the waveform, the spectrogram and the transport.

use std::ops::Range;
use std::time::Duration;

use crate::config::SelectionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    start: f32,
    end: f32,
    min_gap: f32,
    grab_radius: f32,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(0.0, 1.0, SelectionConfig::default().min_gap)
    }
}

impl Selection {
    /// Out-of-range or inverted input is clamped into a valid selection.
    pub fn new(start: f32, end: f32, min_gap: f32) -> Self {
        let min_gap = min_gap.clamp(0.0, 1.0);
        let start = clamp_unit(start).min(1.0 - min_gap);
        let end = clamp_unit(end).max(start + min_gap).min(1.0);
        Self {
            start,
            end,
            min_gap,
            grab_radius: SelectionConfig::default().grab_radius,
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(0.0, 1.0, config.min_gap).with_grab_radius(config.grab_radius)
    }

    /// How close (as a ratio) a pointer must be to pick up a handle.
    pub fn with_grab_radius(mut self, radius: f32) -> Self {
        self.grab_radius = radius.max(0.0);
        self
    }

    pub fn start(&self) -> f32 {
        self.start
    }

    pub fn end(&self) -> f32 {
        self.end
    }

    pub fn min_gap(&self) -> f32 {
        self.min_gap
    }

    pub fn grab_radius(&self) -> f32 {
        self.grab_radius
    }

    /// Which handle, if any, lies within the grab radius of `ratio`.
    /// The start handle wins when both are in reach.
    pub fn hit_test(&self, ratio: f32) -> Option<Handle> {
        if (ratio - self.start).abs() < self.grab_radius {
            Some(Handle::Start)
        } else if (ratio - self.end).abs() < self.grab_radius {
            Some(Handle::End)
        } else {
            None
        }
    }

    /// Move one handle, keeping `start <= end - min_gap` inside [0, 1].
    pub fn drag(&mut self, handle: Handle, ratio: f32) {
        match handle {
            Handle::Start => {
                self.start = ratio.min(self.end - self.min_gap).max(0.0);
            }
            Handle::End => {
                self.end = ratio.max(self.start + self.min_gap).min(1.0);
            }
        }
    }

    pub fn start_seconds(&self, duration: f32) -> f32 {
        ratio_to_seconds(self.start, duration)
    }

    pub fn end_seconds(&self, duration: f32) -> f32 {
        ratio_to_seconds(self.end, duration)
    }

    /// Sample indices covered by the selection.
    pub fn sample_range(&self, total_samples: usize) -> Range<usize> {
        ratio_to_sample(self.start, total_samples)..ratio_to_sample(self.end, total_samples)
    }

    /// Seek position and play length for the transport, whole milliseconds.
    pub fn playback_window(&self, duration: Duration) -> (Duration, Duration) {
        let total_ms = duration.as_millis() as f64;
        let start_ms = (self.start as f64 * total_ms) as u64;
        let end_ms = (self.end as f64 * total_ms) as u64;
        (
            Duration::from_millis(start_ms),
            Duration::from_millis(end_ms.saturating_sub(start_ms)),
        )
    }
}

fn clamp_unit(ratio: f32) -> f32 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

pub fn ratio_to_seconds(ratio: f32, duration: f32) -> f32 {
    clamp_unit(ratio) * duration.max(0.0)
}

/// Floor of `ratio * total_samples`, never past the end.
pub fn ratio_to_sample(ratio: f32, total_samples: usize) -> usize {
    let index = (clamp_unit(ratio) as f64 * total_samples as f64).floor() as usize;
    index.min(total_samples)
}

/// Spectrogram column under `ratio`, `None` when there are no columns.
pub fn ratio_to_column(ratio: f32, columns: usize) -> Option<usize> {
    if columns == 0 {
        return None;
    }
    Some(ratio_to_sample(ratio, columns).min(columns - 1))
}

/// Marker caption, e.g. `Start: 1.25 s`.
pub fn time_label(label: &str, ratio: f32, duration: f32) -> String {
    format!("{}: {:.2} s", label, ratio_to_seconds(ratio, duration))
}

/// `mm:ss.cc`, or `hh:mm:ss.cc` from one hour up.
pub fn format_timestamp(seconds: f32) -> String {
    let seconds = seconds.max(0.0);
    let total_secs = seconds as u64;
    let centis = ((seconds - total_secs as f32) * 100.0) as u64;
    if total_secs >= 3600 {
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            total_secs / 3600,
            (total_secs % 3600) / 60,
            total_secs % 60,
            centis
        )
    } else {
        format!("{:02}:{:02}.{:02}", total_secs / 60, total_secs % 60, centis)
    }
}
