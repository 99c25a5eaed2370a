//! Bounded, insertion-ordered store of spectrogram columns.
//!
//! One producer appends while any number of readers take snapshots. A
//! snapshot copies the column handles (not the magnitudes) under the lock,
//! so readers never iterate the live structure.

use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::audio::features::Spectrum;

pub const DEFAULT_MAX_COLUMNS: usize = 500;

#[derive(Debug)]
pub struct SpectrogramBuffer {
    max_columns: usize,
    columns: Mutex<VecDeque<Spectrum>>,
}

impl SpectrogramBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(max_columns: usize) -> Self {
        let max_columns = max_columns.max(1);
        Self {
            max_columns,
            columns: Mutex::new(VecDeque::with_capacity(max_columns)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Spectrum>> {
        // Every critical section leaves the deque consistent, so a poisoned
        // lock still guards valid data.
        self.columns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a column, evicting the oldest one first when full.
    pub fn add_spectrum(&self, spectrum: Spectrum) {
        let mut columns = self.lock();
        while columns.len() >= self.max_columns {
            columns.pop_front();
        }
        columns.push_back(spectrum);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            columns: self.lock().iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn max_columns(&self) -> usize {
        self.max_columns
    }
}

impl Default for SpectrogramBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COLUMNS)
    }
}

/// Read-only view of the buffer at one instant, oldest column first.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    columns: Vec<Spectrum>,
}

impl Snapshot {
    pub fn columns(&self) -> &[Spectrum] {
        &self.columns
    }

    /// Bins per column, 0 when empty.
    pub fn bins(&self) -> usize {
        self.columns.first().map_or(0, |c| c.len())
    }

    /// Largest magnitude across all columns, for colour scaling.
    pub fn max_magnitude(&self) -> f32 {
        self.columns.iter().map(Spectrum::max).fold(0.0f32, f32::max)
    }
}

impl Deref for Snapshot {
    type Target = [Spectrum];

    fn deref(&self) -> &[Spectrum] {
        &self.columns
    }
}
