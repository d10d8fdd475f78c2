//! Bounded sliding window with O(1) running statistics.
//!
//! [`WindowBuffer`] keeps the most recent `capacity` samples in a ring and
//! maintains first and second moments incrementally, so `mean`, `variance`
//! and `std_dev` never rescan the window.
//!
//! # Numeric policy
//!
//! Naive running `Σx` / `Σx²` lose precision for price-like data (large
//! magnitude, small spread) and drift over long streams. The buffer therefore
//! keeps *shifted* sums `Σ(x-k)` and `Σ(x-k)²` around a reference `k` close to
//! the window mean, and re-derives both exactly from the ring contents every
//! `capacity` evictions, re-centring `k` on the exact mean. Drift is bounded
//! by at most `capacity` incremental updates and the resync costs O(capacity)
//! once per `capacity` pushes, keeping `push` amortized O(1).
//!
//! # Conventions
//!
//! Statistics are population statistics. `mean`, `variance` and `std_dev`
//! fail with `InsufficientData` on an empty window; a single sample has
//! variance `0.0`. [`WindowBuffer::sample_variance`] (Bessel-corrected)
//! needs at least two samples.

use crate::simd::{shifted_moments_simd, sum_simd};
use trading_core::error::IndicatorError;
use trading_core::types::{ensure_finite, Sample};

/// Fixed-capacity ring of samples with running aggregates.
#[derive(Debug, Clone)]
pub struct WindowBuffer {
    ring: Vec<f64>,
    capacity: usize,
    /// Index of the oldest sample.
    head: usize,
    count: usize,
    shift: f64,
    /// Σ(x - shift)
    s1: f64,
    /// Σ(x - shift)²
    s2: f64,
    evictions_since_resync: usize,
}

impl WindowBuffer {
    /// Create an empty window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self, IndicatorError> {
        if capacity == 0 {
            return Err(IndicatorError::InvalidConfiguration(
                "window capacity must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            ring: vec![0.0; capacity],
            capacity,
            head: 0,
            count: 0,
            shift: 0.0,
            s1: 0.0,
            s2: 0.0,
            evictions_since_resync: 0,
        })
    }

    /// Push a sample as the newest, evicting the oldest if full.
    ///
    /// Non-finite samples, and samples so far from the window that their
    /// squared deviation overflows, are rejected before anything is modified.
    ///
    /// # Returns
    /// The evicted sample, if the window was full.
    pub fn push(&mut self, sample: Sample) -> Result<Option<Sample>, IndicatorError> {
        let sample = ensure_finite(sample)?;

        let shift = if self.count == 0 { sample } else { self.shift };
        let d_new = sample - shift;
        let evicted = self.is_full().then(|| self.ring[self.head]);
        let (s1, s2) = match evicted {
            Some(old) => {
                let d_old = old - shift;
                (self.s1 + d_new - d_old, self.s2 + d_new * d_new - d_old * d_old)
            }
            None => (self.s1 + d_new, self.s2 + d_new * d_new),
        };
        if !(s1.is_finite() && s2.is_finite()) {
            return Err(IndicatorError::InvalidSample { value: sample });
        }

        if evicted.is_some() {
            self.ring[self.head] = sample;
            self.head = (self.head + 1) % self.capacity;
            self.evictions_since_resync += 1;
        } else {
            let tail = (self.head + self.count) % self.capacity;
            self.ring[tail] = sample;
            self.count += 1;
        }
        self.shift = shift;
        self.s1 = s1;
        self.s2 = s2;

        if self.evictions_since_resync >= self.capacity {
            self.resync();
        }

        Ok(evicted)
    }

    /// Push `sample`, then derive a value from the updated window.
    ///
    /// If `derive` fails the push is undone, so the window is left exactly
    /// as it was before the call.
    pub fn push_then<T, F>(&mut self, sample: Sample, derive: F) -> Result<T, IndicatorError>
    where
        F: FnOnce(&Self) -> Result<T, IndicatorError>,
    {
        let saved = Checkpoint::of(self);
        self.push(sample)?;
        match derive(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                saved.restore(self);
                Err(e)
            }
        }
    }

    /// Re-derive the running moments exactly from the ring contents.
    fn resync(&mut self) {
        let (front, back) = self.as_slices();
        let n = self.count as f64;
        let mean = (sum_simd(front) + sum_simd(back)) / n;

        let (f1, f2) = shifted_moments_simd(front, mean);
        let (b1, b2) = shifted_moments_simd(back, mean);
        self.shift = mean;
        self.s1 = f1 + b1;
        self.s2 = f2 + b2;
        self.evictions_since_resync = 0;
    }

    /// Held samples as two contiguous runs, oldest first.
    fn as_slices(&self) -> (&[f64], &[f64]) {
        let end = self.head + self.count;
        if end <= self.capacity {
            (&self.ring[self.head..end], &[])
        } else {
            (&self.ring[self.head..], &self.ring[..end - self.capacity])
        }
    }

    fn require(&self, required: usize) -> Result<(), IndicatorError> {
        if self.count < required {
            return Err(IndicatorError::InsufficientData {
                required,
                available: self.count,
            });
        }
        Ok(())
    }

    /// Arithmetic mean of the held samples.
    pub fn mean(&self) -> Result<f64, IndicatorError> {
        self.require(1)?;
        Ok(self.shift + self.s1 / self.count as f64)
    }

    /// Population variance. A single sample has variance `0.0`.
    pub fn variance(&self) -> Result<f64, IndicatorError> {
        self.require(1)?;
        if self.count == 1 {
            return Ok(0.0);
        }
        let n = self.count as f64;
        let m1 = self.s1 / n;
        let variance = self.s2 / n - m1 * m1;
        if !variance.is_finite() {
            return Err(IndicatorError::InvalidSample { value: variance });
        }
        // Cancellation can leave a tiny negative residue.
        Ok(variance.max(0.0))
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Result<f64, IndicatorError> {
        self.variance().map(f64::sqrt)
    }

    /// Bessel-corrected sample variance; needs at least two samples.
    pub fn sample_variance(&self) -> Result<f64, IndicatorError> {
        self.require(2)?;
        let n = self.count as f64;
        Ok(self.variance()? * n / (n - 1.0))
    }

    /// Sum of the held samples.
    pub fn sum(&self) -> f64 {
        self.shift * self.count as f64 + self.s1
    }

    /// Number of held samples.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Sample at `index`, 0 being the oldest.
    pub fn get(&self, index: usize) -> Option<f64> {
        if index >= self.count {
            return None;
        }
        Some(self.ring[(self.head + index) % self.capacity])
    }

    /// Newest sample.
    pub fn last(&self) -> Option<f64> {
        self.count.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let (front, back) = self.as_slices();
        front.iter().chain(back.iter()).copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Drop every sample, keeping the capacity.
    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
        self.shift = 0.0;
        self.s1 = 0.0;
        self.s2 = 0.0;
        self.evictions_since_resync = 0;
    }
}

/// Scalar state of a window plus the ring slot the next push overwrites.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    head: usize,
    count: usize,
    shift: f64,
    s1: f64,
    s2: f64,
    evictions_since_resync: usize,
    slot: usize,
    slot_value: f64,
}

impl Checkpoint {
    fn of(window: &WindowBuffer) -> Self {
        let slot = (window.head + window.count) % window.capacity;
        Self {
            head: window.head,
            count: window.count,
            shift: window.shift,
            s1: window.s1,
            s2: window.s2,
            evictions_since_resync: window.evictions_since_resync,
            slot,
            slot_value: window.ring[slot],
        }
    }

    fn restore(self, window: &mut WindowBuffer) {
        window.head = self.head;
        window.count = self.count;
        window.shift = self.shift;
        window.s1 = self.s1;
        window.s2 = self.s2;
        window.evictions_since_resync = self.evictions_since_resync;
        window.ring[self.slot] = self.slot_value;
    }
}
