use std::collections::VecDeque;
use std::f64::consts::TAU;

/// How much history an interpolated timeline keeps behind the query time.
pub const TIMELINE_WINDOW_SEC: f64 = 2.0;

/// Timeline for values that change in steps: positions, event lists. Each
/// entry is handed out once, when the simulation time passes it.
#[derive(Debug)]
pub struct SteppedTimeline<T> {
    entries: VecDeque<(f64, T)>,
}

impl<T> SteppedTimeline<T> {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Inserts keeping ascending time order; frames may arrive reordered.
    pub fn add(&mut self, time: f64, value: T) {
        let at = self
            .entries
            .iter()
            .rposition(|(t, _)| *t <= time)
            .map_or(0, |i| i + 1);
        self.entries.insert(at, (time, value));
    }

    /// Returns the oldest entry strictly older than `sim_time`, consuming
    /// it, or `None` when nothing is due yet.
    pub fn pop_before(&mut self, sim_time: f64) -> Option<(f64, T)> {
        if self.entries.front().is_some_and(|(t, _)| *t < sim_time) {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for SteppedTimeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// How an [`InterpolatedTimeline`] blends between the straddling entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    /// Shortest-way-around blending for cyclic quantities.
    Angular,
    /// Step-hold: the earlier entry wins until the later one is reached.
    None,
}

/// Timeline for scalar values rendered between samples: angles and speeds.
#[derive(Debug)]
pub struct InterpolatedTimeline {
    entries: VecDeque<(f64, f64)>,
    mode: Interpolation,
    window: f64,
}

impl InterpolatedTimeline {
    pub fn new(mode: Interpolation) -> Self {
        Self {
            entries: VecDeque::new(),
            mode,
            window: TIMELINE_WINDOW_SEC,
        }
    }

    pub fn add(&mut self, time: f64, value: f64) {
        let at = self
            .entries
            .iter()
            .rposition(|(t, _)| *t <= time)
            .map_or(0, |i| i + 1);
        self.entries.insert(at, (time, value));
    }

    /// Samples the timeline at `time`, evicting entries that have slid out
    /// of the history window. Before the first entry the first value holds;
    /// past the last entry the last value holds.
    pub fn get(&mut self, time: f64) -> Option<f64> {
        while self.entries.len() >= 2 && self.entries[1].0 < time - self.window {
            self.entries.pop_front();
        }

        let first = self.entries.front()?;
        if time <= first.0 {
            return Some(first.1);
        }
        let last = self.entries.back()?;
        if time >= last.0 {
            return Some(last.1);
        }

        for pair in 0..self.entries.len() - 1 {
            let (t0, v0) = self.entries[pair];
            let (t1, v1) = self.entries[pair + 1];
            if t0 <= time && time <= t1 {
                let span = t1 - t0;
                let blend = if span > 0.0 { (time - t0) / span } else { 1.0 };
                return Some(match self.mode {
                    Interpolation::Linear => v0 + (v1 - v0) * blend,
                    Interpolation::Angular => angle_lerp(v0, v1, blend),
                    Interpolation::None => v0,
                });
            }
        }
        Some(last.1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Interpolates between two angles the short way around, wrapped to
/// `[0, 2π)`.
pub fn angle_lerp(from: f64, to: f64, blend: f64) -> f64 {
    let diff = (to - from + std::f64::consts::PI).rem_euclid(TAU) - std::f64::consts::PI;
    (from + diff * blend).rem_euclid(TAU)
}
