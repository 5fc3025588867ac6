//! ## Price Oracle
//! Grids push the boundary that was in effect over each elapsed interval to a [`PriceOracle`].
//! [`ObservationLog`] keeps a ring buffer of cumulative boundaries per grid, from which time
//! weighted average boundaries can be derived.

use crate::prelude::*;
use alloy_primitives::{map::rustc_hash::FxHashMap, Address};

/// The oracle interface consumed by [`Grid`].
pub trait PriceOracle {
    /// Starts tracking `grid`. Registering a grid twice has no effect.
    fn register(&mut self, grid: Address, timestamp: u64);

    /// Records that the grid sat at `boundary` from the newest observation until `timestamp`.
    fn update(&mut self, grid: Address, boundary: i32, timestamp: u64) -> Result<(), Error>;

    /// Returns the cumulative boundary of `grid` as of `seconds_ago` seconds before `now`.
    ///
    /// ## Arguments
    ///
    /// * `grid`: the grid to query
    /// * `boundary`: the current boundary of the grid, used to extrapolate past the newest
    ///   observation
    /// * `now`: the current timestamp
    /// * `seconds_ago`: how far back to look
    fn get_boundary_cumulative(
        &self,
        grid: Address,
        boundary: i32,
        now: u64,
        seconds_ago: u32,
    ) -> Result<i64, Error>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Observation {
    pub timestamp: u32,
    pub boundary_cumulative: i64,
    pub initialized: bool,
}

impl Observation {
    #[inline]
    fn transform(&self, timestamp: u32, boundary: i32) -> Self {
        let delta = timestamp.wrapping_sub(self.timestamp);
        Self {
            timestamp,
            boundary_cumulative: self
                .boundary_cumulative
                .wrapping_add(boundary as i64 * delta as i64),
            initialized: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ObservationRing {
    index: u16,
    capacity: u16,
    capacity_next: u16,
    observations: Vec<Observation>,
}

impl ObservationRing {
    fn new(timestamp: u32) -> Self {
        Self {
            index: 0,
            capacity: 1,
            capacity_next: 1,
            observations: vec![Observation {
                timestamp,
                boundary_cumulative: 0,
                initialized: true,
            }],
        }
    }

    #[inline]
    fn newest(&self) -> Observation {
        self.observations[self.index as usize]
    }

    fn write(&mut self, boundary: i32, timestamp: u32) {
        let last = self.newest();
        if last.timestamp == timestamp {
            return;
        }
        if self.capacity_next > self.capacity && self.index == self.capacity - 1 {
            self.capacity = self.capacity_next;
        }
        self.index = (self.index + 1) % self.capacity;
        self.observations[self.index as usize] = last.transform(timestamp, boundary);
    }

    fn grow(&mut self, next: u16) {
        if next <= self.capacity_next {
            return;
        }
        self.observations.resize(next as usize, Observation::default());
        self.capacity_next = next;
    }

    #[inline]
    fn at(&self, i: usize) -> Observation {
        self.observations[i % self.capacity as usize]
    }

    /// Finds the observations at or before and at or after `target`, which must lie within the
    /// ring.
    fn binary_search(&self, time: u32, target: u32) -> (Observation, Observation) {
        let capacity = self.capacity as usize;
        let mut l = (self.index as usize + 1) % capacity;
        let mut r = l + capacity - 1;
        loop {
            let i = (l + r) / 2;
            let before = self.at(i);
            if !before.initialized {
                l = i + 1;
                continue;
            }
            let after = self.at(i + 1);
            let target_at_or_after = lte(time, before.timestamp, target);
            if target_at_or_after && lte(time, target, after.timestamp) {
                return (before, after);
            }
            if target_at_or_after {
                l = i + 1;
            } else {
                r = i - 1;
            }
        }
    }

    fn observe(&self, time: u32, seconds_ago: u32, boundary: i32) -> Result<i64, Error> {
        let target = time.wrapping_sub(seconds_ago);
        let newest = self.newest();
        if lte(time, newest.timestamp, target) {
            return Ok(if newest.timestamp == target {
                newest.boundary_cumulative
            } else {
                newest.transform(target, boundary).boundary_cumulative
            });
        }

        let mut oldest = self.at(self.index as usize + 1);
        if !oldest.initialized {
            oldest = self.observations[0];
        }
        if !lte(time, oldest.timestamp, target) {
            return Err(Error::OracleTargetTooOld);
        }

        let (before, after) = self.binary_search(time, target);
        if target == before.timestamp {
            Ok(before.boundary_cumulative)
        } else if target == after.timestamp {
            Ok(after.boundary_cumulative)
        } else {
            let elapsed = after.timestamp.wrapping_sub(before.timestamp) as i64;
            let into = target.wrapping_sub(before.timestamp) as i64;
            Ok(before.boundary_cumulative
                + (after.boundary_cumulative - before.boundary_cumulative) / elapsed * into)
        }
    }
}

/// Whether `a <= b` for 32-bit timestamps that may have wrapped, both at or before `time`.
#[inline]
const fn lte(time: u32, a: u32, b: u32) -> bool {
    if a <= time && b <= time {
        return a <= b;
    }
    let a_adjusted = if a > time { a as u64 } else { a as u64 + (1 << 32) };
    let b_adjusted = if b > time { b as u64 } else { b as u64 + (1 << 32) };
    a_adjusted <= b_adjusted
}

/// An in-memory [`PriceOracle`] holding a ring buffer of observations for every registered grid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservationLog {
    rings: FxHashMap<Address, ObservationRing>,
}

impl ObservationLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the number of observations kept for `grid`. The ring only grows once the newest
    /// observation reaches the end of the current capacity.
    pub fn increase_capacity(&mut self, grid: Address, capacity_next: u16) -> Result<(), Error> {
        self.rings
            .get_mut(&grid)
            .ok_or(Error::OracleNotRegistered(grid))?
            .grow(capacity_next);
        Ok(())
    }

    /// Returns `(index, capacity, capacity_next)` of the ring of `grid`.
    pub fn capacity(&self, grid: Address) -> Option<(u16, u16, u16)> {
        self.rings
            .get(&grid)
            .map(|ring| (ring.index, ring.capacity, ring.capacity_next))
    }

    pub fn observation(&self, grid: Address, index: usize) -> Option<Observation> {
        self.rings
            .get(&grid)
            .and_then(|ring| ring.observations.get(index).copied())
    }

    /// Returns the cumulative boundary for every entry of `seconds_agos`.
    pub fn get_boundary_cumulatives(
        &self,
        grid: Address,
        boundary: i32,
        now: u64,
        seconds_agos: &[u32],
    ) -> Result<Vec<i64>, Error> {
        seconds_agos
            .iter()
            .map(|seconds_ago| self.get_boundary_cumulative(grid, boundary, now, *seconds_ago))
            .collect()
    }
}

impl PriceOracle for ObservationLog {
    #[inline]
    fn register(&mut self, grid: Address, timestamp: u64) {
        self.rings
            .entry(grid)
            .or_insert_with(|| ObservationRing::new(timestamp as u32));
    }

    fn update(&mut self, grid: Address, boundary: i32, timestamp: u64) -> Result<(), Error> {
        self.rings
            .get_mut(&grid)
            .ok_or(Error::OracleNotRegistered(grid))?
            .write(boundary, timestamp as u32);
        Ok(())
    }

    fn get_boundary_cumulative(
        &self,
        grid: Address,
        boundary: i32,
        now: u64,
        seconds_ago: u32,
    ) -> Result<i64, Error> {
        self.rings
            .get(&grid)
            .ok_or(Error::OracleNotRegistered(grid))?
            .observe(now as u32, seconds_ago, boundary)
    }
}
