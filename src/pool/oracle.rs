//! Ring buffer of cumulative-tick observations. Capacity starts at one
//! slot and is grown explicitly by payers; timestamps are 32-bit and
//! comparisons account for wrap-around.

use crate::error::{Error, PoolError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    pub block_timestamp: u32,
    pub tick_cumulative: i64,
    pub initialized: bool,
}

impl Observation {
    /// Carries an observation forward to `block_timestamp`, assuming
    /// `tick` held for the whole gap.
    fn transform(&self, block_timestamp: u32, tick: i32) -> Observation {
        let delta = block_timestamp.wrapping_sub(self.block_timestamp);
        Observation {
            block_timestamp,
            tick_cumulative: self
                .tick_cumulative
                .wrapping_add(tick as i64 * delta as i64),
            initialized: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Observations {
    ring: Vec<Observation>,
}

impl Observations {
    /// Seeds slot 0 at pool initialization time.
    pub fn initialize(&mut self, time: u32) -> (u16, u16) {
        self.ring.clear();
        self.ring.push(Observation {
            block_timestamp: time,
            tick_cumulative: 0,
            initialized: true,
        });
        (1, 1)
    }

    pub fn get(&self, index: u16) -> Option<&Observation> {
        self.ring.get(index as usize)
    }

    /// Records an observation. A repeat of the newest timestamp is a
    /// no-op, so only the first price of each second is recorded.
    /// Expands the live cardinality when the write lands past the last
    /// live slot and a larger target exists.
    pub fn write(
        &mut self,
        index: u16,
        time: u32,
        tick: i32,
        cardinality: u16,
        cardinality_next: u16,
    ) -> (u16, u16) {
        let last = self.ring[index as usize];
        if last.block_timestamp == time {
            return (index, cardinality);
        }

        let cardinality_updated = if cardinality_next > cardinality && index == cardinality - 1 {
            cardinality_next
        } else {
            cardinality
        };

        let index_updated = (index + 1) % cardinality_updated;
        self.ring[index_updated as usize] = last.transform(time, tick);
        (index_updated, cardinality_updated)
    }

    /// Allocates ring slots `[current, next)` and returns the new
    /// target cardinality, or `current` unchanged when `next` is not
    /// larger. Fresh slots stay uninitialized placeholders until a
    /// write reaches them.
    pub fn grow(&mut self, current: u16, next: u16) -> u16 {
        if next <= current {
            return current;
        }
        self.ring.resize(next as usize, Observation::default());
        next
    }

    /// Cumulative tick for each `seconds_ago`, newest-first semantics:
    /// zero means "as of `time`".
    pub fn observe(
        &self,
        time: u32,
        seconds_agos: &[u32],
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> Result<Vec<i64>, Error> {
        seconds_agos
            .iter()
            .map(|&seconds_ago| self.observe_single(time, seconds_ago, tick, index, cardinality))
            .collect()
    }

    /// Single-target observation. Targets at or after the newest
    /// observation extrapolate from it; older targets are bracketed by
    /// binary search and linearly interpolated. Targets older than the
    /// oldest live observation fail.
    pub fn observe_single(
        &self,
        time: u32,
        seconds_ago: u32,
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> Result<i64, Error> {
        if seconds_ago == 0 {
            let mut last = self.ring[index as usize];
            if last.block_timestamp != time {
                last = last.transform(time, tick);
            }
            return Ok(last.tick_cumulative);
        }

        let target = time.wrapping_sub(seconds_ago);
        let (before_or_at, at_or_after) =
            self.surrounding_observations(time, target, tick, index, cardinality)?;

        if target == before_or_at.block_timestamp {
            Ok(before_or_at.tick_cumulative)
        } else if target == at_or_after.block_timestamp {
            Ok(at_or_after.tick_cumulative)
        } else {
            let observation_delta = at_or_after
                .block_timestamp
                .wrapping_sub(before_or_at.block_timestamp);
            let target_delta = target.wrapping_sub(before_or_at.block_timestamp);
            Ok(before_or_at.tick_cumulative
                + (at_or_after.tick_cumulative - before_or_at.tick_cumulative)
                    / observation_delta as i64
                    * target_delta as i64)
        }
    }

    /// Finds the observations bracketing `target`. When the target is
    /// at or after the newest observation the bracket is synthesized by
    /// extrapolation instead of searched.
    fn surrounding_observations(
        &self,
        time: u32,
        target: u32,
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> Result<(Observation, Observation), Error> {
        let mut before_or_at = self.ring[index as usize];

        if lte(time, before_or_at.block_timestamp, target) {
            if before_or_at.block_timestamp == target {
                return Ok((before_or_at, before_or_at));
            }
            return Ok((before_or_at, before_or_at.transform(target, tick)));
        }

        // oldest live observation
        before_or_at = self.ring[((index + 1) % cardinality) as usize];
        if !before_or_at.initialized {
            before_or_at = self.ring[0];
        }

        if !lte(time, before_or_at.block_timestamp, target) {
            return Err(PoolError::ObservationTooOld.into());
        }

        Ok(self.binary_search(time, target, index, cardinality))
    }

    fn binary_search(
        &self,
        time: u32,
        target: u32,
        index: u16,
        cardinality: u16,
    ) -> (Observation, Observation) {
        let cardinality = cardinality as i64;
        let mut l = (index as i64 + 1) % cardinality;
        let mut r = l + cardinality - 1;

        loop {
            let i = (l + r) / 2;

            let before_or_at = self.ring[(i % cardinality) as usize];
            if !before_or_at.initialized {
                // skip uninitialized padding on the left
                l = i + 1;
                continue;
            }

            let at_or_after = self.ring[((i + 1) % cardinality) as usize];

            let target_at_or_after = lte(time, before_or_at.block_timestamp, target);
            if target_at_or_after && lte(time, target, at_or_after.block_timestamp) {
                return (before_or_at, at_or_after);
            }

            if !target_at_or_after {
                r = i - 1;
            } else {
                l = i + 1;
            }
        }
    }
}

/// Timestamp comparison in the 32-bit cyclic order anchored at `time`:
/// everything "after" `time` is interpreted as the previous epoch.
fn lte(time: u32, a: u32, b: u32) -> bool {
    if a <= time && b <= time {
        return a <= b;
    }
    let a_adjusted = if a > time { a as u64 } else { a as u64 + (1u64 << 32) };
    let b_adjusted = if b > time { b as u64 } else { b as u64 + (1u64 << 32) };
    a_adjusted <= b_adjusted
}
