// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target selection for automatic cycles

use crate::signal::RoadGroup;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Chooses which road group an automatic cycle turns GREEN
pub trait TargetPicker: Send + Sync {
    fn pick(&self) -> RoadGroup;
}

/// Uniform choice among the four roads, mapped down to their groups
pub struct RandomPicker {
    rng: Mutex<ChaCha8Rng>,
}

impl RandomPicker {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(ChaCha8Rng::from_entropy()),
        }
    }
}

impl TargetPicker for RandomPicker {
    fn pick(&self) -> RoadGroup {
        let road: u8 = self
            .rng
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .gen_range(1..=4);
        if road <= 2 {
            RoadGroup::A
        } else {
            RoadGroup::B
        }
    }
}

/// Scripted picker that repeats a fixed sequence
pub struct SequencePicker {
    targets: Vec<RoadGroup>,
    next: AtomicUsize,
}

impl SequencePicker {
    /// An empty sequence always picks group A
    pub fn new(targets: impl Into<Vec<RoadGroup>>) -> Self {
        Self {
            targets: targets.into(),
            next: AtomicUsize::new(0),
        }
    }
}

impl TargetPicker for SequencePicker {
    fn pick(&self) -> RoadGroup {
        if self.targets.is_empty() {
            return RoadGroup::A;
        }
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        self.targets[n % self.targets.len()]
    }
}
