// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Randomness sources
//!
//! Every random choice in a session (states, bases, collapse outcomes) is a uniform
//! draw from a small range. Sources are fallible so that a broken generator surfaces
//! as a backend failure instead of a silently biased key.

use crate::{state::Bit, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;

/// Uniform integer source over small ranges
pub trait RandomSource {
    /// Draw uniformly from `0..choices`
    fn draw(&mut self, choices: u8) -> Result<u8>;

    /// Draw a fair bit
    fn bit(&mut self) -> Result<Bit> {
        self.draw(2)
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn draw(&mut self, choices: u8) -> Result<u8> {
        (**self).draw(choices)
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn draw(&mut self, choices: u8) -> Result<u8> {
        (**self).draw(choices)
    }
}

/// Randomness backed by a `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    /// Reproducible source for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Source seeded from operating system entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: RngCore> RngSource<R> {
    /// Wrap an existing generator
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn draw(&mut self, choices: u8) -> Result<u8> {
        if choices == 0 {
            return Err(Error::Backend("cannot draw from an empty range".to_string()));
        }
        Ok(self.rng.gen_range(0..choices))
    }
}

/// Replays a fixed list of draws
///
/// Used to pin down exact walkthroughs in tests and demos. Exhausting the script or
/// replaying a value outside the requested range is reported as a backend failure.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: VecDeque<u8>,
}

impl ScriptedSource {
    pub fn new(draws: Vec<u8>) -> Self {
        Self {
            draws: draws.into(),
        }
    }

    /// Draws not yet consumed
    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedSource {
    fn draw(&mut self, choices: u8) -> Result<u8> {
        let value = self
            .draws
            .pop_front()
            .ok_or_else(|| Error::Backend("scripted randomness exhausted".to_string()))?;

        if value >= choices {
            return Err(Error::Backend(format!(
                "scripted draw {} outside range 0..{}",
                value, choices
            )));
        }
        Ok(value)
    }
}
