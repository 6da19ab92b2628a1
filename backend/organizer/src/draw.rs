//! The draw: turns a group's participants into giver → receiver pairs.
//!
//! Every draw is a derangement of the group: each participant gives exactly
//! once, receives exactly once, and never draws themselves. Nothing in here
//! touches storage or the network.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

use crate::config::DrawMode;
use crate::models::{Assignment, Participant};

/// Smallest group that admits a derangement.
pub const MIN_PARTICIPANTS: usize = 2;

/// Give-up point for [`DrawMode::Uniform`]. A random permutation is a
/// derangement with probability ~1/e, so this is never hit in practice.
const MAX_UNIFORM_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("At least {MIN_PARTICIPANTS} participants are needed for a draw, found {found}")]
    InsufficientParticipants { found: usize },

    #[error("Draw generator failed: {0}")]
    Generator(String),
}

/// Draw with the default cyclic construction and the thread-local RNG.
pub fn generate(participants: &[Participant]) -> Result<Vec<Assignment>, DrawError> {
    generate_with(participants, DrawMode::Cycle, &mut rand::thread_rng())
}

/// Draw using `mode` and an explicit random source.
///
/// The returned list follows the input order of givers, so `[A, B]` always
/// yields `[A → B, B → A]`.
pub fn generate_with<R: Rng + ?Sized>(
    participants: &[Participant],
    mode: DrawMode,
    rng: &mut R,
) -> Result<Vec<Assignment>, DrawError> {
    let n = participants.len();
    if n < MIN_PARTICIPANTS {
        return Err(DrawError::InsufficientParticipants { found: n });
    }

    let mut seen = HashSet::with_capacity(n);
    if let Some(dup) = participants.iter().find(|p| !seen.insert(p.id)) {
        return Err(DrawError::Generator(format!(
            "participant {} appears more than once",
            dup.id
        )));
    }

    let receivers = match mode {
        DrawMode::Cycle => cyclic_receivers(n, rng),
        DrawMode::Uniform => uniform_receivers(n, rng)?,
    };

    let assignments: Vec<Assignment> = participants
        .iter()
        .zip(&receivers)
        .map(|(giver, &r)| Assignment {
            giver: giver.clone(),
            receiver: participants[r].clone(),
        })
        .collect();

    verify_derangement(participants, &assignments)?;
    Ok(assignments)
}

/// Shuffle the positions, then let each one give to its successor in the
/// shuffled order. `receivers[g]` is the index of giver `g`'s receiver.
fn cyclic_receivers<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut receivers = vec![0; n];
    for (i, &giver) in order.iter().enumerate() {
        receivers[giver] = order[(i + 1) % n];
    }
    receivers
}

/// Rejection-sample uniform permutations until one has no fixed point.
fn uniform_receivers<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Vec<usize>, DrawError> {
    let mut perm: Vec<usize> = (0..n).collect();
    for _ in 0..MAX_UNIFORM_ATTEMPTS {
        perm.shuffle(rng);
        if perm.iter().enumerate().all(|(i, &r)| i != r) {
            return Ok(perm);
        }
    }
    Err(DrawError::Generator(format!(
        "no derangement found after {MAX_UNIFORM_ATTEMPTS} attempts"
    )))
}

/// Check that `assignments` is a derangement of `participants`.
pub fn verify_derangement(
    participants: &[Participant],
    assignments: &[Assignment],
) -> Result<(), DrawError> {
    if assignments.len() != participants.len() {
        return Err(DrawError::Generator(format!(
            "{} assignments for {} participants",
            assignments.len(),
            participants.len()
        )));
    }

    let members: HashSet<_> = participants.iter().map(|p| p.id).collect();
    let mut givers = HashSet::with_capacity(assignments.len());
    let mut receivers = HashSet::with_capacity(assignments.len());

    for a in assignments {
        if a.giver.id == a.receiver.id {
            return Err(DrawError::Generator(format!(
                "participant {} drew themselves",
                a.giver.id
            )));
        }
        if !members.contains(&a.giver.id) || !members.contains(&a.receiver.id) {
            return Err(DrawError::Generator(
                "assignment references a non-member".to_string(),
            ));
        }
        if !givers.insert(a.giver.id) {
            return Err(DrawError::Generator(format!(
                "participant {} gives twice",
                a.giver.id
            )));
        }
        if !receivers.insert(a.receiver.id) {
            return Err(DrawError::Generator(format!(
                "participant {} receives twice",
                a.receiver.id
            )));
        }
    }
    Ok(())
}
