//! Picks one candidate per visible marker.
//!
//! With two or more markers the resolver runs a greedy nearest-neighbour
//! consensus from both ends of the group list and keeps the cheaper result.
//! A lone marker has no cross-marker evidence, so it is compared against a
//! position prior instead, falling back to a fixed rule when none exists.
//!
//! Ties are broken deterministically:
//! - lone marker with a prior: equal distances keep the primary;
//! - clustering: a group equidistant from the seed takes its secondary;
//! - seed comparison: equal totals keep the secondary seed;
//! - anchor comparison: equal totals keep the last-group anchor.

use crate::candidate::{AmbiguousPose, CandidateGroup, Choice};
use crate::transform::{RigidTransform, Scalar, Translation};
use crate::tuning::SingleMarkerFallback;
use serde::Serialize;
use tracing::{debug, warn};

/// The disambiguated pose contributed by one marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub marker_id: u32,
    pub choice: Choice,
    pub pose: RigidTransform,
}

/// Priors available for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Priors {
    /// Same-frame position from an independent source such as odometry.
    pub odometry: Option<Translation>,
    /// The previous frame's estimate.
    pub last_known: Option<RigidTransform>,
}

/// Which end of the group list seeded the winning cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Anchor {
    First,
    Last,
}

/// How a frame was disambiguated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Strategy {
    Empty,
    Odometry,
    LastKnown,
    Fallback,
    Cluster { anchor: Anchor, total_error: Scalar },
}

impl Strategy {
    /// Short name for logs and tables.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Empty => "empty",
            Strategy::Odometry => "odometry",
            Strategy::LastKnown => "last_known",
            Strategy::Fallback => "fallback",
            Strategy::Cluster {
                anchor: Anchor::First,
                ..
            } => "cluster_first",
            Strategy::Cluster {
                anchor: Anchor::Last,
                ..
            } => "cluster_last",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// One sample per group, in group order.
    pub samples: Vec<PoseSample>,
    pub strategy: Strategy,
}

pub fn resolve(
    groups: &[CandidateGroup],
    priors: &Priors,
    fallback: SingleMarkerFallback,
) -> Resolution {
    match groups {
        [] => Resolution {
            samples: Vec::new(),
            strategy: Strategy::Empty,
        },
        [group] => {
            let (choice, strategy) = resolve_single(&group.candidates, priors, fallback);
            Resolution {
                samples: vec![sample(group, choice)],
                strategy,
            }
        }
        _ => {
            let first = cluster(groups, 0);
            let last = cluster(groups, groups.len() - 1);
            debug!(
                first_error = first.total_error,
                last_error = last.total_error,
                "cluster anchors"
            );
            let (fit, anchor) = if first.total_error < last.total_error {
                (first, Anchor::First)
            } else {
                (last, Anchor::Last)
            };
            Resolution {
                samples: groups
                    .iter()
                    .zip(&fit.choices)
                    .map(|(group, choice)| sample(group, *choice))
                    .collect(),
                strategy: Strategy::Cluster {
                    anchor,
                    total_error: fit.total_error,
                },
            }
        }
    }
}

fn sample(group: &CandidateGroup, choice: Choice) -> PoseSample {
    PoseSample {
        marker_id: group.marker_id,
        choice,
        pose: *group.candidates.get(choice),
    }
}

// ---------------------------------------------------------------------------
// SINGLE MARKER
// ---------------------------------------------------------------------------

fn resolve_single(
    pair: &AmbiguousPose<RigidTransform>,
    priors: &Priors,
    fallback: SingleMarkerFallback,
) -> (Choice, Strategy) {
    if let Some(odometry) = priors.odometry {
        return (nearer_or_primary(pair, odometry), Strategy::Odometry);
    }
    if let Some(last) = priors.last_known {
        return (nearer_or_primary(pair, last.translation), Strategy::LastKnown);
    }
    let choice = apply_fallback(fallback, pair);
    warn!(?choice, ?fallback, "single marker without a prior, using fallback rule");
    (choice, Strategy::Fallback)
}

fn nearer_or_primary(pair: &AmbiguousPose<RigidTransform>, reference: Translation) -> Choice {
    let d = pair.map(|p| p.translation.distance(reference));
    if d.primary > d.secondary {
        Choice::Secondary
    } else {
        Choice::Primary
    }
}

/// Applies a prior-free rule to a lone ambiguous pair.
pub fn apply_fallback(
    fallback: SingleMarkerFallback,
    pair: &AmbiguousPose<RigidTransform>,
) -> Choice {
    match fallback {
        SingleMarkerFallback::SignOfAxis { axis } => {
            if axis.component(pair.primary.translation) < 0.0 {
                Choice::Secondary
            } else {
                Choice::Primary
            }
        }
        SingleMarkerFallback::Primary => Choice::Primary,
        SingleMarkerFallback::Secondary => Choice::Secondary,
    }
}

// ---------------------------------------------------------------------------
// CLUSTERING
// ---------------------------------------------------------------------------

struct ClusterFit {
    /// Indexed like the input groups.
    choices: Vec<Choice>,
    total_error: Scalar,
}

/// Runs both seeds of `groups[anchor]` against every other group and keeps
/// the seed with the smaller summed nearest distance.
///
/// Each seed's reference point stays fixed at the seed's own translation.
fn cluster(groups: &[CandidateGroup], anchor: usize) -> ClusterFit {
    let seed = |choice: Choice| {
        let reference = groups[anchor].candidates.get(choice).translation;
        let mut choices = Vec::with_capacity(groups.len());
        let mut total_error = 0.0;
        for (i, group) in groups.iter().enumerate() {
            if i == anchor {
                choices.push(choice);
                continue;
            }
            let d = group.candidates.map(|p| p.translation.distance(reference));
            if d.primary < d.secondary {
                choices.push(Choice::Primary);
                total_error += d.primary;
            } else {
                choices.push(Choice::Secondary);
                total_error += d.secondary;
            }
        }
        ClusterFit {
            choices,
            total_error,
        }
    };

    let primary = seed(Choice::Primary);
    let secondary = seed(Choice::Secondary);
    if primary.total_error < secondary.total_error {
        primary
    } else {
        secondary
    }
}
