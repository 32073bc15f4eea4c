//! Absolute deadlines for the nested timeout layers.
//!
//! A [`TimeoutBudget`](conduit_domain::TimeoutBudget) holds relative
//! durations. At run time each layer becomes a [`LayerDeadline`] derived from
//! its parent, so an inner layer can never outlive the layer that encloses it.

use conduit_domain::TimeoutLayer;
use std::time::Duration;
use tokio::time::Instant;

/// An absolute deadline for one timeout layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerDeadline {
    layer: TimeoutLayer,
    /// Layer whose deadline actually bounds `at`
    binding: TimeoutLayer,
    started: Instant,
    at: Instant,
}

impl LayerDeadline {
    /// Start an outermost deadline `duration` from now.
    pub fn root(layer: TimeoutLayer, duration: Duration) -> Self {
        let now = Instant::now();
        Self {
            layer,
            binding: layer,
            started: now,
            at: now + duration,
        }
    }

    /// Derive a nested deadline `duration` from now, clamped to this one.
    ///
    /// When the parent ends first, the child inherits the parent's binding
    /// layer, so an expiry is attributed to the layer whose budget ran out.
    pub fn child(&self, layer: TimeoutLayer, duration: Duration) -> Self {
        let now = Instant::now();
        let own = now + duration;
        let (at, binding) = if own <= self.at {
            (own, layer)
        } else {
            (self.at, self.binding)
        };
        Self {
            layer,
            binding,
            started: now,
            at,
        }
    }

    /// The layer this deadline was created for.
    pub fn layer(&self) -> TimeoutLayer {
        self.layer
    }

    /// The layer to report when this deadline expires.
    pub fn binding_layer(&self) -> TimeoutLayer {
        self.binding
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    /// Total span from creation to expiry.
    pub fn span(&self) -> Duration {
        self.at.saturating_duration_since(self.started)
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Time elapsed since the deadline was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
