//! Resize Coordinator
//!
//! Keeps the surface grid in step with the host geometry. Geometry is
//! observed continuously (the TUI reports it every frame); the surface is
//! only resized when the geometry or the policy actually changes, except for
//! policy toggles, which always resize immediately.

use crate::surface::{CellMetrics, GridSize, HostGeometry, SizingPolicy, TerminalSurface};

/// Applies the current sizing policy to a surface as the host changes
#[derive(Clone, Debug)]
pub struct ResizeCoordinator {
    policy: SizingPolicy,
    metrics: CellMetrics,
    geometry: Option<HostGeometry>,
    attached: bool,
}

impl ResizeCoordinator {
    /// Create an attached coordinator
    #[must_use]
    pub fn new(policy: SizingPolicy, metrics: CellMetrics) -> Self {
        Self {
            policy,
            metrics,
            geometry: None,
            attached: true,
        }
    }

    /// Current policy
    #[must_use]
    pub fn policy(&self) -> SizingPolicy {
        self.policy
    }

    /// Last observed host geometry
    #[must_use]
    pub fn geometry(&self) -> Option<HostGeometry> {
        self.geometry
    }

    /// Whether observations are still being applied
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Record the host geometry; resizes only if it changed
    ///
    /// Returns the new grid size when a resize happened.
    pub fn observe(&mut self, geometry: HostGeometry, surface: &mut TerminalSurface) -> Option<GridSize> {
        if !self.attached || self.geometry == Some(geometry) {
            return None;
        }
        self.geometry = Some(geometry);
        Some(surface.resize(self.policy, geometry, self.metrics))
    }

    /// Switch policy and resize immediately, even with unchanged geometry
    pub fn set_policy(&mut self, policy: SizingPolicy, surface: &mut TerminalSurface) -> Option<GridSize> {
        self.policy = policy;
        tracing::debug!(?policy, "sizing policy changed");
        self.refit(surface)
    }

    /// Reapply the current policy and geometry unconditionally
    ///
    /// Used after the surface is recreated. Before the first geometry is
    /// known only the policy is recorded on the surface and `None` is
    /// returned; once detached nothing happens.
    pub fn refit(&mut self, surface: &mut TerminalSurface) -> Option<GridSize> {
        if !self.attached {
            return None;
        }
        let Some(geometry) = self.geometry else {
            surface.set_policy(self.policy);
            return None;
        };
        Some(surface.resize(self.policy, geometry, self.metrics))
    }

    /// Stop observing; later calls are ignored
    pub fn detach(&mut self) {
        self.attached = false;
        self.geometry = None;
    }
}
