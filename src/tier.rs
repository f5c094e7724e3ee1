use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Mutually exclusive rendering strategies, richest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderTier {
    Loading,
    Model,
    ProceduralFallback,
    FlatFallback,
    Unsupported,
}

impl RenderTier {
    pub const ALL: [RenderTier; 5] = [
        RenderTier::Loading,
        RenderTier::Model,
        RenderTier::ProceduralFallback,
        RenderTier::FlatFallback,
        RenderTier::Unsupported,
    ];

    /// Whether this tier draws through the hardware-accelerated renderer.
    pub fn is_accelerated(self) -> bool {
        matches!(
            self,
            RenderTier::Loading | RenderTier::Model | RenderTier::ProceduralFallback
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            RenderTier::Loading => "loading",
            RenderTier::Model => "model",
            RenderTier::ProceduralFallback => "procedural-fallback",
            RenderTier::FlatFallback => "flat-fallback",
            RenderTier::Unsupported => "unsupported",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.name() == name)
    }

    /// Visual richness used to cap tiers after a render failure. Loading and
    /// the procedural placeholder share a level.
    fn richness(self) -> u8 {
        match self {
            RenderTier::Model => 3,
            RenderTier::Loading | RenderTier::ProceduralFallback => 2,
            RenderTier::FlatFallback => 1,
            RenderTier::Unsupported => 0,
        }
    }

    /// Tier to fall back to when a frame drawn in `self` fails.
    pub fn demoted(self) -> Option<RenderTier> {
        match self {
            RenderTier::Model => Some(RenderTier::ProceduralFallback),
            RenderTier::Loading | RenderTier::ProceduralFallback => Some(RenderTier::FlatFallback),
            RenderTier::FlatFallback => Some(RenderTier::Unsupported),
            RenderTier::Unsupported => None,
        }
    }
}

impl fmt::Display for RenderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress of the current load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Pending,
    Loaded,
    Failed,
}

/// Chooses the tier for a capability result and load state.
pub fn select(capability_ok: bool, load: LoadState) -> RenderTier {
    if !capability_ok {
        return RenderTier::FlatFallback;
    }
    match load {
        LoadState::Pending => RenderTier::Loading,
        LoadState::Loaded => RenderTier::Model,
        LoadState::Failed => RenderTier::ProceduralFallback,
    }
}

/// Tracks the active tier across load attempts and render failures.
///
/// The selected tier is `select(capability, load)` capped by the floor left
/// behind by the most recent render failure. Floors only ever lower.
#[derive(Debug, Clone)]
pub struct TierMachine {
    capability_ok: bool,
    load: LoadState,
    floor: Option<RenderTier>,
    current: RenderTier,
    history: Vec<RenderTier>,
}

impl TierMachine {
    /// Starts in `Loading`. Without capability the machine passes through
    /// `Unsupported` straight to `FlatFallback`.
    pub fn new(capability_ok: bool) -> Self {
        let mut machine = Self {
            capability_ok,
            load: LoadState::Pending,
            floor: None,
            current: RenderTier::Loading,
            history: vec![RenderTier::Loading],
        };
        if !capability_ok {
            machine.enter(RenderTier::Unsupported);
            machine.refresh();
        }
        machine
    }

    pub fn current(&self) -> RenderTier {
        self.current
    }

    pub fn capability_ok(&self) -> bool {
        self.capability_ok
    }

    pub fn load_state(&self) -> LoadState {
        self.load
    }

    /// Every tier entered since mount, in order.
    pub fn history(&self) -> &[RenderTier] {
        &self.history
    }

    /// A new load attempt restarts from `Loading`.
    pub fn begin_load(&mut self) -> RenderTier {
        self.load = LoadState::Pending;
        self.refresh()
    }

    /// Applies the outcome of the current load attempt. Settling twice is
    /// ignored so a tier never moves backwards within one attempt.
    pub fn settle(&mut self, success: bool) -> RenderTier {
        if self.load == LoadState::Pending {
            self.load = if success {
                LoadState::Loaded
            } else {
                LoadState::Failed
            };
        }
        self.refresh()
    }

    /// Lowers the floor below the tier whose frame just failed.
    pub fn demote_after_failure(&mut self) -> RenderTier {
        if let Some(next) = self.current.demoted() {
            warn!("frame failed in {} tier; demoting to {next}", self.current);
            self.floor = Some(match self.floor {
                Some(floor) if floor.richness() <= next.richness() => floor,
                _ => next,
            });
        }
        self.refresh()
    }

    fn refresh(&mut self) -> RenderTier {
        let selected = select(self.capability_ok, self.load);
        let next = match self.floor {
            Some(floor) if floor.richness() < selected.richness() => floor,
            _ => selected,
        };
        self.enter(next);
        next
    }

    fn enter(&mut self, tier: RenderTier) {
        if tier != self.current {
            info!("viewport tier {} -> {tier}", self.current);
            self.current = tier;
            self.history.push(tier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_matches_decision_table() {
        for load in [LoadState::Pending, LoadState::Loaded, LoadState::Failed] {
            assert_eq!(select(false, load), RenderTier::FlatFallback);
        }
        assert_eq!(select(true, LoadState::Pending), RenderTier::Loading);
        assert_eq!(select(true, LoadState::Loaded), RenderTier::Model);
        assert_eq!(select(true, LoadState::Failed), RenderTier::ProceduralFallback);
    }

    #[test]
    fn select_is_idempotent() {
        for capability in [true, false] {
            for load in [LoadState::Pending, LoadState::Loaded, LoadState::Failed] {
                let first = select(capability, load);
                assert!((0..10).all(|_| select(capability, load) == first));
            }
        }
    }

    #[test]
    fn missing_capability_passes_through_unsupported() {
        let mut machine = TierMachine::new(false);
        assert_eq!(
            machine.history(),
            [RenderTier::Loading, RenderTier::Unsupported, RenderTier::FlatFallback]
        );
        assert_eq!(machine.settle(true), RenderTier::FlatFallback);
    }

    #[test]
    fn load_outcomes_select_model_or_placeholder() {
        let mut ok = TierMachine::new(true);
        assert_eq!(ok.current(), RenderTier::Loading);
        assert_eq!(ok.settle(true), RenderTier::Model);

        let mut failed = TierMachine::new(true);
        assert_eq!(failed.settle(false), RenderTier::ProceduralFallback);
        assert_eq!(failed.settle(true), RenderTier::ProceduralFallback);
    }

    #[test]
    fn render_failures_walk_down_the_chain() {
        let mut machine = TierMachine::new(true);
        machine.settle(true);
        assert_eq!(machine.demote_after_failure(), RenderTier::ProceduralFallback);
        assert_eq!(machine.demote_after_failure(), RenderTier::FlatFallback);
        assert_eq!(machine.demote_after_failure(), RenderTier::Unsupported);
        assert_eq!(machine.demote_after_failure(), RenderTier::Unsupported);
    }

    #[test]
    fn reload_after_demotion_never_promotes_past_the_floor() {
        let mut machine = TierMachine::new(true);
        machine.settle(true);
        machine.demote_after_failure();
        assert_eq!(machine.begin_load(), RenderTier::Loading);
        assert_eq!(machine.settle(true), RenderTier::ProceduralFallback);
    }

    #[test]
    fn tier_names_round_trip() {
        for tier in RenderTier::ALL {
            assert_eq!(RenderTier::from_name(tier.name()), Some(tier));
        }
        assert_eq!(RenderTier::from_name("bogus"), None);
    }
}
