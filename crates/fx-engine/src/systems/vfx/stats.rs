/// Per-update spawn and cull counters, plus pool occupancy at the end of
/// the update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VfxFrameStats {
    pub spawned_core: u32,
    pub spawned_trail: u32,
    pub culled_soft: u32,
    pub culled_hard: u32,
    pub culled_pacing: u32,
    pub active_particles: u32,
    pub active_instances: u32,
    pub active_decals: u32,
}

impl VfxFrameStats {
    /// Core and trail particles spawned so far this update.
    pub fn spawned(&self) -> u32 {
        self.spawned_core + self.spawned_trail
    }

    pub fn culled(&self) -> u32 {
        self.culled_soft + self.culled_hard + self.culled_pacing
    }
}

/// Per-update particle spawn caps. A zero cap is disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnBudget {
    pub soft_cap: u32,
    pub hard_cap: u32,
    pub pacing_enabled: bool,
    pub pacing_threshold: u32,
}

impl SpawnBudget {
    /// Reduce a spawn request so the update total stays within every enabled
    /// cap, in pacing → soft → hard order. Each cap charges what it removes
    /// to its own cull counter.
    pub fn limit(&self, mut count: u32, stats: &mut VfxFrameStats) -> u32 {
        let spawned = stats.spawned();
        if self.pacing_enabled && self.pacing_threshold > 0 {
            count = clip(count, self.pacing_threshold, spawned, &mut stats.culled_pacing);
        }
        if self.soft_cap > 0 {
            count = clip(count, self.soft_cap, spawned, &mut stats.culled_soft);
        }
        if self.hard_cap > 0 {
            count = clip(count, self.hard_cap, spawned, &mut stats.culled_hard);
        }
        count
    }
}

fn clip(count: u32, cap: u32, spawned: u32, culled: &mut u32) -> u32 {
    let allowed = cap.saturating_sub(spawned);
    if count > allowed {
        *culled += count - allowed;
        allowed
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_budget_passes_through() {
        let mut stats = VfxFrameStats::default();
        assert_eq!(SpawnBudget::default().limit(500, &mut stats), 500);
        assert_eq!(stats.culled(), 0);
    }

    #[test]
    fn pacing_applies_before_soft_and_hard() {
        let budget = SpawnBudget {
            soft_cap: 30,
            hard_cap: 20,
            pacing_enabled: true,
            pacing_threshold: 40,
        };
        let mut stats = VfxFrameStats::default();
        assert_eq!(budget.limit(50, &mut stats), 20);
        assert_eq!(stats.culled_pacing, 10);
        assert_eq!(stats.culled_soft, 10);
        assert_eq!(stats.culled_hard, 10);
    }

    #[test]
    fn caps_count_earlier_spawns() {
        let budget = SpawnBudget {
            soft_cap: 10,
            ..SpawnBudget::default()
        };
        let mut stats = VfxFrameStats {
            spawned_core: 8,
            spawned_trail: 4,
            ..VfxFrameStats::default()
        };
        assert_eq!(budget.limit(5, &mut stats), 0);
        assert_eq!(stats.culled_soft, 5);
    }

    #[test]
    fn pacing_ignored_when_disabled() {
        let budget = SpawnBudget {
            pacing_enabled: false,
            pacing_threshold: 1,
            ..SpawnBudget::default()
        };
        let mut stats = VfxFrameStats::default();
        assert_eq!(budget.limit(9, &mut stats), 9);
    }
}
