pub const FADE_STEP: u8 = 25;
pub const ALPHA_TIME_MS: u64 = 50;
pub const FOLIAGE_ALPHA: u8 = 76;
pub const TRANSLUCENT_ALPHA: u8 = 178;
pub const OPAQUE: u8 = u8::MAX;

/// Moves `current` one fade step toward `target` without overshooting.
/// With fading disabled the value snaps to `target`.
///
/// Returns the new alpha and whether it differs from `current`.
pub fn advance_alpha(current: u8, target: u8, fading: bool) -> (u8, bool) {
    let next = if !fading {
        target
    } else if current > target {
        current.saturating_sub(FADE_STEP).max(target)
    } else {
        current.saturating_add(FADE_STEP).min(target)
    };
    (next, next != current)
}

/// In-place form of [`advance_alpha`].
pub fn fade_toward(alpha: &mut u8, target: u8, fading: bool) -> bool {
    let (next, changed) = advance_alpha(*alpha, target, fading);
    *alpha = next;
    changed
}

/// Fade animation runs on a fixed cadence, not every frame.
#[derive(Debug, Default, Clone)]
pub struct FadeClock {
    next_tick_ms: u64,
}

impl FadeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when a fade tick is due at `now_ms` and schedules the
    /// next one.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_tick_ms {
            return false;
        }
        self.next_tick_ms = now_ms.saturating_add(ALPHA_TIME_MS);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps_to_converge(mut alpha: u8, target: u8) -> usize {
        let mut steps = 0;
        while alpha != target {
            let (next, changed) = advance_alpha(alpha, target, true);
            assert!(changed);
            if target > alpha {
                assert!(next > alpha && next <= target);
            } else {
                assert!(next < alpha && next >= target);
            }
            alpha = next;
            steps += 1;
        }
        steps
    }

    #[test]
    fn converges_in_ceil_distance_over_step_calls() {
        let cases = [(255, 0), (0, 255), (255, 76), (76, 255), (100, 178), (3, 0), (200, 200)];
        for (from, to) in cases {
            let distance = (i32::from(from) - i32::from(to)).unsigned_abs() as usize;
            let expected = distance.div_ceil(usize::from(FADE_STEP));
            assert_eq!(steps_to_converge(from, to), expected, "{from} -> {to}");
        }
    }

    #[test]
    fn settled_alpha_reports_unchanged() {
        assert_eq!(advance_alpha(76, 76, true), (76, false));
        assert_eq!(advance_alpha(0, 0, false), (0, false));
    }

    #[test]
    fn disabled_fading_snaps_to_target() {
        assert_eq!(advance_alpha(255, 0, false), (0, true));
        assert_eq!(advance_alpha(10, 178, false), (178, true));
    }

    #[test]
    fn last_step_clamps_at_target() {
        assert_eq!(advance_alpha(30, 0, true), (5, true));
        assert_eq!(advance_alpha(5, 0, true), (0, true));
        assert_eq!(advance_alpha(240, 255, true), (255, true));
    }

    #[test]
    fn clock_ticks_at_fixed_cadence() {
        let mut clock = FadeClock::new();
        assert!(clock.tick(1_000));
        assert!(!clock.tick(1_016));
        assert!(!clock.tick(1_049));
        assert!(clock.tick(1_050));
        assert!(!clock.tick(1_060));
    }
}
