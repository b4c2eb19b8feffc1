//! Time-of-day theme and background scene selection.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::settings::ThemeChoice;

pub const AUTO: &str = "auto";
const DAY_START_HOUR: u32 = 6;
const NIGHT_START_HOUR: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Day,
    Night,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scene {
    pub id: &'static str,
    pub label: &'static str,
    pub period: DayPeriod,
}

const fn scene(id: &'static str, label: &'static str, period: DayPeriod) -> Scene {
    Scene { id, label, period }
}

pub const SCENES: &[Scene] = &[
    scene("mars", "Mars Landscape", DayPeriod::Day),
    scene("classic-console", "Classic Console Gaming", DayPeriod::Day),
    scene("fantasy-valley", "Fantasy Valley", DayPeriod::Day),
    scene("lofi-autumn-afternoon", "Lofi Autumn Afternoon", DayPeriod::Day),
    scene("white-tree-sunset", "White Tree Sunset", DayPeriod::Day),
    scene("samurai-sunset", "Samurai Sunset", DayPeriod::Day),
    scene("ghost-of-tsushima", "Ghost of Tsushima", DayPeriod::Night),
    scene("valorant-homescreen", "Valorant Homescreen", DayPeriod::Night),
    scene("cozy-lofi-night", "Cozy Lofi Night Study", DayPeriod::Night),
    scene("dark-space-planets", "Dark Space Planets", DayPeriod::Night),
    scene("lofi-study-break", "Furry Lofi Study Break", DayPeriod::Night),
    scene("lofi-fireworks", "Lofi Fireworks", DayPeriod::Night),
    scene("symbiote-spider-man", "Symbiote Spider-Man", DayPeriod::Night),
];

pub fn period_for_hour(hour: u32) -> DayPeriod {
    if (DAY_START_HOUR..NIGHT_START_HOUR).contains(&hour) {
        DayPeriod::Day
    } else {
        DayPeriod::Night
    }
}

pub fn resolve_theme(choice: ThemeChoice, hour: u32) -> DayPeriod {
    match choice {
        ThemeChoice::Auto => period_for_hour(hour),
        ThemeChoice::Day => DayPeriod::Day,
        ThemeChoice::Night => DayPeriod::Night,
    }
}

pub fn find(id: &str) -> Option<&'static Scene> {
    SCENES.iter().find(|s| s.id == id)
}

/// Picks the scene for a `videoBackground` setting. Unknown ids behave
/// like `auto`.
pub fn resolve_scene<R: Rng + ?Sized>(choice: &str, hour: u32, rng: &mut R) -> &'static Scene {
    if let Some(scene) = find(choice) {
        return scene;
    }
    let period = period_for_hour(hour);
    let candidates: Vec<&'static Scene> = SCENES.iter().filter(|s| s.period == period).collect();
    candidates.choose(rng).copied().unwrap_or(&SCENES[0])
}

/// Next selectable background id after `current`, with `auto` first.
pub fn cycle_id(current: &str, forward: bool) -> &'static str {
    let ids: Vec<&'static str> = std::iter::once(AUTO).chain(SCENES.iter().map(|s| s.id)).collect();
    let idx = ids.iter().position(|&id| id == current).unwrap_or(0);
    let next = if forward {
        (idx + 1) % ids.len()
    } else if idx == 0 {
        ids.len() - 1
    } else {
        idx - 1
    };
    ids[next]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn day_runs_from_six_to_eighteen() {
        assert_eq!(period_for_hour(5), DayPeriod::Night);
        assert_eq!(period_for_hour(6), DayPeriod::Day);
        assert_eq!(period_for_hour(17), DayPeriod::Day);
        assert_eq!(period_for_hour(18), DayPeriod::Night);
        assert_eq!(resolve_theme(ThemeChoice::Night, 12), DayPeriod::Night);
    }

    #[test]
    fn auto_scene_matches_period() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..20 {
            assert_eq!(resolve_scene(AUTO, 10, &mut rng).period, DayPeriod::Day);
            assert_eq!(resolve_scene(AUTO, 23, &mut rng).period, DayPeriod::Night);
        }
    }

    #[test]
    fn explicit_scene_wins_and_unknown_falls_back() {
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(resolve_scene("mars", 23, &mut rng).id, "mars");
        assert_eq!(resolve_scene("nope", 23, &mut rng).period, DayPeriod::Night);
    }

    #[test]
    fn cycling_wraps_through_auto() {
        assert_eq!(cycle_id(AUTO, true), "mars");
        assert_eq!(cycle_id(AUTO, false), "symbiote-spider-man");
        assert_eq!(cycle_id("symbiote-spider-man", true), AUTO);
    }
}
