use rand::Rng;
use rand::seq::SliceRandom;

pub const MOTIVATIONAL_QUOTES: &[&str] = &[
    "Great work! Time for a well-deserved break! 🎉",
    "You crushed it! Take a moment to recharge. ⚡",
    "Fantastic focus! Your productivity is on fire! 🔥",
    "Mission accomplished! Time to stretch and relax. 🌟",
    "You're unstoppable! Keep up the amazing work! 💪",
    "Brilliant session! Your dedication is inspiring. ✨",
    "Time's up! You've earned this break, champion! 🏆",
    "Incredible focus! You're making great progress. 🚀",
    "Well done! Every session brings you closer to your goals. 🎯",
    "Amazing effort! Take a breather, you've earned it. 🌈",
    "You're on a roll! Keep this momentum going! 🎊",
    "Superb concentration! Time to rest those brain cells. 🧠",
    "Outstanding work! You're building great habits. 💎",
    "Excellent session! Your future self will thank you. 🌸",
    "You did it! Small steps lead to big achievements. 🌱",
    "Phenomenal focus! Take a break and celebrate! 🎈",
    "Bravo! You're turning time into accomplishments. ⏰",
    "Stellar performance! Rest up for the next round. 🌙",
    "You're a productivity powerhouse! Keep shining! ⭐",
    "Awesome work! Progress over perfection, always. 🎨",
];

pub fn random_quote<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MOTIVATIONAL_QUOTES
        .choose(rng)
        .copied()
        .unwrap_or("Session complete!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn same_seed_same_quote() {
        let a = random_quote(&mut StdRng::seed_from_u64(7));
        let b = random_quote(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(MOTIVATIONAL_QUOTES.contains(&a));
    }
}
