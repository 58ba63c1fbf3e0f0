/// Property-based tests using proptest
/// Invariants of the achievement join that should hold for all inputs
use proptest::prelude::*;
use rust_steam_api::achievements::merge_achievements;
use rust_steam_api::models::{
    AchievementDefinition, AchievementUnlock, AvailableGameStats, GameSchema,
    GlobalAchievementPercentage, GlobalAchievementPercentages, PlayerStats,
};
use std::collections::HashSet;

fn unlock_strategy() -> impl Strategy<Value = AchievementUnlock> {
    ("[A-F]", 0u8..=1u8, -5i64..2_000_000_000i64).prop_map(|(apiname, achieved, unlocktime)| {
        AchievementUnlock {
            apiname,
            achieved,
            unlocktime,
        }
    })
}

fn stats(unlocks: Vec<AchievementUnlock>) -> PlayerStats {
    PlayerStats {
        steam_id: "X".into(),
        game_name: "Game".into(),
        achievements: unlocks,
        success: true,
        error: None,
    }
}

fn schema(names: &HashSet<String>) -> GameSchema {
    GameSchema {
        available_game_stats: AvailableGameStats {
            achievements: names
                .iter()
                .map(|name| AchievementDefinition {
                    name: name.clone(),
                    ..Default::default()
                })
                .collect(),
        },
        ..Default::default()
    }
}

fn rarity(entries: Vec<(String, String)>) -> GlobalAchievementPercentages {
    GlobalAchievementPercentages {
        achievements: entries
            .into_iter()
            .map(|(name, percent)| GlobalAchievementPercentage { name, percent })
            .collect(),
    }
}

proptest! {
    #[test]
    fn unlock_time_iff_achieved_with_positive_timestamp(
        unlocks in prop::collection::vec(unlock_strategy(), 0..12),
    ) {
        let catalog: HashSet<String> = ["A", "B", "C", "D", "E", "F"].iter().map(|s| s.to_string()).collect();
        let merged = merge_achievements(&stats(unlocks.clone()), &schema(&catalog), &rarity(vec![]));

        prop_assert_eq!(merged.achievements.len(), unlocks.len());
        for (out, raw) in merged.achievements.iter().zip(unlocks.iter()) {
            prop_assert_eq!(out.achieved, raw.achieved == 1);
            let expected = raw.achieved == 1 && raw.unlocktime > 0;
            prop_assert_eq!(out.unlock_time.is_some(), expected);
            if let Some(time) = out.unlock_time {
                prop_assert_eq!(time.timestamp(), raw.unlocktime);
            }
        }
    }

    #[test]
    fn never_emits_keys_missing_from_catalog(
        unlocks in prop::collection::vec(unlock_strategy(), 0..12),
        catalog in prop::collection::hash_set("[A-F]", 0..6),
    ) {
        let merged = merge_achievements(&stats(unlocks.clone()), &schema(&catalog), &rarity(vec![]));

        prop_assert!(merged.achievements.iter().all(|a| catalog.contains(&a.name)));
        let expected: Vec<&str> = unlocks
            .iter()
            .filter(|u| catalog.contains(&u.apiname))
            .map(|u| u.apiname.as_str())
            .collect();
        let actual: Vec<&str> = merged.achievements.iter().map(|a| a.name.as_str()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn missing_rarity_yields_zero(
        unlocks in prop::collection::vec(unlock_strategy(), 0..12),
        rated in prop::collection::hash_map("[A-F]", 0.0f64..100.0, 0..6),
    ) {
        let catalog: HashSet<String> = ["A", "B", "C", "D", "E", "F"].iter().map(|s| s.to_string()).collect();
        let percentages = rarity(
            rated.iter().map(|(k, v)| (k.clone(), v.to_string())).collect(),
        );
        let merged = merge_achievements(&stats(unlocks), &schema(&catalog), &percentages);

        for achievement in &merged.achievements {
            match rated.get(&achievement.name) {
                Some(value) => prop_assert_eq!(achievement.rarity, *value),
                None => prop_assert_eq!(achievement.rarity, 0.0),
            }
        }
    }
}
