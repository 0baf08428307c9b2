use serde::Deserialize;

/// Tunable combat rules.
///
/// Clients load these from the `[rules]` section of their config file;
/// everything defaults to the standard loadout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub starting_health: u32,
    pub gun_damage: u32,
    pub max_ammo: u32,
    /// Whether the trigger only fires while a match is running.
    pub trigger_requires_running: bool,
    /// Whether a full-ammo pickup only counts while a match is running.
    pub reload_requires_running: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            starting_health: 5,
            gun_damage: 1,
            max_ammo: 100,
            trigger_requires_running: true,
            reload_requires_running: false,
        }
    }
}
