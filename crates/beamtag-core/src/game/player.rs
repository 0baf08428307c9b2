use super::rules::GameRules;

/// A player's combat state.
///
/// Identity comes from the authority's team/player assignment; the combat
/// fields start from the game rules in force when the assignment arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub team_id: u8,
    pub player_id: u8,
    pub health: u32,
    pub gun_damage: u32,
    pub ammo: u32,
    pub max_ammo: u32,
}

impl Player {
    pub fn new(team_id: u8, player_id: u8) -> Self {
        Self::with_rules(team_id, player_id, &GameRules::default())
    }

    pub fn with_rules(team_id: u8, player_id: u8, rules: &GameRules) -> Self {
        Self {
            team_id,
            player_id,
            health: rules.starting_health,
            gun_damage: rules.gun_damage,
            ammo: rules.max_ammo,
            max_ammo: rules.max_ammo,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }
}
