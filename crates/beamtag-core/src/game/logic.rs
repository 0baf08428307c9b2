use super::player::Player;
use super::rules::GameRules;
use super::state::GameState;

/// The standard hit, ammo, and trigger rule set.
///
/// Methods mutate the passed player and report outcomes as return values for
/// the caller to act on; no IO happens here.
#[derive(Debug)]
pub struct StandardGameLogic {
    rules: GameRules,
}

impl Default for StandardGameLogic {
    fn default() -> Self {
        Self::new(GameRules::default())
    }
}

impl StandardGameLogic {
    pub fn new(rules: GameRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Resolve an incoming shot. Returns `true` exactly when this shot killed
    /// the player, meaning health went from positive to zero.
    ///
    /// Shots outside a running match never apply, and neither does friendly
    /// fire: a shot whose source team matches the player's own team is
    /// ignored whoever fired it, self included.
    pub fn hit(
        &self,
        game: &GameState,
        player: &mut Player,
        source_team: u8,
        _source_player: u8,
        damage: u32,
    ) -> bool {
        if !game.is_running() {
            return false;
        }
        if source_team == player.team_id {
            return false;
        }
        let was_alive = player.health > 0;
        player.health = player.health.saturating_sub(damage);
        was_alive && player.health == 0
    }

    /// Refill the magazine to its maximum.
    pub fn full_ammo(&self, game: &GameState, player: &mut Player) {
        if self.rules.reload_requires_running && !game.is_running() {
            return;
        }
        player.ammo = player.max_ammo;
    }

    /// Whether a trigger pull fires a shot. On `true` the caller decrements
    /// the magazine and arms the gun with the player's team, id, and damage.
    pub fn trigger(&self, game: &GameState, player: &Player) -> bool {
        if player.ammo == 0 {
            return false;
        }
        if self.rules.trigger_requires_running && !game.is_running() {
            return false;
        }
        true
    }
}
