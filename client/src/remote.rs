//! Remote-player registry: message application, interpolation and the
//! reduced-fidelity enemy feed
//!
//! The registry is owned and mutated here only; the simulation drains the
//! network channel into `apply_message` each frame, then calls `update` to
//! move every rendered transform toward its latest network-reported target.

use log::{debug, info};
use shared::{
    PlayerSnapshot, ServerMessage, Vec2, Vec3, LOD_DISTANCE, LOD_UPDATE_INTERVAL, SMOOTHING_RATE,
    SPAWN_HEIGHT,
};
use std::collections::HashMap;
use std::f32::consts::PI;

/// A remote vehicle as the local client sees it. `rendered_*` converges
/// toward `target_*` over time and never overshoots; the targets jump to
/// whatever the network last reported.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub target_position: Vec3,
    pub target_rotation: f32,
    pub rendered_position: Vec3,
    pub rendered_rotation: f32,
    pub alive: bool,
    /// Registry clock reading of the most recent network update.
    pub last_update: f32,
    lod_accum: f32,
}

impl RemotePlayer {
    fn new(position: Vec3, rotation: f32, now: f32) -> Self {
        Self {
            target_position: position,
            target_rotation: rotation,
            rendered_position: position,
            rendered_rotation: rotation,
            alive: true,
            last_update: now,
            lod_accum: 0.0,
        }
    }

    fn smooth(&mut self, alpha: f32) {
        self.rendered_position.x += (self.target_position.x - self.rendered_position.x) * alpha;
        self.rendered_position.y += (self.target_position.y - self.rendered_position.y) * alpha;
        self.rendered_position.z += (self.target_position.z - self.rendered_position.z) * alpha;

        let diff = wrap_angle(self.target_rotation - self.rendered_rotation);
        self.rendered_rotation = wrap_angle(self.rendered_rotation + diff * alpha);
    }
}

/// One minimap entry: a remote player's id and ground-plane position.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyPosition {
    pub id: String,
    pub position: Vec2,
}

/// Owns every `RemotePlayer` for the session. Entries appear on joins (or
/// implicitly, on a move for an unseen id), disappear on leaves, and are
/// interpolated every frame regardless of network traffic.
pub struct RemoteManager {
    players: HashMap<String, RemotePlayer>,
    local_id: Option<String>,
    local_position: Option<Vec2>,
    clock: f32,
}

impl RemoteManager {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            local_id: None,
            local_position: None,
            clock: 0.0,
        }
    }

    /// The local id is never tracked as a remote player, even if the relay
    /// echoes our own messages back.
    pub fn set_local_player_id(&mut self, id: &str) {
        self.players.remove(id);
        self.local_id = Some(id.to_string());
    }

    fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    /// Inserts a new remote player. A duplicate join is treated as an
    /// update, not an error.
    pub fn add_player(&mut self, id: &str, initial_position: Option<Vec3>) {
        if self.is_local(id) {
            return;
        }

        let now = self.clock;
        match self.players.get_mut(id) {
            Some(existing) => {
                if let Some(position) = initial_position {
                    existing.target_position = position;
                    existing.last_update = now;
                }
            }
            None => {
                let spawn = initial_position.unwrap_or(Vec3::new(0.0, SPAWN_HEIGHT, 0.0));
                info!("Remote player {} joined", id);
                self.players
                    .insert(id.to_string(), RemotePlayer::new(spawn, 0.0, now));
            }
        }
    }

    /// Removing an id that is not present is a no-op.
    pub fn remove_player(&mut self, id: &str) {
        if self.players.remove(id).is_some() {
            info!("Remote player {} left", id);
        }
    }

    /// Updates the interpolation target for a remote player. An update for
    /// an unseen id is an implicit join, tolerating move messages that
    /// arrive before their join on an unordered transport.
    pub fn update_player_position(&mut self, id: &str, position: Vec3, rotation: f32) {
        if self.is_local(id) {
            return;
        }

        let now = self.clock;
        match self.players.get_mut(id) {
            Some(player) => {
                player.target_position = position;
                player.target_rotation = rotation;
                player.last_update = now;
            }
            None => {
                debug!("Move for unseen player {}; treating as join", id);
                self.players
                    .insert(id.to_string(), RemotePlayer::new(position, rotation, now));
            }
        }
    }

    pub fn mark_eliminated(&mut self, id: &str) {
        if let Some(player) = self.players.get_mut(id) {
            player.alive = false;
            info!("Remote player {} eliminated", id);
        }
    }

    /// Records where the local player is; used only to decide which remote
    /// players get full-rate interpolation.
    pub fn set_local_player_position(&mut self, position: Vec2) {
        self.local_position = Some(position);
    }

    /// Applies one decoded relay message to the registry. `Welcome` is
    /// consumed by the connect handshake and ignored here; a full
    /// `GameState` snapshot behaves as a join-or-update per entry.
    pub fn apply_message(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::Welcome { .. } => {}
            ServerMessage::PlayerJoined { player_id } => {
                self.add_player(player_id, None);
            }
            ServerMessage::PlayerLeft { player_id } => {
                self.remove_player(player_id);
            }
            ServerMessage::PlayerMoved {
                player_id,
                transform,
            } => {
                self.update_player_position(player_id, transform.position(), transform.rotation);
            }
            ServerMessage::GameState { players } => {
                for (player_id, snapshot) in players {
                    self.apply_snapshot(player_id, snapshot);
                }
            }
            ServerMessage::PlayerEliminated { player_id } => {
                self.mark_eliminated(player_id);
            }
        }
    }

    fn apply_snapshot(&mut self, id: &str, snapshot: &PlayerSnapshot) {
        if self.is_local(id) {
            return;
        }
        self.update_player_position(id, snapshot.transform.position(), snapshot.transform.rotation);
        if snapshot.eliminated {
            if let Some(player) = self.players.get_mut(id) {
                player.alive = false;
            }
        }
    }

    /// Advances every rendered transform toward its target with exponential
    /// smoothing bounded by `delta`. Remote players beyond the LOD distance
    /// are re-smoothed on a reduced cadence instead of every frame.
    pub fn update(&mut self, delta: f32) {
        self.clock += delta;
        let alpha = 1.0 - (-SMOOTHING_RATE * delta).exp();
        let lod_sq = LOD_DISTANCE * LOD_DISTANCE;

        for player in self.players.values_mut() {
            let far = match self.local_position {
                Some(local) => {
                    local.distance_squared(&player.target_position.ground()) > lod_sq
                }
                None => false,
            };

            if far {
                player.lod_accum += delta;
                if player.lod_accum < LOD_UPDATE_INTERVAL {
                    continue;
                }
                let coarse = 1.0 - (-SMOOTHING_RATE * player.lod_accum).exp();
                player.smooth(coarse);
                player.lod_accum = 0.0;
            } else {
                player.lod_accum = 0.0;
                player.smooth(alpha);
            }
        }
    }

    /// Snapshot of all tracked remote players' ground-plane positions for
    /// the minimap; no ordering guarantee.
    pub fn enemy_positions(&self) -> Vec<EnemyPosition> {
        self.players
            .iter()
            .map(|(id, player)| EnemyPosition {
                id: id.clone(),
                position: player.rendered_position.ground(),
            })
            .collect()
    }

    /// Ground positions of live remote players, fed into the collision
    /// engine each tick to grow their trails.
    pub fn live_target_positions(&self) -> Vec<(String, Vec2)> {
        self.players
            .iter()
            .filter(|(_, player)| player.alive)
            .map(|(id, player)| (id.clone(), player.target_position.ground()))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&RemotePlayer> {
        self.players.get(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}

impl Default for RemoteManager {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
