//! Per-tick local simulation: advances the player, grows trails and owns the
//! outbound/UI throttle clocks

use crate::network::{ConnectError, NetworkClient};
use crate::remote::{EnemyPosition, RemoteManager};
use crate::trail::{clamp_step, Arena, CollisionEngine};
use log::info;
use shared::{
    ServerMessage, Vec2, Vec3, BROADCAST_INTERVAL, ENEMY_REFRESH_INTERVAL, PLAYER_SPEED, TURN_RATE,
};

/// Turn input for one tick, as delivered by the host input layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Steering {
    pub left: bool,
    pub right: bool,
}

/// The locally simulated vehicle. Death is terminal for the session; the
/// final position and trail keep being published so the renderer can still
/// draw them.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub id: String,
    pub position: Vec3,
    pub rotation: f32,
    pub alive: bool,
    pub speed: f32,
}

/// Ties the collision engine, the remote registry and the network client
/// together, advanced once per frame by the host loop.
pub struct Simulation {
    player: LocalPlayer,
    engine: CollisionEngine,
    remotes: RemoteManager,
    network: NetworkClient,
    broadcast_clock: f32,
    enemy_clock: f32,
    enemy_snapshot: Vec<EnemyPosition>,
}

impl Simulation {
    pub fn new(network: NetworkClient, arena: Arena, spawn: Vec3, rotation: f32) -> Self {
        let id = network.player_id().unwrap_or_default();

        let mut remotes = RemoteManager::new();
        remotes.set_local_player_id(&id);

        let mut engine = CollisionEngine::new(arena);
        engine.record_point(&id, spawn.ground());

        Self {
            player: LocalPlayer {
                id,
                position: spawn,
                rotation,
                alive: true,
                speed: PLAYER_SPEED,
            },
            engine,
            remotes,
            network,
            broadcast_clock: 0.0,
            enemy_clock: 0.0,
            enemy_snapshot: Vec::new(),
        }
    }

    /// One frame of simulation. Applies all network events received since
    /// the last frame before interpolating, then advances the local player,
    /// runs the hazard test and services the two throttle clocks.
    pub fn tick(&mut self, delta: f32, steering: Steering) {
        for message in self.network.poll_messages() {
            self.apply_message(&message);
        }

        if self.player.alive {
            self.advance(delta, steering);
        }

        for (id, position) in self.remotes.live_target_positions() {
            self.engine.record_point(&id, position);
        }

        self.remotes
            .set_local_player_position(self.player.position.ground());
        self.remotes.update(delta);

        self.broadcast_clock += delta;
        if self.player.alive && self.broadcast_clock >= BROADCAST_INTERVAL {
            self.broadcast_clock = 0.0;
            self.network
                .update_position(self.player.position, self.player.rotation);
        }

        self.enemy_clock += delta;
        if self.enemy_clock >= ENEMY_REFRESH_INTERVAL {
            self.enemy_clock = 0.0;
            self.enemy_snapshot = self.remotes.enemy_positions();
        }
    }

    fn advance(&mut self, delta: f32, steering: Steering) {
        if steering.left {
            self.player.rotation += TURN_RATE * delta;
        }
        if steering.right {
            self.player.rotation -= TURN_RATE * delta;
        }

        let step = clamp_step(delta, self.player.speed);
        let heading = Vec2::from_yaw(self.player.rotation);
        let next = Vec3::new(
            self.player.position.x + heading.x * self.player.speed * step,
            self.player.position.y,
            self.player.position.z + heading.z * self.player.speed * step,
        );

        if self.engine.check_collision(&self.player.id, next.ground()) {
            self.player.alive = false;
            self.engine.mark_eliminated(&self.player.id);
            self.network.notify_eliminated();
            info!(
                "Local player died at ({:.1}, {:.1})",
                next.x, next.z
            );
            return;
        }

        self.player.position = next;
        self.engine.record_point(&self.player.id, next.ground());
    }

    /// Routes one relay message into the registry and mirrors the registry
    /// changes into the collision engine.
    pub fn apply_message(&mut self, message: &ServerMessage) {
        self.remotes.apply_message(message);

        match message {
            ServerMessage::PlayerLeft { player_id } => {
                self.engine.remove_player(player_id);
            }
            ServerMessage::PlayerEliminated { player_id } => {
                self.engine.mark_eliminated(player_id);
            }
            _ => {}
        }
    }

    pub fn position(&self) -> Vec3 {
        self.player.position
    }

    pub fn rotation(&self) -> f32 {
        self.player.rotation
    }

    pub fn is_alive(&self) -> bool {
        self.player.alive
    }

    pub fn player_id(&self) -> &str {
        &self.player.id
    }

    /// The local trail, for the renderer and camera collaborators.
    pub fn trail(&self) -> &[Vec2] {
        self.engine.trail_points(&self.player.id)
    }

    pub fn arena(&self) -> Arena {
        self.engine.arena()
    }

    /// The most recent reduced-fidelity enemy list. Refreshed on its own
    /// clock, not every frame, to bound UI-update load.
    pub fn enemies(&self) -> &[EnemyPosition] {
        &self.enemy_snapshot
    }

    pub fn remotes(&self) -> &RemoteManager {
        &self.remotes
    }

    pub fn network(&self) -> &NetworkClient {
        &self.network
    }

    /// Re-runs the relay handshake after a lost connection. The relay may
    /// assign a fresh id, so local state is re-keyed and all remote
    /// knowledge is dropped; the reconciliation snapshot rebuilds it.
    pub async fn reconnect(&mut self, name: &str) -> Result<(), ConnectError> {
        self.network.reconnect(name).await?;

        if let Some(new_id) = self.network.player_id() {
            if new_id != self.player.id {
                self.engine.remove_player(&self.player.id);
                self.engine.record_point(&new_id, self.player.position.ground());
                if !self.player.alive {
                    self.engine.mark_eliminated(&new_id);
                }
                self.remotes.set_local_player_id(&new_id);
                self.player.id = new_id;
            }
        }

        self.engine.retain_player(&self.player.id);
        self.remotes.clear();
        self.enemy_snapshot.clear();
        Ok(())
    }

    /// Ends the session: leaves the relay and empties the registry. The
    /// local player and trail stay intact for a final render.
    pub fn shutdown(&mut self) {
        self.network.disconnect();
        self.remotes.clear();
    }
}
