use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const ARENA_SIZE: f32 = 500.0;
pub const PLAYER_SPEED: f32 = 10.0;
pub const TURN_RATE: f32 = 2.5;
pub const SPAWN_HEIGHT: f32 = 1.0;
pub const TRAIL_POINT_SPACING: f32 = 0.5;
pub const MAX_STEP_DISTANCE: f32 = 5.0;
pub const PLAYER_COLLISION_RADIUS: f32 = 1.5;
pub const BROADCAST_INTERVAL: f32 = 0.1;
pub const ENEMY_REFRESH_INTERVAL: f32 = 0.2;
pub const LOD_DISTANCE: f32 = 100.0;
pub const LOD_UPDATE_INTERVAL: f32 = 0.1;
pub const SMOOTHING_RATE: f32 = 10.0;
pub const MAX_NAME_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Ground-plane projection used for trails and the minimap.
    pub fn ground(&self) -> Vec2 {
        Vec2 {
            x: self.x,
            z: self.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Unit heading on the ground plane for a yaw angle; yaw 0 faces +z.
    pub fn from_yaw(yaw: f32) -> Self {
        Self {
            x: yaw.sin(),
            z: yaw.cos(),
        }
    }

    pub fn distance_squared(&self, other: &Vec2) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx * dx + dz * dz
    }

    pub fn distance(&self, other: &Vec2) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// Wire shape of one position update: position plus yaw, matching the
/// outbound `{x, y, z, rotation}` schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
}

impl Transform {
    pub fn new(position: Vec3, rotation: f32) -> Self {
        Self {
            x: position.x,
            y: position.y,
            z: position.z,
            rotation,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// One entry of a full `game_state` reconciliation snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub transform: Transform,
    pub eliminated: bool,
}

/// Messages the client sends to the relay.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ClientMessage {
    Join { name: String },
    Move { transform: Transform },
    Eliminated,
    Leave,
}

/// Messages the relay sends to the client. `Welcome` assigns the player id
/// during the connect handshake; `GameState` arrives once after connect to
/// reconcile players who joined earlier.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum ServerMessage {
    Welcome {
        player_id: String,
    },
    PlayerJoined {
        player_id: String,
    },
    PlayerLeft {
        player_id: String,
    },
    PlayerMoved {
        player_id: String,
        transform: Transform,
    },
    GameState {
        players: HashMap<String, PlayerSnapshot>,
    },
    PlayerEliminated {
        player_id: String,
    },
}

/// Display names come from the menu layer: non-empty, at most
/// `MAX_NAME_LEN` characters after trimming.
pub fn valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= MAX_NAME_LEN
}
