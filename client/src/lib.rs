//! # Arena Client Library
//!
//! Client-side core for the trail arena: every player pilots a vehicle that
//! continuously lays a lethal trail behind it, and touching any trail, the
//! arena wall or another vehicle ends the run. This crate owns the local
//! simulation, the collision geometry and the multiplayer synchronization;
//! rendering, cameras and menus are external consumers of its outputs.
//!
//! ## Architecture Overview
//!
//! A single game thread advances the simulation once per frame. Network I/O
//! happens on background tasks that only ever communicate with the game
//! thread over channels, so the remote-player registry and the trail
//! geometry are mutated from exactly one place. Each frame the loop drains
//! all messages received since the previous frame, applies them to the
//! registry, and only then interpolates, so rendered remote state is never
//! older than the frame boundary.
//!
//! ### Trail Hazards (`trail`)
//! Per-player trail geometry and the fatal-contact query: arena bounds,
//! segment-segment tests against every tracked trail (the mover's own
//! still-forming tip excluded) and proximity to other vehicles. Per-tick
//! travel is clamped so straight-line testing between successive positions
//! cannot tunnel through a wall.
//!
//! ### Local Simulation (`simulation`)
//! Advances the local vehicle along its heading, grows its trail and runs
//! the hazard test every tick. Death is terminal; the final position and
//! trail keep being published so the renderer can draw the wreck. Owns the
//! two throttle clocks: outbound position broadcasts (100 ms) and the
//! reduced enemy list for the minimap (200 ms), both decoupled from the
//! frame rate and from each other.
//!
//! ### Network Client (`network`)
//! Connection lifecycle against the relay: the `Join`/`Welcome` handshake,
//! a receive loop that decodes datagrams into typed messages, a send queue
//! that never blocks the simulation, and caller-driven reconnection that
//! `disconnect` can cancel at any point.
//!
//! ### Remote Players (`remote`)
//! The registry of everyone else in the arena. Applies join/leave/move
//! events and full reconciliation snapshots, interpolates rendered
//! transforms toward network targets with exponential smoothing, and
//! degrades update cadence for players far from the local vehicle.
//!
//! ## Graceful Degradation
//!
//! Losing the relay connection does not end the run: the local simulation
//! keeps stepping against whatever trails it already knows, and the caller
//! may retry the handshake whenever it chooses.

pub mod network;
pub mod remote;
pub mod simulation;
pub mod trail;
