//! Stand-in game state for the demo host.

use anyhow::bail;
use dev_console::discovery::{CommandAttr, ConsoleModule, StaticModule, TypeDescriptor, VariableAttr};
use dev_console::{Accessor, CommandEntry, Vec3};
use std::sync::{Arc, Mutex};
use std::time::Instant;

const MAX_HEALTH: f32 = 100.0;

pub struct Player {
    position: Vec3,
    health: f32,
    god_mode: bool,
    inventory: Vec<(String, i32)>,
}

/// Owns everything the console commands are bound to. Dropping it makes the
/// bound commands fail instead of dangling.
pub struct World {
    player: Arc<Mutex<Player>>,
    time_scale: Arc<Mutex<f32>>,
    started: Instant,
}

impl World {
    pub fn new() -> Self {
        Self {
            player: Arc::new(Mutex::new(Player {
                position: Vec3::default(),
                health: MAX_HEALTH,
                god_mode: false,
                inventory: Vec::new(),
            })),
            time_scale: Arc::new(Mutex::new(1.0)),
            started: Instant::now(),
        }
    }

    /// One module per game type, bound to this world's state.
    pub fn modules(&self) -> Vec<Box<dyn ConsoleModule>> {
        let player = TypeDescriptor::new("Player")
            .command(
                CommandAttr::new("teleport", "Teleport player to position").category("Player"),
                CommandEntry::method("teleport", &self.player, |p: &mut Player, x: f32, y: f32, z: f32| {
                    p.position = Vec3::new(x, y, z);
                    format!("Teleported to {}", p.position)
                }),
            )
            .command(
                CommandAttr::new("heal", "Heal player by amount").category("Player"),
                CommandEntry::method("heal", &self.player, |p: &mut Player, amount: f32| -> anyhow::Result<String> {
                    if amount < 0.0 {
                        bail!("amount must not be negative");
                    }
                    p.health = (p.health + amount).min(MAX_HEALTH);
                    Ok(format!("Health: {}", p.health))
                }),
            )
            .command(
                CommandAttr::new("giveItem", "Add an item to the inventory").category("Player"),
                CommandEntry::method("giveItem", &self.player, |p: &mut Player, item: String, qty: i32| {
                    let message = format!("Gave {}x {}", qty, item);
                    p.inventory.push((item, qty));
                    message
                }),
            )
            .command(
                CommandAttr::new("inventory", "List inventory").category("Player"),
                CommandEntry::method("inventory", &self.player, |p: &mut Player| {
                    if p.inventory.is_empty() {
                        return "Inventory is empty".to_string();
                    }
                    p.inventory
                        .iter()
                        .map(|(item, qty)| format!("{}x {}", qty, item))
                        .collect::<Vec<_>>()
                        .join(", ")
                }),
            )
            .variable(
                VariableAttr::new("godMode", "Player invincibility").category("Player"),
                Accessor::instance_field(&self.player, |p| p.god_mode, |p, on| p.god_mode = on),
            )
            .variable(
                VariableAttr::new("health", "Current health").category("Player"),
                Accessor::instance_property(&self.player, |p| p.health, None),
            )
            .variable(
                VariableAttr::new("position", "Player position").category("Player"),
                Accessor::instance_field(&self.player, |p| p.position, |p, v| p.position = v),
            );

        let started = self.started;
        let world = TypeDescriptor::new("World")
            .command(
                CommandAttr::new("spawnEnemy", "Spawn an enemy at a position").category("Debug"),
                CommandEntry::function("spawnEnemy", |kind: String, x: f32, y: f32, z: f32| {
                    format!("Spawned {} at {}", kind, Vec3::new(x, y, z))
                }),
            )
            .variable(
                VariableAttr::new("timeScale", "Game speed multiplier").category("System"),
                Accessor::field(&self.time_scale),
            )
            .variable(
                VariableAttr::new("uptime", "Seconds since start").category("System"),
                Accessor::property(move || started.elapsed().as_secs_f64()),
            );

        vec![
            Box::new(StaticModule::new("demo::player").with_type(player)),
            Box::new(StaticModule::new("demo::world").with_type(world)),
        ]
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
