//! The outgoing RPC surface: a textual `remote.call(...)` sink plus the
//! inventory-slot and direction enums it addresses.
//!
//! [`CommandSink`] is an opaque external collaborator in scope terms —
//! the actual transport (network socket, subprocess pipe) is outside
//! this crate. What belongs here is the call shape and the slot/
//! direction vocabulary every caller needs to agree on.

use crate::geometry::Pos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn rpc_name(self) -> &'static str {
        match self {
            Direction::North => "defines.direction.north",
            Direction::East => "defines.direction.east",
            Direction::South => "defines.direction.south",
            Direction::West => "defines.direction.west",
        }
    }
}

macro_rules! inventory_slots {
    ($($variant:ident => $name:literal, puts: $puts:literal, takes: $takes:literal;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum InventorySlot {
            $($variant),+
        }

        impl InventorySlot {
            pub const ALL: &'static [InventorySlot] = &[$(InventorySlot::$variant),+];

            pub fn rpc_name(self) -> &'static str {
                match self {
                    $(InventorySlot::$variant => concat!("defines.inventory.", $name)),+
                }
            }

            /// Parses the bare slot name telemetry's `item_containers`
            /// packet reports (e.g. `"chest"`), the inverse of the
            /// suffix half of [`InventorySlot::rpc_name`].
            pub fn from_name(name: &str) -> Option<InventorySlot> {
                match name {
                    $($name => Some(InventorySlot::$variant),)+
                    _ => None,
                }
            }

            pub fn accepts_puts(self) -> bool {
                match self {
                    $(InventorySlot::$variant => $puts),+
                }
            }

            pub fn accepts_takes(self) -> bool {
                match self {
                    $(InventorySlot::$variant => $takes),+
                }
            }
        }
    };
}

// Puts/takes capability per the reference slot table: most player and
// storage slots accept both; furnace/drill result slots are take-only,
// their source/fuel slots put-only.
inventory_slots! {
    Fuel => "fuel", puts: true, takes: true;
    BurntResult => "burnt_result", puts: false, takes: true;
    Chest => "chest", puts: true, takes: true;
    FurnaceSource => "furnace_source", puts: true, takes: false;
    FurnaceResult => "furnace_result", puts: false, takes: true;
    FurnaceModules => "furnace_modules", puts: true, takes: true;
    PlayerQuickbar => "player_quickbar", puts: true, takes: true;
    PlayerMain => "player_main", puts: true, takes: true;
    PlayerGuns => "player_guns", puts: true, takes: true;
    PlayerAmmo => "player_ammo", puts: true, takes: true;
    PlayerArmor => "player_armor", puts: true, takes: true;
    PlayerTools => "player_tools", puts: true, takes: true;
    PlayerVehicle => "player_vehicle", puts: true, takes: true;
    PlayerTrash => "player_trash", puts: false, takes: true;
    GodQuickbar => "god_quickbar", puts: true, takes: true;
    GodMain => "god_main", puts: true, takes: true;
    RoboportRobot => "roboport_robot", puts: true, takes: true;
    RoboportMaterial => "roboport_material", puts: true, takes: true;
    RobotCargo => "robot_cargo", puts: true, takes: true;
    RobotRepair => "robot_repair", puts: true, takes: true;
    AssemblingMachineInput => "assembling_machine_input", puts: true, takes: false;
    AssemblingMachineOutput => "assembling_machine_output", puts: false, takes: true;
    AssemblingMachineModules => "assembling_machine_modules", puts: true, takes: true;
    LabInput => "lab_input", puts: true, takes: false;
    LabModules => "lab_modules", puts: true, takes: true;
    MiningDrillModules => "mining_drill_modules", puts: true, takes: true;
    ItemMain => "item_main", puts: true, takes: true;
    RocketSiloRocket => "rocket_silo_rocket", puts: true, takes: false;
    RocketSiloResult => "rocket_silo_result", puts: false, takes: true;
    CarTrunk => "car_trunk", puts: true, takes: true;
    CarAmmo => "car_ammo", puts: true, takes: true;
    CargoWagon => "cargo_wagon", puts: true, takes: true;
    TurretAmmo => "turret_ammo", puts: true, takes: true;
    BeaconModules => "beacon_modules", puts: true, takes: true;
}

/// Accepts `(function_name, args)` invocations, fire-and-forget.
pub trait CommandSink {
    fn set_waypoints(&mut self, action_id: u64, player_id: u64, path: &[Pos]);
    fn set_mining_target(&mut self, action_id: u64, player_id: u64, entity: &str, pos: Pos);
    fn stop_mining(&mut self, player_id: u64);
    fn start_crafting(&mut self, action_id: u64, player_id: u64, recipe: &str, count: u32);
    fn place_entity(&mut self, player_id: u64, item: &str, pos: Pos, dir: Direction);
    fn insert_to_inventory(&mut self, player_id: u64, entity_pos: Pos, slot: InventorySlot, item: &str, count: u64);
    fn remove_from_inventory(&mut self, player_id: u64, entity_pos: Pos, slot: InventorySlot, item: &str, count: u64);
}

/// A single recorded invocation, used by [`InMemoryCommandSink`] and by
/// tests that assert on what the action layer emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SetWaypoints { action_id: u64, player_id: u64, path: Vec<Pos> },
    SetMiningTarget { action_id: u64, player_id: u64, entity: String, pos: Pos },
    StopMining { player_id: u64 },
    StartCrafting { action_id: u64, player_id: u64, recipe: String, count: u32 },
    PlaceEntity { player_id: u64, item: String, pos: Pos, dir: Direction },
    InsertToInventory { player_id: u64, entity_pos: Pos, slot: InventorySlot, item: String, count: u64 },
    RemoveFromInventory { player_id: u64, entity_pos: Pos, slot: InventorySlot, item: String, count: u64 },
}

/// A sink that just records calls, standing in for the real RPC client
/// in demos and tests (the real client is an explicit non-goal).
#[derive(Debug, Clone, Default)]
pub struct InMemoryCommandSink {
    pub calls: Vec<RecordedCall>,
}

impl InMemoryCommandSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandSink for InMemoryCommandSink {
    fn set_waypoints(&mut self, action_id: u64, player_id: u64, path: &[Pos]) {
        self.calls.push(RecordedCall::SetWaypoints { action_id, player_id, path: path.to_vec() });
    }

    fn set_mining_target(&mut self, action_id: u64, player_id: u64, entity: &str, pos: Pos) {
        self.calls.push(RecordedCall::SetMiningTarget { action_id, player_id, entity: entity.to_string(), pos });
    }

    fn stop_mining(&mut self, player_id: u64) {
        self.calls.push(RecordedCall::StopMining { player_id });
    }

    fn start_crafting(&mut self, action_id: u64, player_id: u64, recipe: &str, count: u32) {
        self.calls.push(RecordedCall::StartCrafting { action_id, player_id, recipe: recipe.to_string(), count });
    }

    fn place_entity(&mut self, player_id: u64, item: &str, pos: Pos, dir: Direction) {
        self.calls.push(RecordedCall::PlaceEntity { player_id, item: item.to_string(), pos, dir });
    }

    fn insert_to_inventory(&mut self, player_id: u64, entity_pos: Pos, slot: InventorySlot, item: &str, count: u64) {
        self.calls.push(RecordedCall::InsertToInventory { player_id, entity_pos, slot, item: item.to_string(), count });
    }

    fn remove_from_inventory(&mut self, player_id: u64, entity_pos: Pos, slot: InventorySlot, item: &str, count: u64) {
        self.calls.push(RecordedCall::RemoveFromInventory { player_id, entity_pos, slot, item: item.to_string(), count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_slot_table_has_34_kinds() {
        assert_eq!(InventorySlot::ALL.len(), 34);
    }

    #[test]
    fn furnace_result_is_take_only() {
        assert!(InventorySlot::FurnaceResult.accepts_takes());
        assert!(!InventorySlot::FurnaceResult.accepts_puts());
    }

    #[test]
    fn in_memory_sink_records_waypoints() {
        let mut sink = InMemoryCommandSink::new();
        sink.set_waypoints(1, 7, &[Pos::new(0, 0), Pos::new(1, 0)]);
        assert_eq!(sink.calls.len(), 1);
    }
}
