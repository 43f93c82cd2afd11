//! Airship map: labeled spawn zones on each layer and the hatches that
//! connect them.

use crate::rng::MatchRng;
use crate::state::{Hatch, Layer, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnZone {
    pub label: &'static str,
    pub x: f32,
    pub y: f32,
    pub layer: Layer,
}

const fn zone(label: &'static str, x: f32, y: f32, layer: Layer) -> SpawnZone {
    SpawnZone { label, x, y, layer }
}

pub const SPAWN_ZONES: [SpawnZone; 26] = [
    // Hub (central mast)
    zone("hub-center", 1600.0, 1200.0, Layer::Deck),
    zone("hub-fore", 1600.0, 1050.0, Layer::Deck),
    zone("hub-aft", 1600.0, 1350.0, Layer::Deck),
    zone("hub-port", 1450.0, 1200.0, Layer::Deck),
    zone("hub-starboard", 1750.0, 1200.0, Layer::Deck),
    // Bridge (bow)
    zone("bridge-helm", 1600.0, 380.0, Layer::Deck),
    zone("bridge-port", 1480.0, 420.0, Layer::Deck),
    zone("bridge-starboard", 1720.0, 420.0, Layer::Deck),
    // Port cabin
    zone("port-cabin-center", 1200.0, 1200.0, Layer::Deck),
    zone("port-cabin-fore", 1200.0, 1100.0, Layer::Deck),
    zone("port-cabin-aft", 1200.0, 1300.0, Layer::Deck),
    // Starboard cabin
    zone("starboard-cabin-center", 2000.0, 1200.0, Layer::Deck),
    zone("starboard-cabin-fore", 2000.0, 1100.0, Layer::Deck),
    zone("starboard-cabin-aft", 2000.0, 1300.0, Layer::Deck),
    // Engine room (stern)
    zone("engine-center", 1600.0, 2030.0, Layer::Deck),
    zone("engine-port", 1480.0, 2030.0, Layer::Deck),
    zone("engine-starboard", 1720.0, 2030.0, Layer::Deck),
    // Main deck corridors
    zone("fore-deck", 1600.0, 680.0, Layer::Deck),
    zone("aft-deck", 1600.0, 1680.0, Layer::Deck),
    zone("port-corridor", 1320.0, 1200.0, Layer::Deck),
    zone("starboard-corridor", 1880.0, 1200.0, Layer::Deck),
    // Cargo hold
    zone("cargo-fore-center", 1600.0, 875.0, Layer::Cargo),
    zone("cargo-fore-back", 1600.0, 770.0, Layer::Cargo),
    zone("cargo-corridor", 1600.0, 1200.0, Layer::Cargo),
    zone("cargo-aft-center", 1600.0, 1525.0, Layer::Cargo),
    zone("cargo-aft-back", 1600.0, 1620.0, Layer::Cargo),
];

/// Zones on one layer, in table order.
pub fn zones_on(layer: Layer) -> Vec<&'static SpawnZone> {
    SPAWN_ZONES.iter().filter(|z| z.layer == layer).collect()
}

/// Uniformly pick a zone on `layer`. Consumes one draw.
pub fn pick_zone(rng: &mut MatchRng, layer: Layer) -> &'static SpawnZone {
    let zones = zones_on(layer);
    zones[rng.pick_index(zones.len())]
}

/// The fixed hatch portals between deck and cargo.
pub fn hatch_definitions() -> Vec<Hatch> {
    vec![
        Hatch {
            id: "hatch-fore".into(),
            layer_a: Layer::Deck,
            pos_a: Point::new(1600.0, 680.0),
            layer_b: Layer::Cargo,
            pos_b: Point::new(1600.0, 820.0),
        },
        Hatch {
            id: "hatch-aft".into(),
            layer_a: Layer::Deck,
            pos_a: Point::new(1600.0, 1720.0),
            layer_b: Layer::Cargo,
            pos_b: Point::new(1600.0, 1600.0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::world;

    #[test]
    fn test_zone_counts() {
        assert_eq!(zones_on(Layer::Deck).len(), 21);
        assert_eq!(zones_on(Layer::Cargo).len(), 5);
    }

    #[test]
    fn test_zones_inside_world() {
        for z in SPAWN_ZONES.iter() {
            assert!(z.x > 0.0 && z.x < world::WIDTH, "{} out of bounds", z.label);
            assert!(z.y > 0.0 && z.y < world::HEIGHT, "{} out of bounds", z.label);
        }
    }

    #[test]
    fn test_pick_zone_respects_layer() {
        let mut rng = MatchRng::new(5);
        for _ in 0..100 {
            assert_eq!(pick_zone(&mut rng, Layer::Cargo).layer, Layer::Cargo);
        }
    }

    #[test]
    fn test_hatches_connect_both_layers() {
        for h in hatch_definitions() {
            assert_ne!(h.layer_a, h.layer_b);
        }
    }
}
