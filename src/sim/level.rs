//! Level data
//!
//! A level is a tilemap plus a list of placements. The tilemap only
//! contributes static floor geometry: each horizontal run of floor tiles
//! becomes one immovable rectangle. Placements are consumed one record at a
//! time through [`LevelSource`], so other formats can drive the loader.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::TILE_SIZE;
use crate::error::LevelError;
use crate::sim::body::Rect;

/// Tile codes
pub const TILE_EMPTY: u8 = 0;
pub const TILE_FLOOR: u8 = 1;

/// One record of a level stream
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Record(Placement),
    Finished,
}

/// Anything that yields placements one at a time
pub trait LevelSource {
    fn next_record(&mut self) -> Result<Parsed, LevelError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// Something placed in the level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum Placement {
    /// A rectangular region (`checkpoint`, `exit`)
    Area {
        #[serde(rename = "type")]
        kind: String,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    /// A point entity (`lil_tank`, `turret`, `player`, `text`) anchored at its
    /// bottom-left corner
    Entity {
        #[serde(rename = "type")]
        kind: String,
        x: i32,
        y: i32,
        #[serde(default)]
        width: i32,
        #[serde(default)]
        height: i32,
        #[serde(default)]
        properties: Vec<Property>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tilemap {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Row-major tile codes
    pub tiles: Vec<u8>,
}

impl Tilemap {
    /// A map with no floors
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![TILE_EMPTY; tile_count(width, height).unwrap_or(0)],
        }
    }

    /// Fill tiles `x0..x1` of row `y` with floor
    pub fn with_floor_run(mut self, y: u32, x0: u32, x1: u32) -> Self {
        for x in x0..x1.min(self.width) {
            let index = self.index(x, y);
            if let Some(tile) = self.tiles.get_mut(index) {
                *tile = TILE_FLOOR;
            }
        }
        self
    }

    /// World size in pixels
    pub fn world_size(&self) -> Vec2 {
        let tile = TILE_SIZE as f32;
        Vec2::new(self.width as f32 * tile, self.height as f32 * tile)
    }

    /// Merge horizontal runs of floor tiles into rectangles
    pub fn floor_rects(&self) -> Result<Vec<Rect>, LevelError> {
        let expected = tile_count(self.width, self.height).ok_or(LevelError::TilemapTooLarge {
            width: self.width,
            height: self.height,
        })?;
        if self.tiles.len() != expected {
            return Err(LevelError::TilemapSize {
                width: self.width,
                height: self.height,
                expected,
                found: self.tiles.len(),
            });
        }

        let tile = TILE_SIZE as f32;
        let mut rects = Vec::new();
        for y in 0..self.height {
            let mut run_start: Option<u32> = None;
            for x in 0..=self.width {
                let code = if x < self.width {
                    self.tiles[self.index(x, y)]
                } else {
                    TILE_EMPTY
                };
                match code {
                    TILE_FLOOR => {
                        run_start.get_or_insert(x);
                    }
                    TILE_EMPTY => {
                        if let Some(start) = run_start.take() {
                            rects.push(Rect::new(
                                start as f32 * tile,
                                y as f32 * tile,
                                (x - start) as f32 * tile,
                                tile,
                            ));
                        }
                    }
                    value => return Err(LevelError::UnknownTile { value, x, y }),
                }
            }
        }
        Ok(rects)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

fn tile_count(width: u32, height: u32) -> Option<usize> {
    (width as usize).checked_mul(height as usize)
}

/// A complete level as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub tilemap: Tilemap,
    #[serde(default)]
    pub placements: Vec<Placement>,
}

impl LevelData {
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Stream the placements in file order
    pub fn records(&self) -> PlacementStream<'_> {
        PlacementStream {
            placements: self.placements.iter(),
        }
    }
}

/// [`LevelSource`] over an in-memory placement list
#[derive(Debug, Clone)]
pub struct PlacementStream<'a> {
    placements: std::slice::Iter<'a, Placement>,
}

impl LevelSource for PlacementStream<'_> {
    fn next_record(&mut self) -> Result<Parsed, LevelError> {
        Ok(match self.placements.next() {
            Some(placement) => Parsed::Record(placement.clone()),
            None => Parsed::Finished,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_runs_are_merged() {
        let map = Tilemap::empty(6, 3).with_floor_run(2, 0, 6).with_floor_run(0, 1, 3);
        let rects = map.floor_rects().unwrap();
        assert_eq!(
            rects,
            vec![Rect::new(8.0, 0.0, 16.0, 8.0), Rect::new(0.0, 16.0, 48.0, 8.0)]
        );
        assert_eq!(map.world_size(), Vec2::new(48.0, 24.0));
    }

    #[test]
    fn test_tilemap_errors() {
        let mut map = Tilemap::empty(2, 2);
        map.tiles[3] = 7;
        assert!(matches!(
            map.floor_rects(),
            Err(LevelError::UnknownTile { value: 7, x: 1, y: 1 })
        ));

        map.tiles.pop();
        assert!(matches!(map.floor_rects(), Err(LevelError::TilemapSize { found: 3, .. })));
    }

    #[test]
    fn test_huge_tilemap_is_rejected() {
        let json = r#"{ "tilemap": { "width": 4294967295, "height": 4294967295, "tiles": [1] } }"#;
        let level = LevelData::from_json(json).unwrap();
        assert!(matches!(
            level.tilemap.floor_rects(),
            Err(LevelError::TilemapSize { found: 1, .. } | LevelError::TilemapTooLarge { .. })
        ));
        assert!(level.tilemap.world_size().is_finite());

        let store = crate::persistence::MemoryStore::new();
        let loaded = crate::sim::World::from_level(&level, store, crate::Settings::default());
        assert!(loaded.is_err());
    }

    #[test]
    fn test_json_placements_stream_in_order() {
        let json = r#"{
            "tilemap": { "width": 4, "height": 2, "tiles": [0,0,0,0, 1,1,1,1] },
            "placements": [
                { "placement": "entity", "type": "player", "x": 0, "y": 8 },
                { "placement": "area", "type": "exit", "x": 24, "y": 0, "width": 8, "height": 8 },
                { "placement": "entity", "type": "text", "x": 8, "y": 8, "width": 8, "height": 8,
                  "properties": [ { "key": "string", "value": "HELLO" } ] }
            ]
        }"#;
        let level = LevelData::from_json(json).unwrap();
        let mut records = level.records();

        let Parsed::Record(Placement::Entity { kind, .. }) = records.next_record().unwrap() else {
            panic!("expected the player first");
        };
        assert_eq!(kind, "player");
        assert!(matches!(
            records.next_record().unwrap(),
            Parsed::Record(Placement::Area { width: 8, .. })
        ));
        let next = records.next_record().unwrap();
        let Parsed::Record(Placement::Entity { properties, .. }) = next else {
            panic!("expected the text trigger");
        };
        assert_eq!(properties[0].value, "HELLO");
        assert_eq!(records.next_record().unwrap(), Parsed::Finished);
        assert_eq!(records.next_record().unwrap(), Parsed::Finished);
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        assert!(matches!(LevelData::from_json("{ \"tilemap\": 3 }"), Err(LevelError::Parse(_))));
    }
}
