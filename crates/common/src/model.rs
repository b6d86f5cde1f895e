use serde::{Deserialize, Serialize};

/// World units covered by one grid cell along x and z.
pub const TILE_SIZE: f32 = 16.0;

/// Tallest model in the catalog. The camera intersects the bottom screen
/// corners with this plane so tall tiles at the near edge stay loaded.
pub const MODEL_MAX_HEIGHT: f32 = 32.0;

/// A tile model from the fixed catalog.
///
/// The discriminant is the persisted identifier. `Dirt` (id 0) is the
/// default model of every cell that has no stored record.
#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Model {
    #[default]
    Dirt = 0,
    Grass,
    Lava,
    Lighthouse,
    Rock1,
    Rock2,
    Rock3,
    Rock4,
    Rock5,
    Sand,
    Tree1,
    Tree2,
    Tree3,
    Water,
}

/// Static catalog data for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInfo {
    pub name: &'static str,
    /// Height of the mesh top in world units; point lights sit at this height.
    pub height: f32,
    /// Light intensity. Zero means the model does not emit light.
    pub illuminance: f32,
    /// Flat display colour (linear RGBA).
    pub color: [f32; 4],
}

#[rustfmt::skip]
const CATALOG: [ModelInfo; Model::COUNT] = [
    ModelInfo { name: "DIRT", height: 0.0, illuminance: 0.0, color: [0.42, 0.30, 0.20, 1.0] },
    ModelInfo { name: "GRASS", height: 0.0, illuminance: 0.0, color: [0.30, 0.55, 0.22, 1.0] },
    ModelInfo { name: "LAVA", height: 2.0, illuminance: 50.0, color: [0.95, 0.35, 0.08, 1.0] },
    ModelInfo { name: "LIGHTHOUSE", height: 32.0, illuminance: 100.0, color: [0.92, 0.90, 0.85, 1.0] },
    ModelInfo { name: "ROCK1", height: 6.0, illuminance: 0.0, color: [0.50, 0.50, 0.52, 1.0] },
    ModelInfo { name: "ROCK2", height: 8.0, illuminance: 0.0, color: [0.46, 0.46, 0.48, 1.0] },
    ModelInfo { name: "ROCK3", height: 10.0, illuminance: 0.0, color: [0.42, 0.42, 0.45, 1.0] },
    ModelInfo { name: "ROCK4", height: 12.0, illuminance: 0.0, color: [0.38, 0.38, 0.41, 1.0] },
    ModelInfo { name: "ROCK5", height: 14.0, illuminance: 0.0, color: [0.34, 0.34, 0.37, 1.0] },
    ModelInfo { name: "SAND", height: 0.0, illuminance: 0.0, color: [0.86, 0.78, 0.55, 1.0] },
    ModelInfo { name: "TREE1", height: 20.0, illuminance: 0.0, color: [0.16, 0.42, 0.18, 1.0] },
    ModelInfo { name: "TREE2", height: 24.0, illuminance: 0.0, color: [0.13, 0.38, 0.16, 1.0] },
    ModelInfo { name: "TREE3", height: 28.0, illuminance: 0.0, color: [0.10, 0.34, 0.14, 1.0] },
    ModelInfo { name: "WATER", height: 0.0, illuminance: 0.0, color: [0.18, 0.40, 0.70, 1.0] },
];

impl Model {
    /// Number of models in the catalog.
    pub const COUNT: usize = 14;

    /// Every model in id order.
    pub const ALL: [Model; Model::COUNT] = [
        Model::Dirt,
        Model::Grass,
        Model::Lava,
        Model::Lighthouse,
        Model::Rock1,
        Model::Rock2,
        Model::Rock3,
        Model::Rock4,
        Model::Rock5,
        Model::Sand,
        Model::Tree1,
        Model::Tree2,
        Model::Tree3,
        Model::Water,
    ];

    /// Persisted identifier.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Dense index, usable for per-model arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a model by its persisted identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn info(self) -> &'static ModelInfo {
        &CATALOG[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn height(self) -> f32 {
        self.info().height
    }

    pub fn illuminance(self) -> f32 {
        self.info().illuminance
    }

    /// Whether tiles of this model contribute a point light.
    pub fn emits_light(self) -> bool {
        self.illuminance() > 0.0
    }

    /// Step through the catalog by `delta`, wrapping at both ends.
    pub fn cycle(self, delta: i32) -> Self {
        let count = Self::COUNT as i32;
        let next = (self.index() as i32 + delta).rem_euclid(count);
        Self::ALL[next as usize]
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
