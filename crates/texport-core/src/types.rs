//! Material and shader description types
//!
//! These mirror the JSON documents produced by the level compiler: a shader
//! table keyed by shader name and a material list that references it. Fields
//! this tool does not interpret are carried through untouched in `extra`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result, ResultExt};

/// Stage `map` value marking an animated texture sequence
pub const ANIM_MAP: &str = "anim";

/// Stage `map` value reserved for the level lightmap
pub const LIGHTMAP_MAP: &str = "$lightmap";

/// What a stage's `map` field refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMap<'a> {
    /// Frames listed in `animMaps`
    Anim,
    /// The lightmap slot, filled by the caller
    Lightmap,
    /// A single texture name
    Texture(&'a str),
    /// No texture (never set, or a previous export failed)
    Unset,
}

/// A single layer of a shader
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShaderStage {
    /// Texture reference, sentinel, or `null`
    #[serde(default)]
    pub map: Option<String>,

    /// Per-frame texture names when `map` is `"anim"`
    #[serde(rename = "animMaps", default, skip_serializing_if = "Vec::is_empty")]
    pub anim_maps: Vec<Option<String>>,

    /// Everything else (blend modes, tcMods, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShaderStage {
    /// Stage referencing a single texture
    pub fn texture(name: impl Into<String>) -> Self {
        Self {
            map: Some(name.into()),
            ..Self::default()
        }
    }

    /// Stage bound to the lightmap slot
    pub fn lightmap() -> Self {
        Self::texture(LIGHTMAP_MAP)
    }

    /// Animated stage cycling through `frames`
    pub fn anim<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            map: Some(ANIM_MAP.to_string()),
            anim_maps: frames.into_iter().map(|f| Some(f.into())).collect(),
            extra: Map::new(),
        }
    }

    /// Classify the `map` field
    pub fn map_kind(&self) -> StageMap<'_> {
        match self.map.as_deref() {
            Some(ANIM_MAP) => StageMap::Anim,
            Some(LIGHTMAP_MAP) => StageMap::Lightmap,
            Some(name) => StageMap::Texture(name),
            None => StageMap::Unset,
        }
    }
}

/// A shader: an ordered list of stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shader {
    /// Stages in draw order
    #[serde(default)]
    pub stages: Vec<ShaderStage>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shader {
    /// Create a shader from its stages
    pub fn new(stages: Vec<ShaderStage>) -> Self {
        Self {
            stages,
            extra: Map::new(),
        }
    }
}

/// Shader table keyed by shader name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShaderTable {
    shaders: BTreeMap<String, Shader>,
}

impl ShaderTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a shader
    pub fn insert(&mut self, name: impl Into<String>, shader: Shader) -> Option<Shader> {
        self.shaders.insert(name.into(), shader)
    }

    /// Look up a shader by name
    pub fn get(&self, name: &str) -> Option<&Shader> {
        self.shaders.get(name)
    }

    /// Look up a shader by name for mutation
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Shader> {
        self.shaders.get_mut(name)
    }

    /// Check whether a shader exists
    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    /// Number of shaders
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Iterate shaders in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Shader)> {
        self.shaders.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parse a shader table from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a shader table from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_document(path)?;
        Self::from_json_str(&text).with_context(|| format!("parsing shaders {}", path.display()))
    }
}

/// A surface material
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Shader key, or a texture filename once a shaderless material is exported
    #[serde(rename = "shaderName", default)]
    pub shader_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Material {
    /// Create a material referencing `shader_name`
    pub fn new(shader_name: impl Into<String>) -> Self {
        Self {
            shader_name: Some(shader_name.into()),
            extra: Map::new(),
        }
    }
}

/// Material document: the material list plus any sibling data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialData {
    /// Materials in file order
    #[serde(default)]
    pub materials: Vec<Material>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MaterialData {
    /// Create a document from a material list
    pub fn new(materials: Vec<Material>) -> Self {
        Self {
            materials,
            extra: Map::new(),
        }
    }

    /// Parse a material document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a material document from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_document(path)?;
        Self::from_json_str(&text).with_context(|| format!("parsing materials {}", path.display()))
    }
}

fn read_document(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}
