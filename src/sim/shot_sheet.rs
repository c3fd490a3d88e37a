//! Shot sheets: registries of immutable bullet templates
//!
//! A sheet is loaded once from a JSON description and shared by reference;
//! bullets hold an `Rc<BulletData>` to the template they were fired from.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use glam::Vec2;
use serde::Deserialize;

use super::collision::CollisionShape;
use super::draw::{BlendingMode, Color};

/// Errors raised while loading or querying a shot sheet
#[derive(Debug)]
pub enum ShotSheetError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    DuplicateId(u32),
    UnknownId(u32),
    UnknownName(String),
    MissingCollisionData { name: String, method: String },
}

impl fmt::Display for ShotSheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read shot sheet: {e}"),
            Self::Parse(e) => write!(f, "malformed shot sheet: {e}"),
            Self::DuplicateId(id) => write!(f, "duplicate bullet id {id}"),
            Self::UnknownId(id) => write!(f, "shot data of id {id} not found"),
            Self::UnknownName(name) => write!(f, "shot data of name \"{name}\" not found"),
            Self::MissingCollisionData { name, method } => write!(
                f,
                "bullet \"{name}\" uses collision method \"{method}\" without enough collision data"
            ),
        }
    }
}

impl std::error::Error for ShotSheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ShotSheetError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for ShotSheetError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// Animated texture reference
#[derive(Debug, Clone, PartialEq)]
pub struct BulletTexture {
    pub region: String,
    pub frames: u32,
    /// Frames each animation frame is shown for
    pub frame_duration: u32,
}

impl BulletTexture {
    /// Animation frame to show at bullet age `t`
    pub fn frame_at(&self, t: u32) -> u32 {
        if self.frames <= 1 {
            0
        } else {
            (t / self.frame_duration.max(1)) % self.frames
        }
    }
}

/// Immutable bullet template
#[derive(Debug, Clone, PartialEq)]
pub struct BulletData {
    pub id: u32,
    pub name: String,
    pub color: Color,
    pub blending: BlendingMode,
    pub texture: BulletTexture,
    pub size: Vec2,
    pub origin: Vec2,
    pub delay_texture: String,
    pub delay_color: Color,
    pub delay_blending: BlendingMode,
    /// Radians added to the bullet rotation every frame
    pub spin_velocity: f32,
    pub collision: CollisionShape,
    /// Base rotation added to the bullet's own rotation when drawn
    pub rotation: f32,
}

#[derive(Debug, Deserialize)]
struct RawShotSheet {
    #[serde(default)]
    atlas: Option<String>,
    data: Vec<RawBulletData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBulletData {
    id: u32,
    name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    blending: Option<String>,
    region: String,
    #[serde(default = "one")]
    frames: u32,
    #[serde(default = "one")]
    frame_duration: u32,
    #[serde(default = "default_size")]
    width: f32,
    #[serde(default = "default_size")]
    height: f32,
    #[serde(default)]
    origin_x: Option<f32>,
    #[serde(default)]
    origin_y: Option<f32>,
    #[serde(default)]
    delay_region: Option<String>,
    #[serde(default)]
    delay_color: Option<String>,
    #[serde(default)]
    delay_blending: Option<String>,
    #[serde(default)]
    spin_velocity: f32,
    #[serde(default)]
    collision_method: Option<String>,
    #[serde(default)]
    collision_data: Vec<f32>,
    #[serde(default)]
    rotation: f32,
}

fn one() -> u32 {
    1
}

fn default_size() -> f32 {
    16.0
}

fn parse_color(hex: Option<&str>, name: &str) -> Color {
    let hex = hex.unwrap_or("ff0000");
    Color::from_hex(hex).unwrap_or_else(|| {
        log::warn!("Bullet \"{name}\" has invalid color \"{hex}\", using red");
        Color::RED
    })
}

impl RawBulletData {
    fn into_data(self) -> Result<BulletData, ShotSheetError> {
        let method = self.collision_method.as_deref().unwrap_or("circle");
        let missing = || ShotSheetError::MissingCollisionData {
            name: self.name.clone(),
            method: method.to_string(),
        };
        let collision = match method {
            "none" => CollisionShape::None,
            "rectangle" => match self.collision_data.as_slice() {
                [w, h, ..] => CollisionShape::Aabb { width: *w, height: *h },
                _ => return Err(missing()),
            },
            other => {
                if other != "circle" {
                    log::warn!(
                        "Bullet \"{}\" has unknown collision method \"{other}\", using circle",
                        self.name
                    );
                }
                match self.collision_data.first() {
                    Some(r) => CollisionShape::circle(*r),
                    None => return Err(missing()),
                }
            }
        };

        let color = parse_color(self.color.as_deref(), &self.name);
        let delay_color = parse_color(self.delay_color.as_deref(), &self.name);
        let size = Vec2::new(self.width, self.height);
        // Origin defaults to the texture center
        let origin = Vec2::new(
            self.origin_x.unwrap_or(size.x / 2.0),
            self.origin_y.unwrap_or(size.y / 2.0),
        );
        Ok(BulletData {
            id: self.id,
            color,
            blending: self
                .blending
                .as_deref()
                .map(BlendingMode::for_name)
                .unwrap_or_default(),
            texture: BulletTexture {
                region: self.region.clone(),
                frames: self.frames,
                frame_duration: self.frame_duration,
            },
            size,
            origin,
            delay_texture: self.delay_region.unwrap_or(self.region),
            delay_color,
            delay_blending: BlendingMode::for_name(self.delay_blending.as_deref().unwrap_or("ADD")),
            spin_velocity: self.spin_velocity,
            collision,
            rotation: self.rotation,
            name: self.name,
        })
    }
}

/// Registry of bullet templates, addressable by id or name
#[derive(Debug, Default)]
pub struct ShotSheet {
    /// Texture atlas the regions refer to
    pub atlas: Option<String>,
    data: HashMap<u32, Rc<BulletData>>,
    name_to_id: HashMap<String, u32>,
}

impl ShotSheet {
    /// Parse a sheet from its JSON description
    pub fn from_json(json: &str) -> Result<Self, ShotSheetError> {
        let raw: RawShotSheet = serde_json::from_str(json)?;
        let mut sheet = ShotSheet {
            atlas: raw.atlas,
            ..Default::default()
        };
        for raw_bullet in raw.data {
            let data = raw_bullet.into_data()?;
            if sheet.data.contains_key(&data.id) {
                return Err(ShotSheetError::DuplicateId(data.id));
            }
            sheet.name_to_id.insert(data.name.clone(), data.id);
            sheet.data.insert(data.id, Rc::new(data));
        }
        log::info!("Loaded shot sheet with {} bullet types", sheet.data.len());
        Ok(sheet)
    }

    /// Read and parse a sheet file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShotSheetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Template id for a name
    pub fn id_of(&self, name: &str) -> Result<u32, ShotSheetError> {
        self.name_to_id.get(name).copied().ok_or_else(|| {
            log::error!("Shot data of name \"{name}\" not found!");
            ShotSheetError::UnknownName(name.to_string())
        })
    }

    pub fn find(&self, id: u32) -> Result<Rc<BulletData>, ShotSheetError> {
        self.data.get(&id).cloned().ok_or_else(|| {
            log::error!("Shot data of id {id} not found!");
            ShotSheetError::UnknownId(id)
        })
    }

    pub fn find_by_name(&self, name: &str) -> Result<Rc<BulletData>, ShotSheetError> {
        self.find(self.id_of(name)?)
    }
}
