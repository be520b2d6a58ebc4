use std::fs;
use std::io;
use std::path::Path;

use engine::{Anchor, BodyConfig, SurfaceDef, Vector2, WorldFrame, DEFAULT_BOARD_WIDTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SPIKE_DAMAGE: u32 = 25;

#[derive(Debug, Error)]
pub(crate) enum LevelError {
    #[error("read level file: {0}")]
    Read(#[source] io::Error),
    #[error("parse level json{}: {source}", at_path(.path))]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: String, message: String },
}

fn at_path(path: &str) -> String {
    if path.is_empty() || path == "." {
        String::new()
    } else {
        format!(" at {path}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LevelConfig {
    #[serde(default = "default_board_width")]
    pub(crate) board_width: f32,
    #[serde(default)]
    pub(crate) vertical_offset: f32,
    #[serde(default)]
    pub(crate) body: BodyConfig,
    pub(crate) surfaces: Vec<SurfaceDef>,
}

fn default_board_width() -> f32 {
    DEFAULT_BOARD_WIDTH
}

impl Default for LevelConfig {
    fn default() -> Self {
        let body = BodyConfig {
            start: Vector2::new((DEFAULT_BOARD_WIDTH - BodyConfig::default().width) / 2.0, 0.0),
            ..BodyConfig::default()
        };

        Self {
            board_width: DEFAULT_BOARD_WIDTH,
            vertical_offset: 0.0,
            body,
            surfaces: vec![
                SurfaceDef::new(0.0, 115.0, 400.0, Anchor::Right),
                SurfaceDef::new(200.0, 325.0, 150.0, Anchor::Left),
                SurfaceDef::new(475.0, 325.0, 150.0, Anchor::Left),
                SurfaceDef::new(0.0, 440.0, 200.0, Anchor::Left),
                SurfaceDef::new(102.0, 460.0, 88.0, Anchor::Left).with_damage(SPIKE_DAMAGE),
                SurfaceDef::new(640.0, 640.0, 200.0, Anchor::Left),
                SurfaceDef::new(742.0, 660.0, 88.0, Anchor::Left).with_damage(SPIKE_DAMAGE),
                SurfaceDef::new(0.0, 840.0, 400.0, Anchor::Right),
                SurfaceDef::new(200.0, 1050.0, 150.0, Anchor::Left),
                SurfaceDef::new(475.0, 1050.0, 150.0, Anchor::Left),
            ],
        }
    }
}

impl LevelConfig {
    pub(crate) fn load(path: &Path) -> Result<Self, LevelError> {
        let raw = fs::read_to_string(path).map_err(LevelError::Read)?;
        Self::parse(&raw)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self, LevelError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let level = serde_path_to_error::deserialize::<_, LevelConfig>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                LevelError::Parse {
                    path,
                    source: error.into_inner(),
                }
            })?;
        deserializer.end().map_err(|source| LevelError::Parse {
            path: String::new(),
            source,
        })?;

        level.validate()?;
        Ok(level)
    }

    pub(crate) fn frame(&self) -> WorldFrame {
        WorldFrame {
            board_width: self.board_width,
            vertical_offset: self.vertical_offset,
        }
    }

    fn validate(&self) -> Result<(), LevelError> {
        require(
            "board_width",
            self.board_width.is_finite() && self.board_width > 0.0,
            "expected a positive finite width",
        )?;
        require(
            "vertical_offset",
            self.vertical_offset.is_finite(),
            "expected a finite offset",
        )?;
        require(
            "body.width",
            self.body.width.is_finite()
                && self.body.width > 0.0
                && self.body.width <= self.board_width,
            format!("expected a width in (0, {}]", self.board_width),
        )?;
        for (field, value) in [
            ("body.speed", self.body.speed),
            ("body.decel_speed", self.body.decel_speed),
            ("body.gravity", self.body.gravity),
        ] {
            require(
                field,
                value.is_finite() && value >= 0.0,
                "expected a non-negative finite number",
            )?;
        }
        require(
            "body.start",
            self.body.start.x.is_finite() && self.body.start.y.is_finite(),
            "expected finite coordinates",
        )?;

        for (index, surface) in self.surfaces.iter().enumerate() {
            require(
                &format!("surfaces[{index}]"),
                surface.x.is_finite() && surface.y.is_finite(),
                "expected finite coordinates",
            )?;
            require(
                &format!("surfaces[{index}].width"),
                surface.width.is_finite() && surface.width > 0.0,
                "expected a positive finite width",
            )?;
            require(
                &format!("surfaces[{index}].height"),
                surface.height.is_finite() && surface.height >= 0.0,
                "expected a non-negative finite height",
            )?;
        }
        Ok(())
    }
}

fn require(path: &str, ok: bool, message: impl Into<String>) -> Result<(), LevelError> {
    if ok {
        return Ok(());
    }
    Err(LevelError::Invalid {
        path: path.to_string(),
        message: message.into(),
    })
}
