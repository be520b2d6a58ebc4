mod body;
mod surface;
mod vec2;

pub use body::{Body, BodyConfig, LandingReport, MAX_HEALTH, MAX_JUMPS};
pub use surface::{
    Anchor, Contact, Surface, SurfaceDef, SurfaceSet, WorldFrame, DEFAULT_BOARD_WIDTH,
    DEFAULT_SURFACE_HEIGHT, RESTING_TOLERANCE,
};
pub use vec2::Vector2;
