use serde::{Deserialize, Serialize};

/// Half-height of the band around a surface top that still counts as standing on it.
pub const RESTING_TOLERANCE: f32 = 5.0;
pub const DEFAULT_SURFACE_HEIGHT: f32 = 20.0;
pub const DEFAULT_BOARD_WIDTH: f32 = 1200.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Left,
    Right,
}

/// Static platform geometry. `x` is measured from the anchored board edge, `y` from the floor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    #[serde(default = "default_surface_height")]
    pub height: f32,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub damage: u32,
}

fn default_surface_height() -> f32 {
    DEFAULT_SURFACE_HEIGHT
}

impl SurfaceDef {
    pub fn new(x: f32, y: f32, width: f32, anchor: Anchor) -> Self {
        Self {
            x,
            y,
            width,
            height: DEFAULT_SURFACE_HEIGHT,
            anchor,
            damage: 0,
        }
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }
}

/// World-wide values every collision query is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldFrame {
    pub board_width: f32,
    #[serde(default)]
    pub vertical_offset: f32,
}

impl Default for WorldFrame {
    fn default() -> Self {
        Self {
            board_width: DEFAULT_BOARD_WIDTH,
            vertical_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    def: SurfaceDef,
    was_resting: bool,
    armed_damage: u32,
}

impl Surface {
    pub fn new(def: SurfaceDef) -> Self {
        Self {
            def,
            was_resting: false,
            armed_damage: 0,
        }
    }

    pub fn top(&self, frame: &WorldFrame) -> f32 {
        self.def.y + self.def.height + frame.vertical_offset
    }

    /// Horizontal extent in board coordinates as `(left, right)`.
    pub fn span(&self, frame: &WorldFrame) -> (f32, f32) {
        match self.def.anchor {
            Anchor::Left => (self.def.x, self.def.x + self.def.width),
            Anchor::Right => (
                frame.board_width - self.def.x - self.def.width,
                frame.board_width - self.def.x,
            ),
        }
    }

    /// Tests the point and records contact. Landing (not-resting to resting) arms the
    /// surface damage for a single [`Surface::take_damage`].
    pub fn resting_on(&mut self, x: f32, y: f32, frame: &WorldFrame) -> bool {
        let resting = self.contains(x, y, frame);
        if resting && !self.was_resting {
            self.armed_damage = self.def.damage;
        }
        self.was_resting = resting;
        resting
    }

    pub fn take_damage(&mut self) -> u32 {
        std::mem::take(&mut self.armed_damage)
    }

    fn contains(&self, x: f32, y: f32, frame: &WorldFrame) -> bool {
        let top = self.top(frame);
        if y < top - RESTING_TOLERANCE || y > top + RESTING_TOLERANCE {
            return false;
        }
        let (left, right) = self.span(frame);
        x >= left && x <= right
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub index: usize,
    pub top: f32,
}

/// Ordered platform list. Queries stop at the first surface that matches, so overlapping
/// platforms resolve by list order rather than by height.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSet {
    surfaces: Vec<Surface>,
}

impl SurfaceSet {
    pub fn new(defs: impl IntoIterator<Item = SurfaceDef>) -> Self {
        Self {
            surfaces: defs.into_iter().map(Surface::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Surface> {
        self.surfaces.get(index)
    }

    pub fn resting_on(&mut self, x: f32, y: f32, frame: &WorldFrame) -> Option<Contact> {
        self.surfaces
            .iter_mut()
            .enumerate()
            .find_map(|(index, surface)| {
                surface.resting_on(x, y, frame).then(|| Contact {
                    index,
                    top: surface.top(frame),
                })
            })
    }

    pub fn take_damage(&mut self, index: usize) -> u32 {
        self.surfaces
            .get_mut(index)
            .map(Surface::take_damage)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> WorldFrame {
        WorldFrame::default()
    }

    #[test]
    fn left_anchored_platform_lands_inside_band_and_span() {
        let mut surface = Surface::new(SurfaceDef::new(200.0, 325.0, 150.0, Anchor::Left));

        for y in [340.0, 342.5, 345.0, 347.0, 350.0] {
            assert!(surface.resting_on(250.0, y, &frame()), "y {y}");
        }
        assert!(!surface.resting_on(250.0, 339.9, &frame()));
        assert!(!surface.resting_on(250.0, 350.1, &frame()));
    }

    #[test]
    fn point_outside_span_never_lands() {
        let mut surface = Surface::new(SurfaceDef::new(200.0, 325.0, 150.0, Anchor::Left));
        for y in [0.0, 340.0, 345.0, 350.0, 1000.0] {
            assert!(!surface.resting_on(500.0, y, &frame()));
        }
    }

    #[test]
    fn right_anchored_span_is_measured_from_board_edge() {
        let surface = Surface::new(SurfaceDef::new(0.0, 115.0, 400.0, Anchor::Right));
        assert_eq!(surface.span(&frame()), (800.0, 1200.0));

        let mut surface = surface;
        assert!(surface.resting_on(1000.0, 135.0, &frame()));
        assert!(!surface.resting_on(700.0, 135.0, &frame()));
    }

    #[test]
    fn vertical_offset_moves_every_top() {
        let shifted = WorldFrame {
            vertical_offset: -100.0,
            ..WorldFrame::default()
        };
        let mut surface = Surface::new(SurfaceDef::new(200.0, 325.0, 150.0, Anchor::Left));

        assert_eq!(surface.top(&shifted), 245.0);
        assert!(surface.resting_on(250.0, 245.0, &shifted));
        assert!(!surface.resting_on(250.0, 345.0, &shifted));
    }

    #[test]
    fn damage_is_armed_once_per_landing() {
        let def = SurfaceDef::new(102.0, 460.0, 88.0, Anchor::Left).with_damage(25);
        let mut surface = Surface::new(def);

        assert!(surface.resting_on(150.0, 480.0, &frame()));
        assert_eq!(surface.take_damage(), 25);
        assert_eq!(surface.take_damage(), 0);

        assert!(surface.resting_on(150.0, 480.0, &frame()));
        assert_eq!(surface.take_damage(), 0);

        assert!(!surface.resting_on(150.0, 600.0, &frame()));
        assert!(surface.resting_on(150.0, 480.0, &frame()));
        assert_eq!(surface.take_damage(), 25);
    }

    #[test]
    fn first_matching_surface_wins() {
        let mut set = SurfaceSet::new([
            SurfaceDef::new(0.0, 100.0, 300.0, Anchor::Left),
            SurfaceDef::new(100.0, 102.0, 300.0, Anchor::Left).with_height(20.0),
        ]);

        let contact = set.resting_on(150.0, 121.0, &frame()).expect("contact");
        assert_eq!(contact.index, 0);
        assert_eq!(contact.top, 120.0);

        let contact = set.resting_on(350.0, 121.0, &frame()).expect("contact");
        assert_eq!(contact.index, 1);
        assert_eq!(contact.top, 122.0);
        assert_eq!(set.get(1).map(|surface| surface.top(&frame())), Some(122.0));
        assert!(set.get(2).is_none());
    }

    #[test]
    fn surface_def_deserializes_with_defaults() {
        let def: SurfaceDef = serde_json::from_str(
            r#"{ "x": 742, "y": 660, "width": 88, "anchor": "right", "damage": 25 }"#,
        )
        .expect("surface json");

        assert_eq!(def.height, DEFAULT_SURFACE_HEIGHT);
        assert_eq!(def.anchor, Anchor::Right);
        assert_eq!(def.damage, 25);

        let plain: SurfaceDef =
            serde_json::from_str(r#"{ "x": 0, "y": 0, "width": 10 }"#).expect("surface json");
        assert_eq!(plain.anchor, Anchor::Left);
        assert_eq!(plain.damage, 0);
    }

    #[test]
    fn take_damage_on_missing_index_is_zero() {
        let mut set = SurfaceSet::default();
        assert!(set.is_empty());
        assert_eq!(set.take_damage(3), 0);
    }
}
