//! Pieces: the shared objects on the table.

use gamebox_protocol::{ConnectionId, PieceId, PieceSnapshot, Vec2};

use crate::TableConfig;

// ---------------------------------------------------------------------------
// Geometry helpers
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle, `min` inclusive to `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// A `size` rectangle centred on `center`.
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

// ---------------------------------------------------------------------------
// PieceSpec
// ---------------------------------------------------------------------------

/// What a piece is, as opposed to where it is.
///
/// The catalogue of piece classes lives with the client's assets; the
/// server only needs the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceSpec {
    pub class_id: String,
    pub object_id: String,
    pub size: Vec2,
    pub grid_size: Vec2,
    pub stack_delta: Vec2,
}

impl PieceSpec {
    /// A piece with the default geometry from `config`.
    pub fn from_config(
        class_id: impl Into<String>,
        object_id: impl Into<String>,
        config: &TableConfig,
    ) -> Self {
        let [w, h] = config.piece_size;
        let [gx, gy] = config.grid_size;
        let [dx, dy] = config.stack_delta;
        Self {
            class_id: class_id.into(),
            object_id: object_id.into(),
            size: Vec2::new(w, h),
            grid_size: Vec2::new(gx, gy),
            stack_delta: Vec2::new(dx, dy),
        }
    }
}

// ---------------------------------------------------------------------------
// Piece
// ---------------------------------------------------------------------------

/// An in-flight smooth move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub target: Vec2,
    /// Seconds left. Always positive while the animation exists.
    pub remaining: f32,
}

/// What a renderer needs to draw a piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    /// `class_id`, with `/back` appended when face down.
    pub texture: String,
    pub destination: Rect,
    pub rotation: u16,
}

/// A piece on the table.
///
/// Stacking, selection and ownership are stored as ids, never as
/// references, so a piece can be removed without chasing pointers. The
/// [`Table`](crate::Table) keeps `above` and `below` consistent; outside
/// this crate they are read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    pub(crate) id: PieceId,
    pub(crate) class_id: String,
    pub(crate) object_id: String,
    pub(crate) location: Vec2,
    pub(crate) animation: Option<Animation>,
    pub(crate) size: Vec2,
    pub(crate) grid_size: Vec2,
    pub(crate) stack_delta: Vec2,
    pub(crate) flipped: bool,
    /// Degrees, `0..360`.
    pub(crate) rotation: u16,
    pub(crate) selected_by: Option<ConnectionId>,
    pub(crate) owned_by: Option<ConnectionId>,
    /// Pieces resting directly on this one, in stacking order.
    pub(crate) above: Vec<PieceId>,
    /// The piece this one rests on.
    pub(crate) below: Option<PieceId>,
}

impl Piece {
    pub(crate) fn new(id: PieceId, spec: PieceSpec, location: Vec2) -> Self {
        Self {
            id,
            class_id: spec.class_id,
            object_id: spec.object_id,
            location,
            animation: None,
            size: spec.size,
            grid_size: spec.grid_size,
            stack_delta: spec.stack_delta,
            flipped: false,
            rotation: 0,
            selected_by: None,
            owned_by: None,
            above: Vec::new(),
            below: None,
        }
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Where the piece is drawn right now.
    pub fn location(&self) -> Vec2 {
        self.location
    }

    /// Where the piece will come to rest: the animation target if moving.
    pub fn resting_location(&self) -> Vec2 {
        self.animation.map_or(self.location, |anim| anim.target)
    }

    pub fn animation(&self) -> Option<Animation> {
        self.animation
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn grid_size(&self) -> Vec2 {
        self.grid_size
    }

    pub fn stack_delta(&self) -> Vec2 {
        self.stack_delta
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn selected_by(&self) -> Option<ConnectionId> {
        self.selected_by
    }

    pub fn owned_by(&self) -> Option<ConnectionId> {
        self.owned_by
    }

    /// Pieces resting directly on this one.
    pub fn above(&self) -> &[PieceId] {
        &self.above
    }

    pub fn below(&self) -> Option<PieceId> {
        self.below
    }

    /// Footprint if the piece were resting at `at`.
    pub fn footprint_at(&self, at: Vec2) -> Rect {
        Rect::centered(at, self.size)
    }

    /// Footprint at the resting location.
    pub fn footprint(&self) -> Rect {
        self.footprint_at(self.resting_location())
    }

    /// Whether the two pieces' resting footprints overlap.
    pub fn collides_with(&self, other: &Piece) -> bool {
        self.footprint().overlaps(&other.footprint())
    }

    pub fn drawable(&self) -> Drawable {
        let texture = if self.flipped {
            format!("{}/back", self.class_id)
        } else {
            self.class_id.clone()
        };
        Drawable {
            texture,
            destination: self.footprint_at(self.location),
            rotation: self.rotation,
        }
    }

    /// The CREATE payload describing this piece to a newcomer.
    pub fn snapshot(&self) -> PieceSnapshot {
        PieceSnapshot {
            piece: self.id,
            class_id: self.class_id.clone(),
            object_id: self.object_id.clone(),
            location: self.resting_location(),
            size: self.size,
            flipped: self.flipped,
            rotation: self.rotation,
        }
    }

    /// Steps a running animation by `dt` seconds. Returns `true` while it
    /// is still running afterwards.
    pub(crate) fn advance(&mut self, dt: f32) -> bool {
        let Some(anim) = self.animation else {
            return false;
        };
        if dt >= anim.remaining {
            self.location = anim.target;
            self.animation = None;
            return false;
        }
        let progress = dt / anim.remaining;
        self.location += (anim.target - self.location) * progress;
        self.animation = Some(Animation {
            target: anim.target,
            remaining: anim.remaining - dt,
        });
        true
    }
}
