use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Grows the rect so that it also covers `point`.
    pub fn include(&self, point: Point) -> Rect {
        self.union(&Rect::new(point.x, point.y, 0.0, 0.0))
    }
}

/// Running bounding box; starts empty so the first rect defines it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Bounds(Option<Rect>);

impl Bounds {
    pub(crate) fn add(&mut self, rect: Rect) {
        self.0 = Some(match self.0 {
            Some(current) => current.union(&rect),
            None => rect,
        });
    }

    pub(crate) fn add_point(&mut self, point: Point) {
        self.add(Rect::new(point.x, point.y, 0.0, 0.0));
    }

    pub(crate) fn get(&self) -> Option<Rect> {
        self.0
    }

    pub(crate) fn or_empty(&self) -> Rect {
        self.0.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextSize {
    pub width: f32,
    pub height: f32,
}

/// Fold glyph shown beside a topic that owns children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FoldGlyph {
    /// Children are shown; clicking folds.
    Minus,
    /// Children are hidden; clicking unfolds.
    Plus,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelChip {
    pub text: String,
    pub x: f32,
    pub width: f32,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelsLayout {
    /// Group origin, relative to the item.
    pub origin: Point,
    pub chips: Vec<LabelChip>,
    pub chip_y: f32,
    pub background: Size,
    /// X of the "more" icon inside the group when some chips are collapsed.
    pub more_x: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarkersLayout {
    pub origin: Point,
    /// `(icon key, x offset inside the row)`.
    pub icons: Vec<(String, f32)>,
    pub width: f32,
}

/// Geometry of one topic's own furniture, in the item's local coordinates
/// (title box top-left at the origin).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemLayout {
    pub title_box: Size,
    pub text_pos: Point,
    pub text_size: TextSize,
    pub image: Option<Rect>,
    pub labels: Option<LabelsLayout>,
    pub link: Option<Point>,
    pub notes: Option<Point>,
    pub markers: Option<MarkersLayout>,
    pub fold_icon: Option<(Point, FoldGlyph)>,
    /// Bounding box of every visible piece of furniture.
    pub bbox: Rect,
}

impl ItemLayout {
    /// Anchor where connectors attach, relative to the item.
    pub fn connect_point(&self, left: bool) -> Point {
        let y = (self.title_box.height / 2.0).floor();
        let x = if left { 0.0 } else { self.title_box.width };
        Point::new(x, y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorPath {
    pub child: crate::tree::TopicId,
    pub d: String,
    pub left: bool,
}

/// Geometry of one topic's subtree, produced by the recursive layout.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicLayout {
    pub item: ItemLayout,
    /// Offset of this topic inside its parent's children group.
    pub translate: Point,
    /// Offset of the children group inside this topic.
    pub children_offset: Point,
    pub children_shown: bool,
    pub paths: Vec<ConnectorPath>,
    /// Bounding box of the whole subtree in this topic's coordinates.
    pub bbox: Rect,
}

impl TopicLayout {
    pub fn origin_corner(&self) -> Point {
        Point::new(self.bbox.x, self.bbox.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.bbox.width, self.bbox.height)
    }
}
