//! A 2x2 window of corners and the geometry needed to pick and place its sharp features

use bevy::prelude::*;

use crate::{FeaturePoint, Voxel};

/// Four corners of one cell: `a` = SW, `b` = SE, `c` = NW, `d` = NE
#[derive(Debug, Clone, Copy)]
pub struct VoxelCell {
    /// The column of the cell inside the row being swept
    pub i: usize,
    /// South-west corner
    pub a: Voxel,
    /// South-east corner
    pub b: Voxel,
    /// North-west corner
    pub c: Voxel,
    /// North-east corner
    pub d: Voxel,
    /// Cosine of the largest angle that still counts as a sharp feature
    pub sharp_feature_limit: f32,
    /// Cosine of the largest angle at which two normals count as parallel
    pub parallel_limit: f32,
}

impl Default for VoxelCell {
    fn default() -> Self {
        Self::new(
            crate::DEFAULT_MAX_FEATURE_ANGLE,
            crate::DEFAULT_MAX_PARALLEL_ANGLE,
        )
    }
}

impl VoxelCell {
    /// Create a cell with the given angle limits, in degrees
    pub fn new(max_feature_angle: f32, max_parallel_angle: f32) -> Self {
        Self {
            i: 0,
            a: Voxel::default(),
            b: Voxel::default(),
            c: Voxel::default(),
            d: Voxel::default(),
            sharp_feature_limit: max_feature_angle.to_radians().cos(),
            parallel_limit: max_parallel_angle.to_radians().cos(),
        }
    }

    /// Load the four corners of the next cell
    pub fn set(&mut self, i: usize, a: Voxel, b: Voxel, c: Voxel, d: Voxel) {
        self.i = i;
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
    }

    /// Feature between the south and west edges
    pub fn feature_sw(&self) -> FeaturePoint {
        self.sharp_feature(
            self.a.x_edge_point(),
            self.a.x_normal,
            self.a.y_edge_point(),
            self.a.y_normal,
        )
    }

    /// Feature between the south and east edges
    pub fn feature_se(&self) -> FeaturePoint {
        self.sharp_feature(
            self.a.x_edge_point(),
            self.a.x_normal,
            self.b.y_edge_point(),
            self.b.y_normal,
        )
    }

    /// Feature between the west and north edges
    pub fn feature_nw(&self) -> FeaturePoint {
        self.sharp_feature(
            self.a.y_edge_point(),
            self.a.y_normal,
            self.c.x_edge_point(),
            self.c.x_normal,
        )
    }

    /// Feature between the north and east edges
    pub fn feature_ne(&self) -> FeaturePoint {
        self.sharp_feature(
            self.c.x_edge_point(),
            self.c.x_normal,
            self.b.y_edge_point(),
            self.b.y_normal,
        )
    }

    /// Feature between the north and south edges
    pub fn feature_ns(&self) -> FeaturePoint {
        self.sharp_feature(
            self.a.x_edge_point(),
            self.a.x_normal,
            self.c.x_edge_point(),
            self.c.x_normal,
        )
    }

    /// Feature between the east and west edges
    pub fn feature_ew(&self) -> FeaturePoint {
        self.sharp_feature(
            self.a.y_edge_point(),
            self.a.y_normal,
            self.b.y_edge_point(),
            self.b.y_normal,
        )
    }

    /// Junction of the north, east and west edges
    pub fn feature_new(&self) -> FeaturePoint {
        FeaturePoint::average3(self.feature_ew(), self.feature_ne(), self.feature_nw()).or_fallback(
            (self.a.y_edge_point() + self.b.y_edge_point() + self.c.x_edge_point()) / 3.,
        )
    }

    /// Junction of the north, south and east edges
    pub fn feature_nse(&self) -> FeaturePoint {
        FeaturePoint::average3(self.feature_ns(), self.feature_se(), self.feature_ne()).or_fallback(
            (self.a.x_edge_point() + self.b.y_edge_point() + self.c.x_edge_point()) / 3.,
        )
    }

    /// Junction of the north, south and west edges
    pub fn feature_nsw(&self) -> FeaturePoint {
        FeaturePoint::average3(self.feature_ns(), self.feature_nw(), self.feature_sw()).or_fallback(
            (self.a.x_edge_point() + self.a.y_edge_point() + self.c.x_edge_point()) / 3.,
        )
    }

    /// Junction of the south, east and west edges
    pub fn feature_sew(&self) -> FeaturePoint {
        FeaturePoint::average3(self.feature_ew(), self.feature_se(), self.feature_sw()).or_fallback(
            (self.a.x_edge_point() + self.a.y_edge_point() + self.b.y_edge_point()) / 3.,
        )
    }

    /// Unweighted average of the four edge points
    pub fn average_nesw(&self) -> Vec2 {
        (self.a.x_edge_point()
            + self.a.y_edge_point()
            + self.b.y_edge_point()
            + self.c.x_edge_point())
            * 0.25
    }

    /// Whether the A-D diagonal of a saddle cell is connected, given the SW and NE features
    pub fn has_connection_ad(&self, fa: &FeaturePoint, fd: &FeaturePoint) -> bool {
        let flip = (self.a.state < self.b.state) == (self.a.state < self.c.state);

        if self.is_parallel(self.a.x_normal, self.a.y_normal, flip)
            || self.is_parallel(self.c.x_normal, self.b.y_normal, flip)
        {
            return true;
        }

        let (a, d) = (fa.position, fd.position);
        match (fa.exists, fd.exists) {
            (true, true) => {
                if is_below_line(a, self.b.y_edge_point(), d) {
                    is_below_line(a, d, self.c.x_edge_point())
                        || is_below_line(d, a, self.a.x_edge_point())
                } else {
                    is_below_line(a, d, self.c.x_edge_point())
                        && is_below_line(d, self.a.y_edge_point(), a)
                }
            }
            (true, false) => is_below_line(a, self.b.y_edge_point(), self.c.x_edge_point()),
            (false, true) => is_below_line(d, self.a.y_edge_point(), self.a.x_edge_point()),
            (false, false) => false,
        }
    }

    /// Whether the B-C diagonal of a saddle cell is connected, given the SE and NW features
    pub fn has_connection_bc(&self, fb: &FeaturePoint, fc: &FeaturePoint) -> bool {
        let flip = (self.b.state < self.a.state) == (self.b.state < self.d.state);

        if self.is_parallel(self.a.x_normal, self.b.y_normal, flip)
            || self.is_parallel(self.c.x_normal, self.a.y_normal, flip)
        {
            return true;
        }

        let (b, c) = (fb.position, fc.position);
        match (fb.exists, fc.exists) {
            (true, true) => {
                if is_below_line(c, self.a.x_edge_point(), b) {
                    is_below_line(c, b, self.b.y_edge_point())
                        || is_below_line(b, c, self.a.y_edge_point())
                } else {
                    is_below_line(c, b, self.b.y_edge_point())
                        && is_below_line(b, self.c.x_edge_point(), c)
                }
            }
            (true, false) => is_below_line(b, self.c.x_edge_point(), self.a.y_edge_point()),
            (false, true) => is_below_line(c, self.a.x_edge_point(), self.b.y_edge_point()),
            (false, false) => false,
        }
    }

    /// Whether `p` lies on the B side of the A-D diagonal
    pub fn is_inside_abd(&self, p: Vec2) -> bool {
        is_below_line(p, self.a.position, self.d.position)
    }

    /// Whether `p` lies on the C side of the A-D diagonal
    pub fn is_inside_acd(&self, p: Vec2) -> bool {
        is_below_line(p, self.d.position, self.a.position)
    }

    /// Whether `p` lies on the A side of the B-C diagonal
    pub fn is_inside_abc(&self, p: Vec2) -> bool {
        is_below_line(p, self.c.position, self.b.position)
    }

    /// Whether `p` lies on the D side of the B-C diagonal
    pub fn is_inside_bcd(&self, p: Vec2) -> bool {
        is_below_line(p, self.b.position, self.c.position)
    }

    fn sharp_feature(&self, p1: Vec2, n1: Vec2, p2: Vec2, n2: Vec2) -> FeaturePoint {
        if !self.is_sharp_feature(n1, n2) {
            return FeaturePoint::NONE;
        }

        let position = intersection(p1, n1, p2, n2);
        FeaturePoint {
            position,
            exists: self.is_inside_cell(position),
        }
    }

    fn is_sharp_feature(&self, n1: Vec2, n2: Vec2) -> bool {
        let dot = n1.dot(-n2);
        dot >= self.sharp_feature_limit && dot < 0.999
    }

    fn is_parallel(&self, n1: Vec2, n2: Vec2, flip: bool) -> bool {
        n1.dot(if flip { -n2 } else { n2 }) > self.parallel_limit
    }

    fn is_inside_cell(&self, p: Vec2) -> bool {
        p.x > self.a.position.x
            && p.y > self.a.position.y
            && p.x < self.d.position.x
            && p.y < self.d.position.y
    }
}

/// Intersect the line through `p1` perpendicular to `n1` with the line through `p2` perpendicular to `n2`
pub fn intersection(p1: Vec2, n1: Vec2, p2: Vec2, n2: Vec2) -> Vec2 {
    let d2 = Vec2::new(-n2.y, n2.x);
    let u2 = -n1.dot(p2 - p1) / n1.dot(d2);
    p2 + d2 * u2
}

/// Whether `p` lies to the right of the directed line from `start` to `end`
#[inline]
pub fn is_below_line(p: Vec2, start: Vec2, end: Vec2) -> bool {
    let determinant = (end.x - start.x) * (p.y - start.y) - (end.y - start.y) * (p.x - start.x);
    determinant < 0.
}

/// The fifteen topological configurations of a cell. Each digit names the label of corners a, b, c
/// and d, where labels are handed out in first-seen order and equal states share a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellCase {
    /// All corners share one state
    C0000,
    /// Only d differs
    C0001,
    /// Only c differs
    C0010,
    /// c and d share a state different from a and b
    C0011,
    /// a, b share a state, c and d each have their own
    C0012,
    /// Only b differs
    C0100,
    /// b and d share a state different from a and c
    C0101,
    /// a, c share a state, b and d each have their own
    C0102,
    /// Saddle: a and d share a state, b and c share another
    C0110,
    /// Only a differs
    C0111,
    /// Saddle: b and c share a state, d has a third one
    C0112,
    /// Saddle: a and d share a state, c has a third one
    C0120,
    /// b and d share a state, a and c each have their own
    C0121,
    /// c and d share a state, a and b each have their own
    C0122,
    /// Every corner has its own state
    C0123,
}

impl CellCase {
    /// Every case, in label order
    pub const ALL: [CellCase; 15] = [
        CellCase::C0000,
        CellCase::C0001,
        CellCase::C0010,
        CellCase::C0011,
        CellCase::C0012,
        CellCase::C0100,
        CellCase::C0101,
        CellCase::C0102,
        CellCase::C0110,
        CellCase::C0111,
        CellCase::C0112,
        CellCase::C0120,
        CellCase::C0121,
        CellCase::C0122,
        CellCase::C0123,
    ];

    /// Canonical labeling of four states: `a` is 0, every new state gets the next free label
    pub fn labels(states: [u32; 4]) -> [u8; 4] {
        let mut seen = [0u32; 4];
        let mut count = 0;
        let mut labels = [0u8; 4];
        for (label, state) in labels.iter_mut().zip(states) {
            *label = match seen[..count].iter().position(|s| *s == state) {
                Some(existing) => existing as u8,
                None => {
                    seen[count] = state;
                    count += 1;
                    (count - 1) as u8
                }
            };
        }
        labels
    }

    /// Classify the corner states `a`, `b`, `c` and `d` of a cell
    pub fn classify(a: u32, b: u32, c: u32, d: u32) -> CellCase {
        match Self::labels([a, b, c, d]) {
            [0, 0, 0, 0] => CellCase::C0000,
            [0, 0, 0, 1] => CellCase::C0001,
            [0, 0, 1, 0] => CellCase::C0010,
            [0, 0, 1, 1] => CellCase::C0011,
            [0, 0, 1, 2] => CellCase::C0012,
            [0, 1, 0, 0] => CellCase::C0100,
            [0, 1, 0, 1] => CellCase::C0101,
            [0, 1, 0, 2] => CellCase::C0102,
            [0, 1, 1, 0] => CellCase::C0110,
            [0, 1, 1, 1] => CellCase::C0111,
            [0, 1, 1, 2] => CellCase::C0112,
            [0, 1, 2, 0] => CellCase::C0120,
            [0, 1, 2, 1] => CellCase::C0121,
            [0, 1, 2, 2] => CellCase::C0122,
            [0, 1, 2, 3] => CellCase::C0123,
            labels => unreachable!("non-canonical cell labels {labels:?}"),
        }
    }
}

#[cfg(test)]
fn corner(x: f32, y: f32, state: u32) -> Voxel {
    Voxel {
        state,
        position: Vec2::new(x, y),
        ..default()
    }
}

#[cfg(test)]
fn unit_cell(a: u32, b: u32, c: u32, d: u32) -> VoxelCell {
    let mut cell = VoxelCell::default();
    cell.set(
        0,
        corner(0., 0., a),
        corner(1., 0., b),
        corner(0., 1., c),
        corner(1., 1., d),
    );
    cell
}

#[test]
fn classify_reaches_every_case() {
    let mut found = Vec::new();
    for a in 0..4 {
        for b in 0..4 {
            for c in 0..4 {
                for d in 0..4 {
                    let case = CellCase::classify(a, b, c, d);
                    if !found.contains(&case) {
                        found.push(case);
                    }
                }
            }
        }
    }
    assert_eq!(15, found.len());
    for case in CellCase::ALL {
        assert!(found.contains(&case));
    }
}

#[test]
fn classify_uses_first_seen_labels() {
    assert_eq!(CellCase::C0000, CellCase::classify(2, 2, 2, 2));
    assert_eq!(CellCase::C0001, CellCase::classify(0, 0, 0, 5));
    assert_eq!(CellCase::C0110, CellCase::classify(1, 0, 0, 1));
    assert_eq!(CellCase::C0112, CellCase::classify(3, 0, 0, 1));
    assert_eq!(CellCase::C0120, CellCase::classify(1, 0, 2, 1));
    assert_eq!(CellCase::C0123, CellCase::classify(4, 3, 2, 1));
    assert_eq!(CellCase::C0121, CellCase::classify(7, 1, 9, 1));
}

#[test]
fn right_angle_corner_has_feature_inside_cell() {
    // Box corner at (0.6, 0.6) filling the south-west of the cell
    let mut cell = unit_cell(1, 0, 0, 0);
    cell.a.x_edge = 0.6;
    cell.a.x_normal = Vec2::X;
    cell.a.y_edge = 0.6;
    cell.a.y_normal = Vec2::Y;

    let feature = cell.feature_sw();
    assert!(feature.exists);
    assert!((feature.position - Vec2::new(0.6, 0.6)).length() < 1e-5);
}

#[test]
fn nearly_parallel_edges_have_no_feature() {
    let mut cell = unit_cell(1, 0, 0, 0);
    cell.a.x_edge = 0.5;
    cell.a.x_normal = Vec2::new(1., 1.).normalize();
    cell.a.y_edge = 0.5;
    cell.a.y_normal = Vec2::new(1., 1.02).normalize();

    assert!(!cell.feature_sw().exists);
}

#[test]
fn feature_outside_cell_does_not_exist() {
    let mut cell = unit_cell(1, 0, 0, 0);
    cell.a.x_edge = 0.9;
    cell.a.x_normal = Vec2::new(1., -0.5).normalize();
    cell.a.y_edge = 0.9;
    cell.a.y_normal = Vec2::new(-0.5, 1.).normalize();

    // Tangents meet beyond the NE corner
    let feature = cell.feature_sw();
    assert!(!feature.exists);
}

#[test]
fn junction_falls_back_to_centroid() {
    let mut cell = unit_cell(0, 0, 1, 2);
    cell.a.y_edge = 0.5;
    cell.b.y_edge = 0.5;
    cell.c.x_edge = 0.5;

    let feature = cell.feature_new();
    assert!(feature.exists);
    let expected = (Vec2::new(0., 0.5) + Vec2::new(1., 0.5) + Vec2::new(0.5, 1.)) / 3.;
    assert!((feature.position - expected).length() < 1e-5);
}

#[test]
fn intersection_of_axis_lines() {
    let p = intersection(Vec2::new(0.3, 0.), Vec2::X, Vec2::new(0., 0.7), Vec2::Y);
    assert!((p - Vec2::new(0.3, 0.7)).length() < 1e-5);
}

#[test]
fn below_line_is_right_hand_side() {
    assert!(is_below_line(Vec2::new(0.5, -1.), Vec2::ZERO, Vec2::X));
    assert!(!is_below_line(Vec2::new(0.5, 1.), Vec2::ZERO, Vec2::X));
}

#[test]
fn diagonal_sides() {
    let cell = unit_cell(1, 0, 0, 1);
    assert!(cell.is_inside_abd(Vec2::new(0.8, 0.2)));
    assert!(cell.is_inside_acd(Vec2::new(0.2, 0.8)));
    assert!(cell.is_inside_abc(Vec2::new(0.2, 0.2)));
    assert!(cell.is_inside_bcd(Vec2::new(0.8, 0.8)));
}

#[test]
fn saddle_connection_is_deterministic() {
    // a and d filled, b and c empty, crossings halfway with diagonal normals
    let mut cell = unit_cell(1, 0, 0, 1);
    cell.a.x_edge = 0.5;
    cell.a.x_normal = Vec2::new(1., 1.).normalize();
    cell.a.y_edge = 0.5;
    cell.a.y_normal = Vec2::new(1., 1.).normalize();
    cell.b.y_edge = 0.5;
    cell.b.y_normal = Vec2::new(-1., -1.).normalize();
    cell.c.x_edge = 0.5;
    cell.c.x_normal = Vec2::new(-1., -1.).normalize();

    let fa = cell.feature_sw();
    let fd = cell.feature_ne();
    let first = cell.has_connection_ad(&fa, &fd);
    for _ in 0..8 {
        assert_eq!(first, cell.has_connection_ad(&fa, &fd));
    }
}

#[test]
fn saddle_without_features_is_not_connected() {
    let mut cell = unit_cell(1, 0, 0, 1);
    cell.a.x_edge = 0.5;
    cell.a.x_normal = Vec2::X;
    cell.a.y_edge = 0.5;
    cell.a.y_normal = -Vec2::Y;
    cell.b.y_edge = 0.5;
    cell.b.y_normal = Vec2::Y;
    cell.c.x_edge = 0.5;
    cell.c.x_normal = -Vec2::X;

    assert!(!cell.has_connection_ad(&FeaturePoint::NONE, &FeaturePoint::NONE));
}

/// a and d filled, b and c empty, all crossings halfway with axis normals that never count as parallel
#[cfg(test)]
fn saddle_cell() -> VoxelCell {
    let mut cell = unit_cell(1, 0, 0, 1);
    cell.a.x_edge = 0.5;
    cell.a.x_normal = Vec2::X;
    cell.a.y_edge = 0.5;
    cell.a.y_normal = Vec2::Y;
    cell.b.y_edge = 0.5;
    cell.b.y_normal = Vec2::NEG_Y;
    cell.c.x_edge = 0.5;
    cell.c.x_normal = Vec2::NEG_X;
    cell
}

#[cfg(test)]
fn feature(position: Option<(f32, f32)>) -> FeaturePoint {
    position.map_or(FeaturePoint::NONE, |(x, y)| FeaturePoint::new(Vec2::new(x, y)))
}

#[test]
fn ad_connection_per_feature_combination() {
    let cell = saddle_cell();
    let cases = [
        // Both features, a right of the line from the east crossing to d
        (Some((0.8, 0.8)), Some((0.2, 0.2)), true),
        (Some((0.1, 0.1)), Some((0.5, 0.2)), false),
        // Both features, a left of that line
        (Some((0.9, 0.4)), Some((0.2, 0.2)), true),
        (Some((0.3, 0.3)), Some((0.7, 0.7)), false),
        // Only a, connected when it reaches past the north east chord
        (Some((0.8, 0.8)), None, true),
        (Some((0.2, 0.2)), None, false),
        // Only d, connected when it reaches past the south west chord
        (None, Some((0.2, 0.2)), true),
        (None, Some((0.8, 0.8)), false),
        (None, None, false),
    ];

    for (fa, fd, expected) in cases {
        assert_eq!(
            expected,
            cell.has_connection_ad(&feature(fa), &feature(fd)),
            "a: {fa:?}, d: {fd:?}"
        );
    }
}

#[test]
fn bc_connection_per_feature_combination() {
    let cell = saddle_cell();
    let cases = [
        // Both features, c right of the line from the south crossing to b
        (Some((0.2, 0.8)), Some((0.8, 0.2)), true),
        (Some((0.4, 0.1)), Some((0.3, 0.7)), false),
        // Both features, c left of that line
        (Some((0.2, 0.8)), Some((0.2, 0.2)), true),
        (Some((0.7, 0.3)), Some((0.3, 0.7)), false),
        // Only b, connected when it reaches past the north west chord
        (Some((0.2, 0.8)), None, true),
        (Some((0.2, 0.2)), None, false),
        // Only c, connected when it reaches past the south east chord
        (None, Some((0.8, 0.2)), true),
        (None, Some((0.2, 0.2)), false),
        (None, None, false),
    ];

    for (fb, fc, expected) in cases {
        assert_eq!(
            expected,
            cell.has_connection_bc(&feature(fb), &feature(fc)),
            "b: {fb:?}, c: {fc:?}"
        );
    }
}

#[test]
fn parallel_crossings_are_always_connected() {
    let almost_opposite = Vec2::new(-1., 0.05).normalize();

    let mut cell = saddle_cell();
    cell.a.y_normal = almost_opposite;
    assert!(cell.has_connection_ad(&FeaturePoint::NONE, &FeaturePoint::NONE));

    let mut cell = saddle_cell();
    cell.b.y_normal = almost_opposite;
    assert!(cell.has_connection_bc(&FeaturePoint::NONE, &FeaturePoint::NONE));

    // Without the parallel normals neither diagonal connects
    let cell = saddle_cell();
    assert!(!cell.has_connection_ad(&FeaturePoint::NONE, &FeaturePoint::NONE));
    assert!(!cell.has_connection_bc(&FeaturePoint::NONE, &FeaturePoint::NONE));
}
