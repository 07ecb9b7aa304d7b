use bevy::prelude::*;

/// An optional sharp corner inside a cell. Only points with `exists` set take part in averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeaturePoint {
    /// The position in chunk-local space
    pub position: Vec2,
    /// Whether the feature was found at all
    pub exists: bool,
}

impl FeaturePoint {
    /// A feature point that doesn't exist
    pub const NONE: FeaturePoint = FeaturePoint {
        position: Vec2::ZERO,
        exists: false,
    };

    /// Construct an existing feature point at `position`
    pub const fn new(position: Vec2) -> Self {
        Self {
            position,
            exists: true,
        }
    }

    /// Average the existing points of `a` and `b`
    pub fn average2(a: FeaturePoint, b: FeaturePoint) -> Self {
        Self::average(&[a, b])
    }

    /// Average the existing points of `a`, `b` and `c`
    pub fn average3(a: FeaturePoint, b: FeaturePoint, c: FeaturePoint) -> Self {
        Self::average(&[a, b, c])
    }

    /// Average the existing points of `a`, `b`, `c` and `d`
    pub fn average4(a: FeaturePoint, b: FeaturePoint, c: FeaturePoint, d: FeaturePoint) -> Self {
        Self::average(&[a, b, c, d])
    }

    /// Average every point that exists. The result doesn't exist if none of the inputs do.
    pub fn average(points: &[FeaturePoint]) -> Self {
        let (sum, count) = points
            .iter()
            .filter(|p| p.exists)
            .fold((Vec2::ZERO, 0u32), |(sum, count), p| {
                (sum + p.position, count + 1)
            });

        if count == 0 {
            return Self::NONE;
        }

        Self::new(sum / count as f32)
    }

    /// Use the point if it exists, otherwise use `fallback` and mark the result as existing
    pub fn or_fallback(self, fallback: Vec2) -> Self {
        if self.exists {
            self
        } else {
            Self::new(fallback)
        }
    }
}

#[test]
fn average_ignores_missing_points() {
    let a = FeaturePoint::new(Vec2::new(1., 1.));
    let b = FeaturePoint::NONE;
    let c = FeaturePoint::new(Vec2::new(3., 5.));

    let avg = FeaturePoint::average3(a, b, c);
    assert!(avg.exists);
    assert_eq!(Vec2::new(2., 3.), avg.position);
}

#[test]
fn average_of_nothing_does_not_exist() {
    let avg = FeaturePoint::average4(
        FeaturePoint::NONE,
        FeaturePoint::NONE,
        FeaturePoint::NONE,
        FeaturePoint::NONE,
    );
    assert!(!avg.exists);
    assert_eq!(Vec2::ZERO, avg.position);

    let forced = avg.or_fallback(Vec2::new(0.5, 0.5));
    assert!(forced.exists);
    assert_eq!(Vec2::new(0.5, 0.5), forced.position);
}

#[test]
fn fallback_keeps_existing_point() {
    let p = FeaturePoint::new(Vec2::new(4., 2.)).or_fallback(Vec2::ZERO);
    assert_eq!(Vec2::new(4., 2.), p.position);
}
