//! Mapping between positions along a Hilbert curve and points on a square grid.

/// A Hilbert curve filling a `2^order` by `2^order` grid.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HilbertCurve {
    order: u32,
}

impl HilbertCurve {
    /// Largest order whose index space still fits in a `u64`.
    pub const MAX_ORDER: u32 = 31;

    pub fn new(order: u32) -> Option<Self> {
        if order <= Self::MAX_ORDER {
            Some(Self { order })
        } else {
            None
        }
    }
    /// The smallest curve with room for `len` indices.
    pub fn covering(len: u64) -> Option<Self> {
        let mut order = 0;
        while (1u128 << (2 * order)) < u128::from(len) {
            order += 1;
        }
        Self::new(order)
    }

    pub fn order(&self) -> u32 {
        self.order
    }
    pub fn side(&self) -> u64 {
        1 << self.order
    }
    /// The number of points on the curve, `side * side`.
    pub fn len(&self) -> u64 {
        1 << (2 * self.order)
    }

    /// Returns the grid point `(x, y)` at position `index` along the curve.
    pub fn index_to_point(&self, index: u64) -> Option<(u64, u64)> {
        if index >= self.len() {
            return None;
        }
        let (mut x, mut y) = (0, 0);
        let mut rest = index;
        let mut s = 1;

        while s < self.side() {
            let rx = 1 & (rest / 2);
            let ry = 1 & (rest ^ rx);
            rotate(s, &mut x, &mut y, rx, ry);
            x += s * rx;
            y += s * ry;
            rest /= 4;
            s *= 2;
        }
        Some((x, y))
    }

    /// Every grid point, in curve order.
    pub fn points(self) -> impl Iterator<Item = (u64, u64)> {
        (0..self.len()).filter_map(move |index| self.index_to_point(index))
    }

    /// The inverse of [`index_to_point`](Self::index_to_point).
    pub fn point_to_index(&self, point: (u64, u64)) -> Option<u64> {
        let side = self.side();
        let (mut x, mut y) = point;
        if x >= side || y >= side {
            return None;
        }
        let mut index = 0;
        let mut s = side / 2;

        while s > 0 {
            let rx = u64::from(x & s != 0);
            let ry = u64::from(y & s != 0);
            index += s * s * ((3 * rx) ^ ry);
            rotate(side, &mut x, &mut y, rx, ry);
            s /= 2;
        }
        Some(index)
    }
}

// Reflects and transposes a quadrant so the sub-curve inside it lines up with its neighbours.
fn rotate(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_one_visits_corners_in_u_shape() {
        let curve = HilbertCurve::new(1).unwrap();
        let points = (0..4)
            .map(|index| curve.index_to_point(index).unwrap())
            .collect::<Vec<_>>();
        assert_eq!(points, vec![(0, 0), (0, 1), (1, 1), (1, 0)]);
    }

    #[test]
    fn bijective_and_invertible() {
        for order in 0..=5 {
            let curve = HilbertCurve::new(order).unwrap();
            let side = curve.side() as usize;
            let mut seen = vec![false; side * side];

            for index in 0..curve.len() {
                let (x, y) = curve.index_to_point(index).unwrap();
                assert!(x < curve.side() && y < curve.side());

                let cell = &mut seen[y as usize * side + x as usize];
                assert!(!*cell, "order {}: ({}, {}) visited twice", order, x, y);
                *cell = true;

                assert_eq!(curve.point_to_index((x, y)), Some(index));
            }
            assert!(seen.iter().all(|&visited| visited));
        }
    }

    #[test]
    fn consecutive_indices_are_neighbours() {
        let curve = HilbertCurve::new(6).unwrap();
        let mut previous = curve.index_to_point(0).unwrap();

        for index in 1..curve.len() {
            let point = curve.index_to_point(index).unwrap();
            let distance = (point.0 as i64 - previous.0 as i64).abs()
                + (point.1 as i64 - previous.1 as i64).abs();
            assert_eq!(distance, 1, "step {} -> {} is not a unit step", index - 1, index);
            previous = point;
        }
    }

    #[test]
    fn points_walk_the_whole_grid() {
        let curve = HilbertCurve::new(2).unwrap();
        let points = curve.points().collect::<Vec<_>>();
        assert_eq!(points.len(), 16);
        assert_eq!(points[0], (0, 0));
        assert_eq!(points[15], (3, 0));
    }

    #[test]
    fn out_of_range() {
        let curve = HilbertCurve::new(2).unwrap();
        assert_eq!(curve.index_to_point(16), None);
        assert_eq!(curve.point_to_index((4, 0)), None);
        assert_eq!(HilbertCurve::new(HilbertCurve::MAX_ORDER + 1), None);
    }

    #[test]
    fn covering_picks_smallest_square() {
        assert_eq!(HilbertCurve::covering(0).unwrap().order(), 0);
        assert_eq!(HilbertCurve::covering(1).unwrap().order(), 0);
        assert_eq!(HilbertCurve::covering(2).unwrap().order(), 1);
        assert_eq!(HilbertCurve::covering(4).unwrap().order(), 1);
        assert_eq!(HilbertCurve::covering(5).unwrap().order(), 2);
        assert_eq!(HilbertCurve::covering(100).unwrap().side(), 16);
        assert_eq!(HilbertCurve::covering(1 << 20).unwrap().side(), 1 << 10);
    }
}
