//! Procedural point field: a flat `x, y, z` buffer of uniformly scattered points.

use rand::Rng;

/// Number of points and spatial extent of the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointFieldParams {
    pub count: usize,
    pub size: f32,
}

impl Default for PointFieldParams {
    fn default() -> Self {
        Self {
            count: 500,
            size: 10.0,
        }
    }
}

impl PointFieldParams {
    /// Half-extent per axis. X is three times wider than Y and Z.
    pub fn half_extents(&self) -> [f32; 3] {
        [self.size * 1.5, self.size * 0.5, self.size * 0.5]
    }
}

/// Immutable point buffer, `3 * count` floats.
#[derive(Clone, Debug, PartialEq)]
pub struct PointField {
    positions: Vec<f32>,
}

impl PointField {
    /// Scatter `params.count` points using `rng`.
    pub fn generate<R: Rng + ?Sized>(params: PointFieldParams, rng: &mut R) -> Self {
        let mut positions = vec![0.0f32; params.count * 3];
        for point in positions.chunks_exact_mut(3) {
            point[0] = (rng.random::<f32>() - 0.5) * params.size * 3.0;
            point[1] = (rng.random::<f32>() - 0.5) * params.size;
            point[2] = (rng.random::<f32>() - 0.5) * params.size;
        }
        log::debug!(
            "Generated point field: {} points, size {}",
            params.count,
            params.size
        );
        Self { positions }
    }

    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn within(field: &PointField, params: PointFieldParams) -> bool {
        let [hx, hy, hz] = params.half_extents();
        field
            .iter()
            .all(|[x, y, z]| x.abs() <= hx && y.abs() <= hy && z.abs() <= hz)
    }

    #[test]
    fn default_field_has_expected_shape() {
        let params = PointFieldParams::default();
        let field = PointField::generate(params, &mut StdRng::seed_from_u64(7));
        assert_eq!(field.positions().len(), 1500);
        assert_eq!(field.len(), 500);
        assert_eq!(params.half_extents(), [15.0, 5.0, 5.0]);
        assert!(within(&field, params));
    }

    #[test]
    fn field_is_elongated_along_x() {
        let params = PointFieldParams {
            count: 4000,
            size: 2.0,
        };
        let field = PointField::generate(params, &mut StdRng::seed_from_u64(42));
        assert!(within(&field, params));
        let max_x = field.iter().map(|p| p[0].abs()).fold(0.0, f32::max);
        let max_y = field.iter().map(|p| p[1].abs()).fold(0.0, f32::max);
        assert!(max_x > 1.0, "x spread {max_x}");
        assert!(max_y <= 1.0);
    }

    #[test]
    fn unseeded_runs_differ() {
        let params = PointFieldParams::default();
        let a = PointField::generate(params, &mut rand::rng());
        let b = PointField::generate(params, &mut rand::rng());
        assert_ne!(a, b);
    }

    #[test]
    fn empty_field() {
        let params = PointFieldParams {
            count: 0,
            size: 10.0,
        };
        let field = PointField::generate(params, &mut StdRng::seed_from_u64(1));
        assert!(field.is_empty());
    }
}
