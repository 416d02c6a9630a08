use super::frames::FrameGrid;

/// A frame-sampled measurement over time; `None` marks undefined frames.
#[derive(Debug, Clone)]
pub(crate) struct Contour {
    grid: FrameGrid,
    values: Vec<Option<f64>>,
}

impl Contour {
    pub fn new(grid: FrameGrid, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(grid.count, values.len());
        Self { grid, values }
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn time(&self, frame: usize) -> f64 {
        self.grid.time(frame)
    }

    pub fn step(&self) -> f64 {
        self.grid.step
    }

    pub fn defined(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }

    /// Linear interpolation between the two frames around `time`.
    ///
    /// Undefined outside half a step beyond the first and last frame. When one
    /// neighbour is undefined the nearer frame decides.
    pub fn value_at(&self, time: f64) -> Option<f64> {
        if self.values.is_empty() || !time.is_finite() {
            return None;
        }
        let position = (time - self.grid.first_time) / self.grid.step;
        let last = (self.values.len() - 1) as f64;
        if position < -0.5 || position > last + 0.5 {
            return None;
        }
        let position = position.clamp(0.0, last);
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;
        match (self.values[lower], self.values[upper]) {
            (Some(a), Some(b)) => Some(a + (b - a) * weight),
            (Some(a), None) if weight < 0.5 => Some(a),
            (None, Some(b)) if weight >= 0.5 => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contour(values: Vec<Option<f64>>) -> Contour {
        let grid = FrameGrid {
            count: values.len(),
            first_time: 0.1,
            step: 0.1,
        };
        Contour::new(grid, values)
    }

    #[test]
    fn interpolates_between_frames() {
        let c = contour(vec![Some(1.0), Some(3.0), Some(5.0)]);
        assert!((c.value_at(0.15).unwrap() - 2.0).abs() < 1e-9);
        assert!((c.value_at(0.3).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn undefined_outside_range() {
        let c = contour(vec![Some(1.0), Some(3.0)]);
        assert!(c.value_at(0.0).is_none());
        assert!(c.value_at(0.26).is_none());
        assert!(c.value_at(0.06).is_some());
    }

    #[test]
    fn undefined_neighbour_uses_nearest() {
        let c = contour(vec![Some(1.0), None]);
        assert_eq!(c.value_at(0.12), Some(1.0));
        assert_eq!(c.value_at(0.18), None);
        assert_eq!(c.defined().count(), 1);
    }
}
