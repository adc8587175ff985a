//! Periodic polka-dot mask.

use crate::{PatternContext, Placement};

/// Parameters of the periodic dot mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DotParams {
    /// Period of the mask; zero selects nothing.
    pub step: u32,
    /// Shifts the mask along the diagonal.
    pub phase_offset: i32,
}

/// Selects every available cell where `(x + 2y + phase_offset) mod step == 0`.
pub fn periodic_dots(context: &PatternContext<'_>, params: &DotParams) -> Vec<Placement> {
    if params.step == 0 {
        return Vec::new();
    }

    let step = i64::from(params.step);
    let offset = i64::from(params.phase_offset);
    context
        .dimensions()
        .iter()
        .filter(|cell| {
            let value = i64::from(cell.column()) + 2 * i64::from(cell.row()) + offset;
            value.rem_euclid(step) == 0
        })
        .filter(|cell| context.is_available(*cell))
        .map(|cell| context.placement(cell))
        .collect()
}

#[cfg(test)]
mod tests {
    use dustfield_core::{GridCoord, GridDimensions};
    use glam::Vec2;

    use super::*;

    fn to_world(_cell: GridCoord) -> Vec2 {
        Vec2::ZERO
    }

    #[test]
    fn zero_step_selects_nothing() {
        let free = |_cell: GridCoord| true;
        let context = PatternContext::new(GridDimensions::new(5, 5), &free, &to_world);
        let params = DotParams {
            step: 0,
            phase_offset: 0,
        };
        assert!(periodic_dots(&context, &params).is_empty());
    }

    #[test]
    fn negative_offset_wraps_like_positive() {
        let free = |_cell: GridCoord| true;
        let context = PatternContext::new(GridDimensions::new(6, 3), &free, &to_world);
        let shifted = DotParams {
            step: 3,
            phase_offset: -1,
        };
        let equivalent = DotParams {
            step: 3,
            phase_offset: 2,
        };

        assert_eq!(
            periodic_dots(&context, &shifted),
            periodic_dots(&context, &equivalent)
        );
    }

    #[test]
    fn first_row_matches_period() {
        let free = |cell: GridCoord| cell != GridCoord::new(4, 0);
        let context = PatternContext::new(GridDimensions::new(9, 1), &free, &to_world);
        let params = DotParams {
            step: 4,
            phase_offset: 0,
        };

        let columns: Vec<i32> = periodic_dots(&context, &params)
            .iter()
            .map(|placement| placement.cell.column())
            .collect();
        assert_eq!(columns, vec![0, 8]);
    }
}
