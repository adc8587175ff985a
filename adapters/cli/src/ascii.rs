//! Text rendering of the terrain field.

use dustfield_core::{CellState, GridCoord};
use dustfield_world::{query, World};

/// Renders one character per cell, shifting odd rows to mirror the hex offset.
///
/// `#` solid, `+` regrowing, `:` waiting for a step, `~` fading out, `v`
/// keep-clear, `.` permanently clear.
pub(crate) fn render(world: &World) -> String {
    let dimensions = query::dimensions(world);
    let mut output = String::new();
    for row in 0..dimensions.rows() {
        if row % 2 == 1 {
            output.push(' ');
        }
        for column in 0..dimensions.columns() {
            let cell = GridCoord::new(column as i32, row as i32);
            output.push(glyph(world, cell));
            output.push(' ');
        }
        output.push('\n');
    }
    output
}

fn glyph(world: &World, cell: GridCoord) -> char {
    match query::cell_state(world, cell) {
        Some(CellState::Solid) => '#',
        Some(CellState::Regrowing) => '+',
        Some(CellState::PendingRegrow) => ':',
        Some(CellState::Clearing) => '~',
        Some(CellState::Empty) if query::is_keep_clear(world, cell) => 'v',
        Some(CellState::Empty) if query::is_permanently_clear(world, cell) => '.',
        Some(CellState::Empty) | None => ' ',
    }
}
