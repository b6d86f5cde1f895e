use tilescape_common::CellCoord;

/// Cell under a picked ground point.
///
/// The point is nudged by `bias` before rounding so positions exactly on a
/// cell edge resolve toward the cursor side of the screen: z always moves
/// back, x moves left when the cursor is on the left half of the window and
/// right otherwise. Each axis then rounds half away from zero.
pub fn pick_cell(
    world_x: f32,
    world_z: f32,
    cursor_left_half: bool,
    tile_size: f32,
    bias: f32,
) -> CellCoord {
    let x = if cursor_left_half {
        world_x - bias
    } else {
        world_x + bias
    };
    let z = world_z - bias;
    CellCoord::new(round_to_cell(x, tile_size), round_to_cell(z, tile_size))
}

fn round_to_cell(v: f32, tile_size: f32) -> i32 {
    let half = tile_size / 2.0;
    let shifted = if v > 0.0 { v + half } else { v - half };
    // Truncating division of the truncated value.
    (shifted.trunc() / tile_size).trunc() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f32 = 16.0;
    const BIAS: f32 = 0.01;

    #[test]
    fn centre_of_cell_picks_it() {
        assert_eq!(pick_cell(32.0, -48.0, true, TILE, BIAS), CellCoord::new(2, -3));
        assert_eq!(pick_cell(0.0, 0.0, false, TILE, BIAS), CellCoord::new(0, 0));
    }

    #[test]
    fn rounds_to_nearest_cell_centre() {
        assert_eq!(pick_cell(7.0, 7.0, false, TILE, BIAS), CellCoord::new(0, 0));
        assert_eq!(pick_cell(9.0, 9.0, false, TILE, BIAS), CellCoord::new(1, 1));
        assert_eq!(pick_cell(-9.0, -9.0, false, TILE, BIAS), CellCoord::new(-1, -1));
        assert_eq!(pick_cell(-7.0, -7.0, false, TILE, BIAS), CellCoord::new(0, 0));
    }

    #[test]
    fn edge_resolves_toward_cursor_side() {
        // Exactly between cell 0 and cell 1 on x.
        assert_eq!(pick_cell(8.0, 0.0, true, TILE, BIAS).x, 0);
        assert_eq!(pick_cell(8.0, 0.0, false, TILE, BIAS).x, 1);
        // z always biases backwards.
        assert_eq!(pick_cell(0.0, 8.0, false, TILE, BIAS).z, 0);
        assert_eq!(pick_cell(0.0, -8.0, false, TILE, BIAS).z, -1);
    }

    #[test]
    fn truncation_matches_integer_division() {
        // (int)(23.5 + 8) = 31, 31 / 16 = 1
        assert_eq!(pick_cell(23.5, 0.0, false, TILE, 0.0).x, 1);
        // (int)(-23.5 - 8) = -31, -31 / 16 = -1
        assert_eq!(pick_cell(-23.5, 0.0, false, TILE, 0.0).x, -1);
        assert_eq!(pick_cell(24.5, 0.0, false, TILE, 0.0).x, 2);
    }
}
