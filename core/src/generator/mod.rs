use ndarray::Array2;
use rand::Rng;

use crate::*;
pub use random::*;

mod random;

/// Produces a mine mask for a board of the given configuration.
pub trait MineGenerator {
    fn generate(self, config: BoardConfig) -> Array2<bool>;
}

/// Places up to `count` mines on cells that are neither mined nor excluded, each chosen
/// uniformly among the cells still free at that point. Returns how many were placed.
pub(crate) fn place_mines<R, F>(
    mask: &mut Array2<bool>,
    count: CellCount,
    rng: &mut R,
    is_excluded: F,
) -> CellCount
where
    R: Rng + ?Sized,
    F: Fn(Coord2) -> bool,
{
    let mut free_cells = mask
        .indexed_iter()
        .filter(|&(index, &is_mine)| !is_mine && !is_excluded(from_nd_index(index)))
        .count();
    let mut placed = 0;

    while placed < count && free_cells > 0 {
        let pick = rng.random_range(0..free_cells);
        let target = mask
            .indexed_iter_mut()
            .filter(|(index, is_mine)| !**is_mine && !is_excluded(from_nd_index(*index)))
            .nth(pick);
        let Some((_, cell)) = target else {
            break;
        };
        *cell = true;
        placed += 1;
        free_cells -= 1;
    }

    placed
}
