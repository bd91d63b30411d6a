use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::*;

/// Uniformly random placement over the whole grid. First-move safety is applied later by
/// [`Board::ensure_first_move_safe`], once the first clicked cell is known.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomMineGenerator {
    seed: u64,
}

impl RandomMineGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl MineGenerator for RandomMineGenerator {
    fn generate(self, config: BoardConfig) -> Array2<bool> {
        let total_cells = config.total_cells();

        // optimize for full boards
        if config.mines >= total_cells {
            if config.mines > total_cells {
                log::warn!(
                    "Minefield already full, generated anyway, requested {} but only fits {}",
                    config.mines,
                    total_cells
                );
            }
            return Array2::from_elem(config.size().to_nd_index(), true);
        }

        let mut mask = Array2::default(config.size().to_nd_index());
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let placed = place_mines(&mut mask, config.mines, &mut rng, |_| false);

        if placed != config.mines {
            log::warn!(
                "Generated minefield count mismatch, actual: {}, requested: {}",
                placed,
                config.mines
            );
        }
        mask
    }
}
