use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;
use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::*;

/// A cell that became `Revealed` during a single reveal call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenedCell {
    pub coords: Coord2,
    pub content: CellContent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealResult {
    pub cells_opened: Vec<OpenedCell>,
    pub mine_hit: bool,
}

impl RevealResult {
    pub fn is_empty(&self) -> bool {
        self.cells_opened.is_empty()
    }

    /// Number of safe cells opened, i.e. everything except a triggered mine.
    pub fn safe_count(&self) -> usize {
        self.cells_opened
            .iter()
            .filter(|cell| matches!(cell.content, CellContent::Number(_)))
            .count()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Flagged,
    Unflagged,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// Minesweeper grid with its mine layout and per-cell visibility.
///
/// The layout is fixed once generated, with one exception: the first move may relocate
/// mines out of the clicked neighbourhood, see [`Board::ensure_first_move_safe`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<Cell>,
    mine_count: CellCount,
    /// Revealed non-mine cells.
    revealed_count: CellCount,
    flagged_count: CellCount,
}

impl Board {
    pub fn generate(config: BoardConfig, generator: impl MineGenerator) -> Self {
        Self::from_mine_mask(generator.generate(config))
    }

    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mut cells = mine_mask.mapv(|is_mine| Cell {
            is_mine,
            ..Cell::default()
        });
        let mine_count = mine_mask.iter().filter(|&&is_mine| is_mine).count() as CellCount;

        for ((row, col), &is_mine) in mine_mask.indexed_iter() {
            if !is_mine {
                continue;
            }
            for pos in mine_mask.iter_neighbors(from_nd_index((row, col))) {
                cells[pos.to_nd_index()].adjacent_count += 1;
            }
        }

        Self {
            cells,
            mine_count,
            revealed_count: 0,
            flagged_count: 0,
        }
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= size.0 || coords.1 >= size.1 {
                return Err(BoardError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn size(&self) -> Coord2 {
        from_nd_index(self.cells.dim())
    }

    pub fn rows(&self) -> Coord {
        self.size().0
    }

    pub fn cols(&self) -> Coord {
        self.size().1
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn flagged_count(&self) -> CellCount {
        self.flagged_count
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.cells.len() as CellCount - self.mine_count
    }

    pub fn in_bounds(&self, coords: Coord2) -> bool {
        let (rows, cols) = self.size();
        coords.0 < rows && coords.1 < cols
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if self.in_bounds(coords) {
            Ok(coords)
        } else {
            Err(BoardError::InvalidCoords)
        }
    }

    pub fn cell_at(&self, coords: Coord2) -> Option<Cell> {
        self.cells.get(coords.to_nd_index()).copied()
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self.cell_at(coords).is_some_and(|cell| cell.is_mine)
    }

    pub fn mine_positions(&self) -> Vec<Coord2> {
        self.cells
            .indexed_iter()
            .filter(|(_, cell)| cell.is_mine)
            .map(|(index, _)| from_nd_index(index))
            .collect()
    }

    /// Cells in row-major order.
    pub fn rows_iter(&self) -> impl Iterator<Item = impl Iterator<Item = Cell> + '_> + '_ {
        self.cells.rows().into_iter().map(|row| row.into_iter().copied())
    }

    /// Moves any mine on `coords` or its neighbours to a random cell outside that zone.
    ///
    /// Returns the number of relocated mines. The mine count is preserved.
    pub fn ensure_first_move_safe<R: Rng + ?Sized>(
        &mut self,
        coords: Coord2,
        rng: &mut R,
    ) -> Result<CellCount> {
        let coords = self.validate_coords(coords)?;
        let mut zone = BTreeSet::from([coords]);
        zone.extend(self.cells.iter_neighbors(coords));

        let offending: Vec<Coord2> = zone
            .iter()
            .copied()
            .filter(|&pos| self.contains_mine(pos))
            .collect();
        if offending.is_empty() {
            return Ok(0);
        }

        let mut mine_mask = self.cells.mapv(|cell| cell.is_mine);
        for &pos in &offending {
            mine_mask[pos.to_nd_index()] = false;
        }

        let needed = offending.len() as CellCount;
        let free_cells = mine_mask
            .indexed_iter()
            .filter(|&(index, &is_mine)| !is_mine && !zone.contains(&from_nd_index(index)))
            .count();
        if free_cells < usize::from(needed) {
            return Err(BoardError::InvariantViolation);
        }

        let placed = place_mines(&mut mine_mask, needed, rng, |pos| zone.contains(&pos));
        if placed != needed {
            return Err(BoardError::InvariantViolation);
        }

        log::debug!(
            "Relocated {} mine(s) away from first move at {:?}",
            needed,
            coords
        );
        self.relayout(&mine_mask);
        Ok(needed)
    }

    /// Applies a new mine mask, keeping every cell's visibility and recounting adjacency.
    fn relayout(&mut self, mine_mask: &Array2<bool>) {
        let fresh = Self::from_mine_mask(mine_mask.clone());
        for (cell, fresh_cell) in self.cells.iter_mut().zip(fresh.cells.iter()) {
            cell.is_mine = fresh_cell.is_mine;
            cell.adjacent_count = fresh_cell.adjacent_count;
        }
        self.mine_count = fresh.mine_count;
    }

    /// Reveals `coords`, flood-filling through zero-count cells.
    ///
    /// Out-of-bounds, already revealed and flagged cells yield an empty result.
    pub fn reveal(&mut self, coords: Coord2) -> RevealResult {
        let mut result = RevealResult::default();
        let Some(cell) = self.cell_at(coords) else {
            return result;
        };
        if cell.state != CellState::Hidden {
            return result;
        }

        if cell.is_mine {
            self.cells[coords.to_nd_index()].state = CellState::Revealed;
            result.mine_hit = true;
            result.cells_opened.push(OpenedCell {
                coords,
                content: CellContent::Mine,
            });
            return result;
        }

        self.open_safe_cell(coords, &mut result);
        if cell.adjacent_count != 0 {
            return result;
        }

        let mut visited = BTreeSet::from([coords]);
        let mut to_visit: VecDeque<Coord2> = self.hidden_neighbors(coords).collect();

        while let Some(visit_coords) = to_visit.pop_front() {
            if !visited.insert(visit_coords) {
                continue;
            }

            let visit_cell = self.cells[visit_coords.to_nd_index()];
            if visit_cell.state != CellState::Hidden || visit_cell.is_mine {
                continue;
            }

            self.open_safe_cell(visit_coords, &mut result);

            if visit_cell.adjacent_count == 0 {
                to_visit.extend(
                    self.hidden_neighbors(visit_coords)
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }

        result
    }

    fn open_safe_cell(&mut self, coords: Coord2, result: &mut RevealResult) {
        let cell = &mut self.cells[coords.to_nd_index()];
        cell.state = CellState::Revealed;
        self.revealed_count += 1;
        result.cells_opened.push(OpenedCell {
            coords,
            content: CellContent::Number(cell.adjacent_count),
        });
    }

    fn hidden_neighbors(&self, coords: Coord2) -> impl Iterator<Item = Coord2> + '_ {
        self.cells
            .iter_neighbors(coords)
            .filter(|&pos| self.cells[pos.to_nd_index()].state == CellState::Hidden)
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> FlagOutcome {
        let Some(cell) = self.cells.get_mut(coords.to_nd_index()) else {
            return FlagOutcome::NoChange;
        };

        match cell.state {
            CellState::Hidden => {
                cell.state = CellState::Flagged;
                self.flagged_count += 1;
                FlagOutcome::Flagged
            }
            CellState::Flagged => {
                cell.state = CellState::Hidden;
                self.flagged_count -= 1;
                FlagOutcome::Unflagged
            }
            CellState::Revealed => FlagOutcome::NoChange,
        }
    }

    /// True once every non-mine cell is revealed. Flags play no part.
    pub fn is_won(&self) -> bool {
        self.revealed_count == self.safe_cell_count()
    }
}
