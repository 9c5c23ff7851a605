//! Breadth-first router used by the simulation pass.

use std::collections::VecDeque;

use chrono_weave_core::{CellCoord, Direction, Grid};

/// Reusable breadth-first search workspace that routes sources to targets.
///
/// Every cell except a source is traversable, including empty cells, so a
/// route never depends on an unbroken chain of conduits. Neighbours are
/// expanded in [`Direction::ROUTING_ORDER`], which makes the chosen route
/// deterministic whenever several shortest routes exist.
#[derive(Clone, Debug, Default)]
pub(crate) struct Router {
    size: u32,
    parents: Vec<Option<CellCoord>>,
    visited: Vec<bool>,
    queue: VecDeque<CellCoord>,
}

impl Router {
    /// Finds the shortest route from `start` to the nearest target.
    ///
    /// On success `out` holds the route including both endpoints and the
    /// function returns `true`. When no target is reachable `out` is left
    /// empty.
    pub(crate) fn find_route(
        &mut self,
        grid: &Grid,
        start: CellCoord,
        out: &mut Vec<CellCoord>,
    ) -> bool {
        out.clear();
        self.queue.clear();

        let size = grid.size();
        let Some(start_index) = index(size, start) else {
            return false;
        };

        self.size = size;
        let side = usize::try_from(size).unwrap_or(0);
        let cell_count = side.saturating_mul(side);
        if self.visited.len() != cell_count {
            self.visited = vec![false; cell_count];
            self.parents = vec![None; cell_count];
        } else {
            self.visited.fill(false);
            self.parents.fill(None);
        }

        self.visited[start_index] = true;
        self.queue.push_back(start);

        while let Some(cell) = self.queue.pop_front() {
            if grid.cell(cell).is_some_and(|state| state.is_target()) {
                self.trace(start, cell, out);
                return true;
            }

            for direction in Direction::ROUTING_ORDER {
                let Some(neighbor) = cell.step(direction, size) else {
                    continue;
                };
                let Some(neighbor_index) = index(size, neighbor) else {
                    continue;
                };
                if self.visited[neighbor_index] {
                    continue;
                }
                if grid.cell(neighbor).map_or(true, |state| state.is_source()) {
                    continue;
                }

                self.visited[neighbor_index] = true;
                self.parents[neighbor_index] = Some(cell);
                self.queue.push_back(neighbor);
            }
        }

        false
    }

    fn trace(&self, start: CellCoord, end: CellCoord, out: &mut Vec<CellCoord>) {
        let mut current = end;
        out.push(current);
        while current != start {
            let Some(parent) = index(self.size, current).and_then(|offset| self.parents[offset])
            else {
                break;
            };
            out.push(parent);
            current = parent;
        }
        out.reverse();
    }
}

fn index(size: u32, cell: CellCoord) -> Option<usize> {
    if cell.column() >= size || cell.row() >= size {
        return None;
    }
    let width = usize::try_from(size).ok()?;
    let column = usize::try_from(cell.column()).ok()?;
    let row = usize::try_from(cell.row()).ok()?;
    row.checked_mul(width)?.checked_add(column)
}
