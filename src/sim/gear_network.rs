//! Gear network: connect the drive gear to the output gear
//!
//! The player places gears from a capped inventory on an empty grid. Running
//! the network propagates rotation breadth-first from the source; meshing
//! gears turn in opposite directions. A gear asked to turn both ways jams.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::puzzle::{Puzzle, PuzzleContext, Verdict};
use super::state::{Failure, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: usize,
    pub col: usize,
}

impl Coord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRole {
    Source,
    Sink,
    Placed,
    Empty,
}

/// Direction a gear is driven in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spin {
    Clockwise,
    CounterClockwise,
}

impl Spin {
    pub fn opposite(self) -> Self {
        match self {
            Spin::Clockwise => Spin::CounterClockwise,
            Spin::CounterClockwise => Spin::Clockwise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Turning(Spin),
    Conflicted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub role: CellRole,
    pub rotation: Rotation,
}

/// Cells connected by meshing
pub trait Topology {
    fn cell_count(&self) -> usize;
    /// Holds any gear (source, sink, or placed)
    fn is_occupied(&self, cell: usize) -> bool;
    fn neighbors(&self, cell: usize) -> Vec<usize>;
}

/// Result of a propagation run, indexed by cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Propagation {
    pub rotations: Vec<Rotation>,
    pub conflict: bool,
}

/// Breadth-first rotation propagation from `source`, run to a fixed point.
///
/// A cell reached with a direction different from the one it already has
/// becomes `Conflicted` and never propagates again.
pub fn propagate<T: Topology>(topology: &T, source: usize) -> Propagation {
    let mut rotations = vec![Rotation::None; topology.cell_count()];
    let mut conflict = false;
    let mut queue = VecDeque::new();
    queue.push_back((source, Spin::Clockwise));

    while let Some((cell, spin)) = queue.pop_front() {
        match rotations[cell] {
            Rotation::Conflicted => continue,
            Rotation::Turning(current) if current == spin => continue,
            Rotation::Turning(_) => {
                rotations[cell] = Rotation::Conflicted;
                conflict = true;
            }
            Rotation::None => {
                rotations[cell] = Rotation::Turning(spin);
                for next in topology.neighbors(cell) {
                    if topology.is_occupied(next) {
                        queue.push_back((next, spin.opposite()));
                    }
                }
            }
        }
    }

    Propagation {
        rotations,
        conflict,
    }
}

/// Why a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NetworkFailure {
    /// Some gear jammed
    Conflict,
    /// Rotation never reached the output gear
    Unreached,
}

impl NetworkFailure {
    pub fn message(self) -> &'static str {
        match self {
            NetworkFailure::Conflict => "Jammed! Two gears are fighting each other.",
            NetworkFailure::Unreached => "The output gear is not moving.",
        }
    }
}

/// Rectangular grid with the source top-left and the sink bottom-right
#[derive(Debug, Clone)]
pub struct GearGrid {
    rows: usize,
    cols: usize,
    cells: Vec<GridCell>,
}

impl GearGrid {
    /// Grids smaller than 2x2 are widened so source and sink stay distinct
    pub fn new(rows: usize, cols: usize) -> Self {
        let (rows, cols) = (rows.max(2), cols.max(2));
        let mut cells = vec![
            GridCell {
                role: CellRole::Empty,
                rotation: Rotation::None,
            };
            rows * cols
        ];
        cells[0].role = CellRole::Source;
        cells[rows * cols - 1].role = CellRole::Sink;
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn source(&self) -> Coord {
        Coord::new(0, 0)
    }

    pub fn sink(&self) -> Coord {
        Coord::new(self.rows - 1, self.cols - 1)
    }

    pub fn index(&self, at: Coord) -> Option<usize> {
        (at.row < self.rows && at.col < self.cols).then(|| at.row * self.cols + at.col)
    }

    pub fn coord(&self, index: usize) -> Coord {
        Coord::new(index / self.cols, index % self.cols)
    }

    pub fn cell(&self, at: Coord) -> Option<&GridCell> {
        self.cells.get(self.index(at)?)
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    fn set_role(&mut self, at: Coord, role: CellRole) {
        if let Some(i) = self.index(at) {
            self.cells[i].role = role;
        }
    }

    pub fn placements(&self) -> Vec<Coord> {
        (0..self.cells.len())
            .filter(|&i| self.cells[i].role == CellRole::Placed)
            .map(|i| self.coord(i))
            .collect()
    }

    pub fn clear_rotations(&mut self) {
        for cell in &mut self.cells {
            cell.rotation = Rotation::None;
        }
    }

    /// Run propagation and store the rotation states in the cells
    pub fn run(&mut self) -> Propagation {
        let result = propagate(&*self, 0);
        for (cell, rotation) in self.cells.iter_mut().zip(&result.rotations) {
            cell.rotation = *rotation;
        }
        result
    }
}

impl Topology for GearGrid {
    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn is_occupied(&self, cell: usize) -> bool {
        self.cells[cell].role != CellRole::Empty
    }

    fn neighbors(&self, cell: usize) -> Vec<usize> {
        let Coord { row, col } = self.coord(cell);
        let mut out = Vec::with_capacity(4);
        if row > 0 {
            out.push(cell - self.cols);
        }
        if row + 1 < self.rows {
            out.push(cell + self.cols);
        }
        if col > 0 {
            out.push(cell - 1);
        }
        if col + 1 < self.cols {
            out.push(cell + 1);
        }
        out
    }
}

/// A player move on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GearMove {
    /// Place on an empty cell, or take back a placed gear
    Toggle(Coord),
}

#[derive(Debug, Clone)]
pub struct GearNetwork {
    grid: GearGrid,
    inventory: u32,
    inventory_max: u32,
    solved: bool,
    /// Failure lockout active
    failure: Option<NetworkFailure>,
}

impl GearNetwork {
    pub fn new(rows: usize, cols: usize, inventory: u32) -> Self {
        Self {
            grid: GearGrid::new(rows, cols),
            inventory,
            inventory_max: inventory,
            solved: false,
            failure: None,
        }
    }

    pub fn grid(&self) -> &GearGrid {
        &self.grid
    }

    pub fn inventory(&self) -> u32 {
        self.inventory
    }

    pub fn inventory_max(&self) -> u32 {
        self.inventory_max
    }

    pub fn failure(&self) -> Option<NetworkFailure> {
        self.failure
    }

    fn place(&mut self, at: Coord) -> bool {
        if self.inventory == 0 {
            return false;
        }
        self.grid.set_role(at, CellRole::Placed);
        self.inventory -= 1;
        true
    }

    fn remove(&mut self, at: Coord) -> bool {
        if self.inventory >= self.inventory_max {
            return false;
        }
        self.grid.set_role(at, CellRole::Empty);
        self.inventory += 1;
        true
    }
}

impl Puzzle for GearNetwork {
    type Save = Vec<Coord>;
    type Move = GearMove;

    const CACHE_KEY: &'static str = "core_gears";
    const STAGE: Stage = Stage::Core;

    fn enter(saved: Option<Vec<Coord>>, solved: bool, ctx: &mut PuzzleContext<'_>) -> Self {
        let budget = ctx.gear_collected.min(ctx.config.gear_inventory_max);
        let mut network = Self::new(ctx.config.gear_rows, ctx.config.gear_cols, budget);

        for at in saved.unwrap_or_default() {
            if network.inventory == 0 {
                break;
            }
            let empty = network
                .grid
                .cell(at)
                .is_some_and(|c| c.role == CellRole::Empty);
            if empty {
                network.place(at);
            }
        }

        if solved {
            network.solved = true;
            network.grid.run();
        }
        network
    }

    fn mutate(&mut self, mv: GearMove) -> bool {
        if self.solved || self.failure.is_some() {
            return false;
        }
        let GearMove::Toggle(at) = mv;
        let Some(role) = self.grid.cell(at).map(|c| c.role) else {
            return false;
        };
        let changed = match role {
            CellRole::Empty => self.place(at),
            CellRole::Placed => self.remove(at),
            CellRole::Source | CellRole::Sink => false,
        };
        if changed {
            self.grid.clear_rotations();
        }
        changed
    }

    fn evaluate(&mut self) -> Verdict {
        if self.solved {
            return Verdict::Replay;
        }
        if self.failure.is_some() {
            return Verdict::Busy;
        }

        let result = self.grid.run();
        let sink = self.grid.index(self.grid.sink()).unwrap_or(0);
        let failure = if result.conflict {
            Some(NetworkFailure::Conflict)
        } else if result.rotations[sink] == Rotation::None {
            Some(NetworkFailure::Unreached)
        } else {
            None
        };

        match failure {
            Some(f) => {
                self.failure = Some(f);
                Verdict::Rejected(Failure::Network(f))
            }
            None => {
                self.solved = true;
                Verdict::Solved
            }
        }
    }

    fn recover(&mut self) {
        self.failure = None;
        self.grid.clear_rotations();
    }

    fn is_solved(&self) -> bool {
        self.solved
    }

    fn save(&self) -> Vec<Coord> {
        self.grid.placements()
    }
}
