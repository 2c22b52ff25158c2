//! Rectangular rapidity × azimuth energy grid.
//!
//! The usual particle source: calorimeter-like cells accumulate deposits and
//! every cell above a small floor becomes one [`Particle`] whose source id is
//! the flat cell index.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{JetError, JetResult};
use crate::particle::{Particle, SourceId};

/// Cells at or below this energy are treated as noise by [`EnergyGrid::to_particles`].
pub const DEFAULT_MIN_CELL_ENERGY: f64 = 0.1;

/// Energy histogram over `rows` rapidity bins and `cols` azimuth bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyGrid {
    rows: usize,
    cols: usize,
    rapidity_range: (f64, f64),
    azimuth_range: (f64, f64),
    cells: Vec<f64>,
}

impl Default for EnergyGrid {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 20,
            rapidity_range: (-4.0, 4.0),
            azimuth_range: (-PI, PI),
            cells: vec![0.0; 400],
        }
    }
}

impl EnergyGrid {
    /// Empty `rows × cols` grid over the default ranges (y ∈ [-4, 4], φ ∈ [-π, π]).
    pub fn new(rows: usize, cols: usize) -> JetResult<Self> {
        Self::with_ranges(rows, cols, (-4.0, 4.0), (-PI, PI))
    }

    pub fn with_ranges(
        rows: usize,
        cols: usize,
        rapidity_range: (f64, f64),
        azimuth_range: (f64, f64),
    ) -> JetResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(JetError::Grid(format!("grid must be non-empty, got {rows}x{cols}")));
        }
        for (name, (lo, hi)) in [("rapidity", rapidity_range), ("azimuth", azimuth_range)] {
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(JetError::Grid(format!("invalid {name} range [{lo}, {hi}]")));
            }
        }
        Ok(Self {
            rows,
            cols,
            rapidity_range,
            azimuth_range,
            cells: vec![0.0; rows * cols],
        })
    }

    /// Grid over the default ranges with the given row-major cell energies.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<f64>) -> JetResult<Self> {
        let mut grid = Self::new(rows, cols)?;
        if cells.len() != rows * cols {
            return Err(JetError::Grid(format!(
                "expected {} cells for a {rows}x{cols} grid, got {}",
                rows * cols,
                cells.len()
            )));
        }
        grid.cells = cells;
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.index(row, col).map(|i| self.cells[i])
    }

    pub fn set(&mut self, row: usize, col: usize, energy: f64) -> JetResult<()> {
        let i = self.index(row, col).ok_or_else(|| {
            JetError::Grid(format!("cell ({row}, {col}) outside {}x{}", self.rows, self.cols))
        })?;
        self.cells[i] = energy;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = 0.0);
    }

    /// Physics coordinates `(rapidity, azimuth)` of a cell's lower edge.
    pub fn cell_position(&self, row: usize, col: usize) -> (f64, f64) {
        let (y0, y1) = self.rapidity_range;
        let (p0, p1) = self.azimuth_range;
        let rapidity = y0 + (row as f64 / self.rows as f64) * (y1 - y0);
        let azimuth = p0 + (col as f64 / self.cols as f64) * (p1 - p0);
        (rapidity, azimuth)
    }

    /// Cell containing `(rapidity, azimuth)`, or `None` outside the grid.
    pub fn cell_of(&self, rapidity: f64, azimuth: f64) -> Option<(usize, usize)> {
        let (y0, y1) = self.rapidity_range;
        let (p0, p1) = self.azimuth_range;
        let fy = ((rapidity - y0) / (y1 - y0) * self.rows as f64).floor();
        let fx = ((azimuth - p0) / (p1 - p0) * self.cols as f64).floor();
        if !(fy >= 0.0 && fx >= 0.0) {
            return None;
        }
        let (row, col) = (fy as usize, fx as usize);
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// Add `energy` to the cell under `(rapidity, azimuth)`.
    /// Returns false (and deposits nothing) when the point is off the grid.
    pub fn deposit(&mut self, rapidity: f64, azimuth: f64, energy: f64) -> bool {
        match self.cell_of(rapidity, azimuth) {
            Some((row, col)) => {
                self.cells[row * self.cols + col] += energy;
                true
            }
            None => {
                log::trace!("deposit at ({rapidity:.3}, {azimuth:.3}) is off the grid");
                false
            }
        }
    }

    pub fn source_id(&self, row: usize, col: usize) -> SourceId {
        SourceId((row * self.cols + col) as u64)
    }

    pub fn total_energy(&self) -> f64 {
        self.cells.iter().sum()
    }

    pub fn max_energy(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }

    /// One particle per cell with energy above `min_energy`, in row-major order.
    pub fn to_particles(&self, min_energy: f64) -> Vec<Particle> {
        let mut particles = Vec::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let energy = self.cells[row * self.cols + col];
                if energy > min_energy {
                    let (rapidity, azimuth) = self.cell_position(row, col);
                    let id = self.source_id(row, col);
                    particles.push(Particle::new(id, rapidity, azimuth, energy));
                }
            }
        }
        log::debug!(
            "grid {}x{}: {} cells above {min_energy}",
            self.rows,
            self.cols,
            particles.len()
        );
        particles
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_validation() {
        assert!(matches!(EnergyGrid::new(0, 4), Err(JetError::Grid(_))));
        assert!(EnergyGrid::with_ranges(4, 4, (1.0, -1.0), (-PI, PI)).is_err());
        assert!(EnergyGrid::from_cells(2, 2, vec![1.0; 3]).is_err());
        assert_eq!(EnergyGrid::default(), EnergyGrid::new(20, 20).unwrap());
    }

    #[test]
    fn test_cell_mapping() {
        let grid = EnergyGrid::new(20, 20).unwrap();
        assert_eq!(grid.cell_position(0, 0), (-4.0, -PI));
        let (y, phi) = grid.cell_position(10, 10);
        assert!(y.abs() < 1e-12 && phi.abs() < 1e-12);
        assert_eq!(grid.cell_of(0.01, 0.01), Some((10, 10)));
        assert_eq!(grid.cell_of(-4.0, -PI), Some((0, 0)));
        assert_eq!(grid.cell_of(4.0, 0.0), None);
        assert_eq!(grid.cell_of(-4.5, 0.0), None);
        assert_eq!(grid.cell_of(f64::NAN, 0.0), None);
    }

    #[test]
    fn test_deposit_accumulates() {
        let mut grid = EnergyGrid::new(10, 10).unwrap();
        assert!(grid.deposit(0.1, 0.1, 2.0));
        assert!(grid.deposit(0.2, 0.2, 3.0));
        assert!(!grid.deposit(9.0, 0.0, 100.0));
        assert_eq!(grid.get(5, 5), Some(5.0));
        assert_eq!(grid.total_energy(), 5.0);
        assert_eq!(grid.max_energy(), 5.0);
        grid.clear();
        assert_eq!(grid.total_energy(), 0.0);
    }

    #[test]
    fn test_to_particles_floor_and_ids() {
        let mut grid = EnergyGrid::new(4, 5).unwrap();
        grid.set(1, 2, 7.5).unwrap();
        grid.set(3, 4, 0.1).unwrap();
        grid.set(0, 0, 0.2).unwrap();
        assert!(grid.set(4, 0, 1.0).is_err());

        let particles = grid.to_particles(DEFAULT_MIN_CELL_ENERGY);
        assert_eq!(particles.len(), 2);
        assert_eq!(particles[0].source_id, SourceId(0));
        assert_eq!(particles[1].source_id, SourceId(7));
        assert_eq!(particles[1].energy, 7.5);
        assert_eq!(particles[1].rapidity, -4.0 + 0.25 * 8.0);
        // Column 0 sits on the branch cut and comes out as +π.
        assert_eq!(particles[0].azimuth, PI);
    }
}
