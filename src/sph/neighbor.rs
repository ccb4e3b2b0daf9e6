
use crate::math::{Real, VectorN};

/// Single neighbor of a particle, as seen from the particle itself.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Neighbor<T: Real, const D: usize> {
    /// Index of the neighbor in its source body.
    pub j: usize,
    pub w_ij: T,
    pub dw_ij: T,
    /// Distance between the particles.
    pub r_ij: T,
    /// Unit direction pointing from the neighbor towards the particle.
    pub e_ij: VectorN<T, D>,
}

/// Neighbor records of one particle within one relation.
///
/// Storage is reused between substeps: `clear` only resets `current_size`,
/// so after a refill only the first `current_size` records are valid.
#[derive(Clone, Debug)]
pub struct Neighborhood<T: Real, const D: usize> {
    current_size: usize,
    j: Vec<usize>,
    w_ij: Vec<T>,
    dw_ij: Vec<T>,
    r_ij: Vec<T>,
    e_ij: Vec<VectorN<T, D>>,
}

impl<T: Real, const D: usize> Neighborhood<T, D> {
    pub fn new() -> Self {
        Neighborhood {
            current_size: 0,
            j: Vec::new(),
            w_ij: Vec::new(),
            dw_ij: Vec::new(),
            r_ij: Vec::new(),
            e_ij: Vec::new(),
        }
    }

    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// Number of records which can be stored without reallocating.
    pub fn capacity(&self) -> usize {
        self.j.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current_size == 0
    }

    pub fn clear(&mut self) {
        self.current_size = 0;
    }

    pub fn push(&mut self, neighbor: Neighbor<T, D>) {
        let n = self.current_size;
        if n < self.j.len() {
            self.j[n] = neighbor.j;
            self.w_ij[n] = neighbor.w_ij;
            self.dw_ij[n] = neighbor.dw_ij;
            self.r_ij[n] = neighbor.r_ij;
            self.e_ij[n] = neighbor.e_ij;
        } else {
            self.j.push(neighbor.j);
            self.w_ij.push(neighbor.w_ij);
            self.dw_ij.push(neighbor.dw_ij);
            self.r_ij.push(neighbor.r_ij);
            self.e_ij.push(neighbor.e_ij);
        }
        self.current_size += 1;
    }

    pub fn get(&self, n: usize) -> Option<Neighbor<T, D>> {
        if n >= self.current_size {
            return None;
        }

        Some(Neighbor {
            j: self.j[n],
            w_ij: self.w_ij[n],
            dw_ij: self.dw_ij[n],
            r_ij: self.r_ij[n],
            e_ij: self.e_ij[n],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Neighbor<T, D>> + '_ {
        (0..self.current_size).filter_map(move |n| self.get(n))
    }

    pub fn j(&self) -> &[usize] {
        &self.j[..self.current_size]
    }
}

impl<T: Real, const D: usize> Default for Neighborhood<T, D> {
    fn default() -> Self {
        Neighborhood::new()
    }
}

pub trait NeighborSearch<T: Real, const D: usize>: Sync {
    fn build(&mut self, positions: &[VectorN<T, D>]);

    /// Apply function to each candidate neighbor of a position.
    fn for_each_candidate<F>(&self, position: &VectorN<T, D>, fnc: F)
    where
        F: FnMut(usize);
}

/// Visits every source particle.
///
/// Quadratic, intended for small systems and tests.
#[derive(Clone, Debug, Default)]
pub struct AllPairs {
    num_particles: usize,
}

impl AllPairs {
    pub fn new() -> Self {
        AllPairs::default()
    }
}

impl<T: Real, const D: usize> NeighborSearch<T, D> for AllPairs {
    fn build(&mut self, positions: &[VectorN<T, D>]) {
        self.num_particles = positions.len();
    }

    fn for_each_candidate<F>(&self, _position: &VectorN<T, D>, mut fnc: F)
    where
        F: FnMut(usize),
    {
        for p in 0..self.num_particles {
            fnc(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::Vector2;

    fn neighbor(j: usize, r_ij: f64) -> Neighbor<f64, 2> {
        Neighbor {
            j,
            w_ij: 1.0,
            dw_ij: -1.0,
            r_ij,
            e_ij: Vector2::new(1.0, 0.0),
        }
    }

    #[test]
    fn storage_is_reused() {
        let mut neighborhood = Neighborhood::new();
        for j in 0..3 {
            neighborhood.push(neighbor(j, 0.1 * j as f64));
        }
        assert_eq!(neighborhood.current_size(), 3);

        neighborhood.clear();
        neighborhood.push(neighbor(7, 0.5));

        assert_eq!(neighborhood.current_size(), 1);
        assert_eq!(neighborhood.capacity(), 3);
        assert_eq!(neighborhood.j(), &[7]);
        assert!(neighborhood.get(1).is_none());

        let records: Vec<_> = neighborhood.iter().collect();
        assert_eq!(records, vec![neighbor(7, 0.5)]);
    }

    #[test]
    fn all_pairs_visits_everything() {
        let positions = vec![Vector2::new(0.0, 0.0), Vector2::new(5.0, 0.0), Vector2::new(9.0, 9.0)];
        let mut search = AllPairs::new();
        NeighborSearch::<f64, 2>::build(&mut search, &positions);

        let mut visited = Vec::new();
        search.for_each_candidate(&positions[0], |p| visited.push(p));
        assert_eq!(visited, vec![0, 1, 2]);
    }
}
