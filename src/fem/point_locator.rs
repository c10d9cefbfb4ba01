use super::CellShapes;
use crate::base::IfemError;
use gemlab::mesh::{CellId, Mesh};
use std::collections::BTreeMap;

/// Relative padding of the bounding boxes of cells
const BOX_PADDING: f64 = 1e-8;

/// Holds the query points owned by one cell
#[derive(Clone, Debug, PartialEq)]
pub struct PointGroup {
    /// The owner cell
    pub cell_id: CellId,

    /// The reference coordinates of the points in the owner cell
    pub ksi: Vec<Vec<f64>>,

    /// The indices of the points in the query list
    pub index: Vec<usize>,
}

/// Finds the cells containing given points using a uniform grid of bins
///
/// Each bin lists the cells whose (padded) bounding box overlaps it, in ascending order of
/// cell ids. A point is owned by the first listed cell containing it; thus, points on
/// boundaries shared by several cells go to the cell with the lowest id.
pub struct PointLocator {
    /// Space dimension
    ndim: usize,

    /// Minimum coordinates of the grid
    min: [f64; 3],

    /// Size of the bins
    size: [f64; 3],

    /// Number of bins along each direction
    ndiv: [usize; 3],

    /// The cells overlapping each bin
    bins: Vec<Vec<CellId>>,

    /// The shapes of each cell (inverse mapping)
    shapes: Vec<CellShapes>,
}

impl PointLocator {
    /// Builds the grid of bins for a mesh
    pub fn build(mesh: &Mesh) -> Result<Self, IfemError> {
        let ndim = mesh.ndim;
        if mesh.cells.len() == 0 || mesh.points.len() == 0 {
            return Err(IfemError::Configuration("the mesh must not be empty".to_string()));
        }

        // bounding boxes
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for i in 0..ndim {
            min[i] = f64::MAX;
            max[i] = f64::MIN;
        }
        let mut boxes = Vec::with_capacity(mesh.cells.len());
        for cell in &mesh.cells {
            let mut c_min = [f64::MAX; 3];
            let mut c_max = [f64::MIN; 3];
            for p in &cell.points {
                for i in 0..ndim {
                    let x = mesh.points[*p].coords[i];
                    c_min[i] = f64::min(c_min[i], x);
                    c_max[i] = f64::max(c_max[i], x);
                }
            }
            for i in 0..ndim {
                min[i] = f64::min(min[i], c_min[i]);
                max[i] = f64::max(max[i], c_max[i]);
            }
            boxes.push((c_min, c_max));
        }
        let mut largest: f64 = 0.0;
        for i in 0..ndim {
            largest = f64::max(largest, max[i] - min[i]);
        }
        let padding = BOX_PADDING * largest;
        for i in 0..ndim {
            min[i] -= padding;
            max[i] += padding;
        }

        // grid with about one cell per bin
        let n = f64::powf(mesh.cells.len() as f64, 1.0 / (ndim as f64)).round() as usize;
        let mut ndiv = [1; 3];
        let mut size = [1.0; 3];
        for i in 0..ndim {
            ndiv[i] = usize::max(1, n);
            size[i] = (max[i] - min[i]) / (ndiv[i] as f64);
        }
        let mut bins = vec![Vec::new(); ndiv[0] * ndiv[1] * ndiv[2]];
        for (cell_id, (c_min, c_max)) in boxes.iter().enumerate() {
            let mut start = [0; 3];
            let mut end = [0; 3];
            for i in 0..ndim {
                start[i] = PointLocator::bin_index(c_min[i] - padding, min[i], size[i], ndiv[i]);
                end[i] = PointLocator::bin_index(c_max[i] + padding, min[i], size[i], ndiv[i]);
            }
            for k in start[2]..=end[2] {
                for j in start[1]..=end[1] {
                    for i in start[0]..=end[0] {
                        bins[i + j * ndiv[0] + k * ndiv[0] * ndiv[1]].push(cell_id);
                    }
                }
            }
        }

        // shapes for the inverse mapping
        let mut shapes = Vec::with_capacity(mesh.cells.len());
        for cell in &mesh.cells {
            shapes.push(CellShapes::new(mesh, cell)?);
        }
        Ok(PointLocator {
            ndim,
            min,
            size,
            ndiv,
            bins,
            shapes,
        })
    }

    /// Returns the bin index along one direction (clamped to the grid)
    fn bin_index(x: f64, min: f64, size: f64, ndiv: usize) -> usize {
        let r = ((x - min) / size).floor();
        if r < 0.0 {
            0
        } else {
            usize::min(r as usize, ndiv - 1)
        }
    }

    /// Finds the owner cell of a point and the reference coordinates therein
    ///
    /// Returns None if no cell contains the point.
    pub fn locate(&mut self, x: &[f64]) -> Result<Option<(CellId, Vec<f64>)>, IfemError> {
        let ndim = self.ndim;
        let mut bin = 0;
        let mut stride = 1;
        for i in 0..ndim {
            let r = (x[i] - self.min[i]) / self.size[i];
            if !r.is_finite() || r < 0.0 || r > self.ndiv[i] as f64 {
                return Ok(None);
            }
            bin += stride * usize::min(r.floor() as usize, self.ndiv[i] - 1);
            stride *= self.ndiv[i];
        }
        let mut ksi = vec![0.0; ndim];
        for cell_id in &self.bins[bin] {
            let shapes = &mut self.shapes[*cell_id];
            if shapes.inverse_map(&mut ksi, x)? && CellShapes::is_inside(&ksi) {
                return Ok(Some((*cell_id, ksi)));
            }
        }
        Ok(None)
    }

    /// Finds the owner cells of a list of points and groups the points by owner
    ///
    /// The groups are sorted by cell id and the points in each group keep the query order.
    pub fn query(&mut self, points: &[Vec<f64>]) -> Result<Vec<PointGroup>, IfemError> {
        let mut groups: BTreeMap<CellId, PointGroup> = BTreeMap::new();
        for (index, x) in points.iter().enumerate() {
            match self.locate(x)? {
                Some((cell_id, ksi)) => {
                    let group = groups.entry(cell_id).or_insert(PointGroup {
                        cell_id,
                        ksi: Vec::new(),
                        index: Vec::new(),
                    });
                    group.ksi.push(ksi);
                    group.index.push(index);
                }
                None => {
                    return Err(IfemError::Geometry(format!(
                        "point {:?} is outside the fluid mesh",
                        x
                    )))
                }
            }
        }
        Ok(groups.into_values().collect())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
