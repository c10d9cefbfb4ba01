use super::{corner_kind, node_reference_coords, polynomial_degree, CellShapes};
use crate::base::PressureSpace;
use crate::StrError;
use gemlab::mesh::{CellId, Features, Mesh, PointId};
use gemlab::shapes::GeoKind;
use std::collections::BTreeSet;

/// Holds a face (edge in 2D) of a fluid cell lying on the boundary of the fluid domain
#[derive(Clone, Debug)]
pub struct BoundaryFacet {
    /// The cell owning the facet
    pub cell_id: CellId,

    /// The reference direction normal to the facet
    pub axis: usize,

    /// The value (-1 or +1) of the reference coordinate along axis on the facet
    pub sign: f64,

    /// The local indices of the cell nodes on the facet
    pub local_nodes: Vec<usize>,
}

/// Returns the kind shared by all cells or an error
fn unique_kind(mesh: &Mesh) -> Result<GeoKind, StrError> {
    if mesh.cells.len() == 0 {
        return Err("the mesh must have at least one cell");
    }
    if mesh.ndim != 2 && mesh.ndim != 3 {
        return Err("the space dimension must be 2 or 3");
    }
    let kind = mesh.cells[0].kind;
    polynomial_degree(kind)?;
    if kind.ndim() != mesh.ndim {
        return Err("the cell kind is incompatible with the space dimension");
    }
    if mesh.cells.iter().any(|cell| cell.kind != kind) {
        return Err("all cells in the mesh must have the same kind");
    }
    let mut used = vec![false; mesh.points.len()];
    for cell in &mesh.cells {
        for p in &cell.points {
            used[*p] = true;
        }
    }
    if used.iter().any(|u| !u) {
        return Err("all points must belong to at least one cell");
    }
    Ok(kind)
}

/// Collects the cell facets on the boundary (edges in 2D or faces in 3D) found by gemlab
///
/// The facets are sorted by their keys, so the order does not depend on hashing.
fn boundary_facets(features: &Features, mesh: &Mesh, kind: GeoKind) -> Result<Vec<BoundaryFacet>, StrError> {
    let mut shared = Vec::new();
    if mesh.ndim == 2 {
        let mut keys: Vec<_> = features.edges.keys().collect();
        keys.sort();
        for key in keys {
            let cells = features.all_2d_edges.get(key).ok_or("cannot find the cell of a boundary edge")?;
            let (cell_id, e) = cells[0];
            let local_nodes: Vec<_> = (0..kind.edge_nnode()).map(|i| kind.edge_node_id(e, i)).collect();
            shared.push((cell_id, local_nodes));
        }
    } else {
        let mut keys: Vec<_> = features.faces.keys().collect();
        keys.sort();
        for key in keys {
            let cells = features.all_faces.get(key).ok_or("cannot find the cell of a boundary face")?;
            let (cell_id, f) = cells[0];
            let local_nodes: Vec<_> = (0..kind.face_nnode()).map(|i| kind.face_node_id(f, i)).collect();
            shared.push((cell_id, local_nodes));
        }
    }
    let refs = node_reference_coords(kind)?;
    let mut facets = Vec::with_capacity(shared.len());
    for (cell_id, local_nodes) in shared {
        // the facet lies on ξ[axis] = ±1
        let first = &refs[local_nodes[0]];
        let axis = (0..mesh.ndim)
            .find(|i| f64::abs(first[*i]) == 1.0 && local_nodes.iter().all(|m| refs[*m][*i] == first[*i]))
            .ok_or("cannot find the reference axis normal to a boundary facet")?;
        facets.push(BoundaryFacet {
            cell_id,
            axis,
            sign: first[axis],
            local_nodes,
        });
    }
    Ok(facets)
}

/// Holds the degrees-of-freedom of the fluid velocity-pressure field
///
/// The velocity equations are numbered component-wise (eq = c·npoint + p); the pressure
/// equations follow. A continuous pressure has one equation per cell corner, in ascending
/// order of point ids; a discontinuous pressure has nnode_p equations per cell, numbered
/// cell by cell. The local layout of a cell is: velocity c·nnode + m, then pressure
/// ndim·nnode + m.
pub struct FluidSpace {
    /// Space dimension
    pub ndim: usize,

    /// Kind of the velocity cells
    pub kind: GeoKind,

    /// Kind of the cells formed by the corners
    pub kind_p: GeoKind,

    /// Interpolation of the pressure
    pub pressure_space: PressureSpace,

    /// Polynomial degree of the velocity field
    pub degree: usize,

    /// Number of nodes of a velocity cell
    pub nnode: usize,

    /// Number of pressure functions of a cell
    pub nnode_p: usize,

    /// Number of points in the mesh
    pub npoint: usize,

    /// Number of velocity equations
    pub n_dofs_u: usize,

    /// Number of pressure equations
    pub n_dofs_p: usize,

    /// Total number of equations
    pub n_dofs: usize,

    /// Maps a point to its pressure number (if the point is a corner and the pressure is continuous)
    pub pressure_number: Vec<Option<usize>>,

    /// Maps the local equations of each cell to the global equations
    pub local_to_global: Vec<Vec<usize>>,

    /// Holds the facets on the boundary of the domain
    pub boundary_facets: Vec<BoundaryFacet>,

    /// Holds the points on the boundary of the domain (sorted)
    pub boundary_points: Vec<PointId>,

    /// Minimal cell diameter
    pub min_diameter: f64,
}

impl FluidSpace {
    /// Allocates a new instance
    pub fn new(mesh: &Mesh, pressure_space: PressureSpace) -> Result<Self, StrError> {
        let kind = unique_kind(mesh)?;
        let kind_p = corner_kind(kind)?;
        let degree = polynomial_degree(kind)?;
        let ndim = mesh.ndim;
        let nnode = kind.nnode();
        let ncorner = kind_p.nnode();
        let npoint = mesh.points.len();
        let n_dofs_u = ndim * npoint;

        // pressure numbers
        let mut pressure_number = vec![None; npoint];
        let (nnode_p, n_dofs_p) = match pressure_space {
            PressureSpace::Continuous => {
                let mut corners = BTreeSet::new();
                for cell in &mesh.cells {
                    for m in 0..ncorner {
                        corners.insert(cell.points[m]);
                    }
                }
                for (n, p) in corners.iter().enumerate() {
                    pressure_number[*p] = Some(n);
                }
                (ncorner, corners.len())
            }
            PressureSpace::Discontinuous => {
                let nnode_p = if degree == 1 { 1 } else { ndim + 1 };
                (nnode_p, nnode_p * mesh.cells.len())
            }
        };

        // local-to-global maps
        let mut local_to_global = Vec::with_capacity(mesh.cells.len());
        for (e, cell) in mesh.cells.iter().enumerate() {
            let mut l2g = Vec::with_capacity(ndim * nnode + nnode_p);
            for c in 0..ndim {
                for m in 0..nnode {
                    l2g.push(c * npoint + cell.points[m]);
                }
            }
            for m in 0..nnode_p {
                match pressure_space {
                    PressureSpace::Continuous => {
                        let n = pressure_number[cell.points[m]].ok_or("internal error: missing pressure number")?;
                        l2g.push(n_dofs_u + n);
                    }
                    PressureSpace::Discontinuous => l2g.push(n_dofs_u + e * nnode_p + m),
                }
            }
            local_to_global.push(l2g);
        }

        // boundary facets and points
        let features = Features::new(mesh, false);
        let boundary_facets = boundary_facets(&features, mesh, kind)?;
        let mut boundary_points: Vec<_> = features.points.iter().copied().collect();
        boundary_points.sort();

        // minimal diameter
        let mut min_diameter = f64::MAX;
        for cell in &mesh.cells {
            let mut diameter: f64 = 0.0;
            for a in 0..ncorner {
                for b in (a + 1)..ncorner {
                    let xa = &mesh.points[cell.points[a]].coords;
                    let xb = &mesh.points[cell.points[b]].coords;
                    let d2: f64 = (0..ndim).map(|i| (xa[i] - xb[i]) * (xa[i] - xb[i])).sum();
                    diameter = f64::max(diameter, f64::sqrt(d2));
                }
            }
            min_diameter = f64::min(min_diameter, diameter);
        }

        Ok(FluidSpace {
            ndim,
            kind,
            kind_p,
            pressure_space,
            degree,
            nnode,
            nnode_p,
            npoint,
            n_dofs_u,
            n_dofs_p,
            n_dofs: n_dofs_u + n_dofs_p,
            pressure_number,
            local_to_global,
            boundary_facets,
            boundary_points,
            min_diameter,
        })
    }

    /// Returns the number of local equations of a cell
    pub fn n_local(&self) -> usize {
        self.ndim * self.nnode + self.nnode_p
    }

    /// Returns the global velocity equation of a point and component
    pub fn eq_velocity(&self, point_id: PointId, component: usize) -> usize {
        component * self.npoint + point_id
    }

    /// Returns the global pressure equation of a point (if the point is a corner and the pressure is continuous)
    pub fn eq_pressure(&self, point_id: PointId) -> Option<usize> {
        self.pressure_number[point_id].map(|n| self.n_dofs_u + n)
    }

    /// Returns the global equation of the m-th pressure function of a cell
    pub fn eq_pressure_local(&self, cell_id: CellId, m: usize) -> usize {
        self.local_to_global[cell_id][self.ndim * self.nnode + m]
    }

    /// Evaluates the pressure functions at the reference coordinates ksi
    ///
    /// The corner shapes are only used by the continuous pressure.
    pub fn calc_pressure_interp(&self, nn_p: &mut [f64], ksi: &[f64], corners: &mut CellShapes) {
        match self.pressure_space {
            PressureSpace::Continuous => {
                corners.calc_interp(ksi);
                nn_p.copy_from_slice(corners.pad.interp.as_data());
            }
            PressureSpace::Discontinuous => {
                nn_p[0] = 1.0;
                for m in 1..self.nnode_p {
                    nn_p[m] = ksi[m - 1];
                }
            }
        }
    }

    /// Returns the first pressure equation (the gauge equation)
    pub fn first_pressure_dof(&self) -> usize {
        self.n_dofs_u
    }
}

/// Holds the degrees-of-freedom of the structure displacement field
///
/// The equations are numbered component-wise (eq = c·npoint + p) and the local layout
/// of a cell is c·nnode + m.
pub struct SolidSpace {
    /// Space dimension
    pub ndim: usize,

    /// Kind of the cells
    pub kind: GeoKind,

    /// Number of nodes of a cell
    pub nnode: usize,

    /// Number of points in the mesh
    pub npoint: usize,

    /// Total number of equations
    pub n_dofs: usize,

    /// Maps the local equations of each cell to the global equations
    pub local_to_global: Vec<Vec<usize>>,
}

impl SolidSpace {
    /// Allocates a new instance
    pub fn new(mesh: &Mesh) -> Result<Self, StrError> {
        let kind = unique_kind(mesh)?;
        let ndim = mesh.ndim;
        let nnode = kind.nnode();
        let npoint = mesh.points.len();
        let local_to_global = mesh
            .cells
            .iter()
            .map(|cell| {
                let mut l2g = Vec::with_capacity(ndim * nnode);
                for c in 0..ndim {
                    for m in 0..nnode {
                        l2g.push(c * npoint + cell.points[m]);
                    }
                }
                l2g
            })
            .collect();
        Ok(SolidSpace {
            ndim,
            kind,
            nnode,
            npoint,
            n_dofs: ndim * npoint,
            local_to_global,
        })
    }

    /// Returns the number of local equations of a cell
    pub fn n_local(&self) -> usize {
        self.ndim * self.nnode
    }

    /// Returns the global equation of a point and component
    pub fn eq(&self, point_id: PointId, component: usize) -> usize {
        component * self.npoint + point_id
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
