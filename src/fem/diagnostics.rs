use super::{CellShapes, FluidCellData, FluidSpace, GlobalState, Quadrature, SolidCellData, SolidSpace};
use crate::base::IfemError;
use crate::StrError;
use gemlab::mesh::Mesh;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::Path;

/// Holds the quantities derived from an accepted state
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Diagnostics {
    /// Time step index (zero is the initial state)
    pub step: usize,

    /// Time
    pub time: f64,

    /// Net flux ∫ u·n dS across the fluid boundary
    pub boundary_flux: f64,

    /// Measure (area in 2D; volume in 3D) of the structure in the current configuration
    pub structure_area: f64,

    /// Centroid of the structure in the current configuration
    pub structure_centroid: Vec<f64>,
}

/// Defines the collaborator consuming accepted states and their diagnostics
pub trait OutputSink {
    /// Receives an accepted state (called once per output interval)
    fn push(&mut self, state: &GlobalState, diagnostics: &Diagnostics) -> Result<(), IfemError>;
}

/// Records the diagnostics (and optionally the states) in memory
pub struct OutputRecorder {
    /// Keeps a copy of every pushed state
    pub keep_states: bool,

    /// The recorded states (if keep_states)
    pub states: Vec<GlobalState>,

    /// The recorded diagnostics
    pub diagnostics: Vec<Diagnostics>,
}

impl OutputRecorder {
    /// Allocates a new instance
    pub fn new(keep_states: bool) -> Self {
        OutputRecorder {
            keep_states,
            states: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Writes a JSON file with the recorded diagnostics
    ///
    /// # Input
    ///
    /// * `full_path` -- may be a String, &str, or Path
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create file")?;
        serde_json::to_writer(&mut file, &self.diagnostics).map_err(|_| "cannot write file")?;
        Ok(())
    }
}

impl OutputSink for OutputRecorder {
    fn push(&mut self, state: &GlobalState, diagnostics: &Diagnostics) -> Result<(), IfemError> {
        if self.keep_states {
            self.states.push(state.clone());
        }
        self.diagnostics.push(diagnostics.clone());
        Ok(())
    }
}

/// Holds the integration data on one boundary facet
struct FacetData {
    /// The velocity equations of the owner cell (c·nnode + m)
    l2g: Vec<usize>,

    /// Interpolation functions at each facet point
    nn: Vec<Vec<f64>>,

    /// The weighted normal n dS (times the weight) at each facet point
    normal: Vec<Vec<f64>>,
}

/// Integrates the normal velocity over the boundary of the fluid domain
///
/// The outward normal follows from Nanson's formula:
///
/// ```text
/// n dS = ± det(J) J⁻ᵀ e_axis dA
/// ```
///
/// where e_axis is the reference direction normal to the facet.
pub struct BoundaryFlux {
    ndim: usize,
    nnode: usize,
    facets: Vec<FacetData>,
}

impl BoundaryFlux {
    /// Allocates a new instance
    pub fn new(mesh: &Mesh, fluid: &FluidSpace, n_gauss: usize) -> Result<Self, StrError> {
        let (ndim, nnode) = (fluid.ndim, fluid.nnode);
        let quad = Quadrature::gauss(ndim - 1, n_gauss)?;
        let mut facets = Vec::with_capacity(fluid.boundary_facets.len());
        let mut ksi = vec![0.0; ndim];
        for facet in &fluid.boundary_facets {
            let mut shapes = CellShapes::new(mesh, &mesh.cells[facet.cell_id])?;
            let mut data = FacetData {
                l2g: fluid.local_to_global[facet.cell_id][..(ndim * nnode)].to_vec(),
                nn: Vec::with_capacity(quad.len()),
                normal: Vec::with_capacity(quad.len()),
            };
            for q in 0..quad.len() {
                let mut k = 0;
                for i in 0..ndim {
                    if i == facet.axis {
                        ksi[i] = facet.sign;
                    } else {
                        ksi[i] = quad.points[q][k];
                        k += 1;
                    }
                }
                let det = shapes.calc_jacobian(&ksi)?;
                shapes.calc_interp(&ksi);
                let normal = (0..ndim)
                    .map(|i| facet.sign * det * shapes.inv_jacobian.get(facet.axis, i) * quad.weights[q])
                    .collect();
                data.nn.push(shapes.pad.interp.as_data().to_vec());
                data.normal.push(normal);
            }
            facets.push(data);
        }
        Ok(BoundaryFlux { ndim, nnode, facets })
    }

    /// Computes ∫ u·n dS given the fluid block of the state
    pub fn calculate(&self, fluid: &Vector) -> f64 {
        let mut flux = 0.0;
        for facet in &self.facets {
            for q in 0..facet.nn.len() {
                for i in 0..self.ndim {
                    let mut u = 0.0;
                    for m in 0..self.nnode {
                        u += facet.nn[q][m] * fluid[facet.l2g[i * self.nnode + m]];
                    }
                    flux += u * facet.normal[q][i];
                }
            }
        }
        flux
    }
}

/// Returns the determinant of a 2×2 or 3×3 matrix
fn determinant(a: &Matrix) -> f64 {
    match a.dims().0 {
        2 => a.get(0, 0) * a.get(1, 1) - a.get(0, 1) * a.get(1, 0),
        _ => {
            a.get(0, 0) * (a.get(1, 1) * a.get(2, 2) - a.get(1, 2) * a.get(2, 1))
                - a.get(0, 1) * (a.get(1, 0) * a.get(2, 2) - a.get(1, 2) * a.get(2, 0))
                + a.get(0, 2) * (a.get(1, 0) * a.get(2, 1) - a.get(1, 1) * a.get(2, 0))
        }
    }
}

/// Computes the measure and the centroid of the structure in the current configuration
///
/// Returns `(area, centroid)` with area = ∫ det(F) dX and centroid = (1/area) ∫ (X + w) det(F) dX.
pub fn structure_measure(data: &[SolidCellData], space: &SolidSpace, w: &Vector) -> (f64, Vec<f64>) {
    let ndim = space.ndim;
    let mut ff = Matrix::new(ndim, ndim);
    let mut w_p = vec![0.0; ndim];
    let mut area = 0.0;
    let mut centroid = vec![0.0; ndim];
    for (e, cell_data) in data.iter().enumerate() {
        let l2g = &space.local_to_global[e];
        for p in 0..cell_data.n_points() {
            cell_data.deformation_gradient(&mut ff, p, l2g, w);
            cell_data.displacement(&mut w_p, p, l2g, w);
            let dv = determinant(&ff) * cell_data.jxw[p];
            area += dv;
            for i in 0..ndim {
                centroid[i] += (cell_data.xx[p][i] + w_p[i]) * dv;
            }
        }
    }
    if area != 0.0 {
        for i in 0..ndim {
            centroid[i] /= area;
        }
    }
    (area, centroid)
}

/// Defines a closed-form solution of the fluid fields
pub trait ExactSolution {
    /// Calculates the velocity at x
    fn velocity(&self, u: &mut [f64], x: &[f64]);

    /// Calculates the velocity gradient ∂uᵢ/∂xⱼ at x
    fn velocity_gradient(&self, grad: &mut Matrix, x: &[f64]);

    /// Returns the pressure at x
    fn pressure(&self, x: &[f64]) -> f64;
}

/// Holds the norms of the error with respect to an exact solution
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ErrorNorms {
    /// L2 norm of the velocity error
    pub l2_velocity: f64,

    /// H1 seminorm of the velocity error
    pub h1_velocity: f64,

    /// L2 norm of the pressure error
    pub l2_pressure: f64,
}

/// Computes the error norms of the fluid fields over the fluid mesh
pub fn error_norms(data: &[FluidCellData], space: &FluidSpace, fluid: &Vector, exact: &dyn ExactSolution) -> ErrorNorms {
    let (ndim, nnode, nnode_p) = (space.ndim, space.nnode, space.nnode_p);
    let mut u = vec![0.0; ndim];
    let mut grad = Matrix::new(ndim, ndim);
    let (mut l2_u, mut h1_u, mut l2_p) = (0.0, 0.0, 0.0);
    for (e, cell_data) in data.iter().enumerate() {
        let l2g = &space.local_to_global[e];
        for p in 0..cell_data.jxw.len() {
            let x = &cell_data.xx[p];
            let jxw = cell_data.jxw[p];
            exact.velocity(&mut u, x);
            exact.velocity_gradient(&mut grad, x);
            for i in 0..ndim {
                let mut u_h = 0.0;
                for m in 0..nnode {
                    u_h += cell_data.nn[p][m] * fluid[l2g[i * nnode + m]];
                }
                l2_u += (u_h - u[i]) * (u_h - u[i]) * jxw;
                for j in 0..ndim {
                    let mut g_h = 0.0;
                    for m in 0..nnode {
                        g_h += cell_data.gg[p].get(m, j) * fluid[l2g[i * nnode + m]];
                    }
                    let diff = g_h - grad.get(i, j);
                    h1_u += diff * diff * jxw;
                }
            }
            let mut p_h = 0.0;
            for m in 0..nnode_p {
                p_h += cell_data.nn_p[p][m] * fluid[l2g[ndim * nnode + m]];
            }
            let diff = p_h - exact.pressure(x);
            l2_p += diff * diff * jxw;
        }
    }
    ErrorNorms {
        l2_velocity: f64::sqrt(l2_u),
        h1_velocity: f64::sqrt(h1_u),
        l2_pressure: f64::sqrt(l2_p),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{error_norms, structure_measure, BoundaryFlux, Diagnostics, ExactSolution, OutputRecorder, OutputSink};
    use crate::base::{PressureSpace, SampleMeshes};
    use crate::fem::{BlockVector, FluidCellData, FluidSpace, GlobalState, Quadrature, SolidCellData, SolidSpace};
    use gemlab::shapes::GeoKind;
    use russell_lab::{approx_eq, Matrix, Vector};

    #[test]
    fn boundary_flux_works() {
        let mesh = SampleMeshes::rectangle(GeoKind::Qua9, 2, 2, 0.0, 2.0, 0.0, 1.0).unwrap();
        let fluid = FluidSpace::new(&mesh, PressureSpace::Continuous).unwrap();
        let flux = BoundaryFlux::new(&mesh, &fluid, 3).unwrap();
        // u = (x, 0) ⇒ ∫ u·n dS = 2 × 1 (right side only)
        let mut u = Vector::new(fluid.n_dofs);
        for p in 0..fluid.npoint {
            u[fluid.eq_velocity(p, 0)] = mesh.points[p].coords[0];
        }
        approx_eq(flux.calculate(&u), 2.0, 1e-14);
        // u = (1, 1) is divergence-free ⇒ zero net flux
        u.fill(0.0);
        for p in 0..fluid.npoint {
            u[fluid.eq_velocity(p, 0)] = 1.0;
            u[fluid.eq_velocity(p, 1)] = 1.0;
        }
        approx_eq(flux.calculate(&u), 0.0, 1e-14);
    }

    #[test]
    fn boundary_flux_works_3d() {
        let mesh = SampleMeshes::block(2, 1, 1, &[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]).unwrap();
        let fluid = FluidSpace::new(&mesh, PressureSpace::Continuous).unwrap();
        let flux = BoundaryFlux::new(&mesh, &fluid, 2).unwrap();
        // u = (0, 0, z) ⇒ flux through the top face z = 1
        let mut u = Vector::new(fluid.n_dofs);
        for p in 0..fluid.npoint {
            u[fluid.eq_velocity(p, 2)] = mesh.points[p].coords[2];
        }
        approx_eq(flux.calculate(&u), 1.0, 1e-14);
    }

    #[test]
    fn structure_measure_works() {
        let mesh = SampleMeshes::rectangle(GeoKind::Qua4, 2, 1, 0.0, 2.0, 0.0, 1.0).unwrap();
        let space = SolidSpace::new(&mesh).unwrap();
        let data = SolidCellData::all(&mesh, &Quadrature::gauss(2, 2).unwrap()).unwrap();
        let mut w = Vector::new(space.n_dofs);
        let (area, centroid) = structure_measure(&data, &space, &w);
        approx_eq(area, 2.0, 1e-15);
        approx_eq(centroid[0], 1.0, 1e-15);
        approx_eq(centroid[1], 0.5, 1e-15);
        // w = (0.5 x + 1, 0) ⇒ stretched by 1.5 and shifted by 1
        for p in 0..space.npoint {
            w[space.eq(p, 0)] = 0.5 * mesh.points[p].coords[0] + 1.0;
        }
        let (area, centroid) = structure_measure(&data, &space, &w);
        approx_eq(area, 3.0, 1e-14);
        approx_eq(centroid[0], 2.5, 1e-14);
        approx_eq(centroid[1], 0.5, 1e-14);
    }

    struct Linear;

    impl ExactSolution for Linear {
        fn velocity(&self, u: &mut [f64], x: &[f64]) {
            u[0] = x[1];
            u[1] = 0.0;
        }
        fn velocity_gradient(&self, grad: &mut Matrix, _x: &[f64]) {
            grad.fill(0.0);
            grad.set(0, 1, 1.0);
        }
        fn pressure(&self, x: &[f64]) -> f64 {
            x[0]
        }
    }

    #[test]
    fn error_norms_work() {
        let mesh = SampleMeshes::rectangle(GeoKind::Qua9, 2, 2, 0.0, 1.0, 0.0, 1.0).unwrap();
        let space = FluidSpace::new(&mesh, PressureSpace::Continuous).unwrap();
        let quad = Quadrature::gauss(2, 4).unwrap();
        let data: Vec<_> = mesh
            .cells
            .iter()
            .map(|cell| FluidCellData::new(&mesh, cell, &quad, &space).unwrap())
            .collect();
        // the exact solution is interpolated exactly
        let mut fluid = Vector::new(space.n_dofs);
        for p in 0..space.npoint {
            let x = &mesh.points[p].coords;
            fluid[space.eq_velocity(p, 0)] = x[1];
            if let Some(eq) = space.eq_pressure(p) {
                fluid[eq] = x[0];
            }
        }
        let norms = error_norms(&data, &space, &fluid, &Linear);
        approx_eq(norms.l2_velocity, 0.0, 1e-14);
        approx_eq(norms.h1_velocity, 0.0, 1e-13);
        approx_eq(norms.l2_pressure, 0.0, 1e-14);
        // zero numerical solution: ‖p‖ = sqrt(∫ x² dΩ) = sqrt(1/3)
        fluid.fill(0.0);
        let norms = error_norms(&data, &space, &fluid, &Linear);
        approx_eq(norms.l2_velocity, f64::sqrt(1.0 / 3.0), 1e-14);
        approx_eq(norms.h1_velocity, 1.0, 1e-14);
        approx_eq(norms.l2_pressure, f64::sqrt(1.0 / 3.0), 1e-14);

        // discontinuous pressure: p = x_center + 0.25 ξ₀ on each cell
        let space = FluidSpace::new(&mesh, PressureSpace::Discontinuous).unwrap();
        let data: Vec<_> = mesh
            .cells
            .iter()
            .map(|cell| FluidCellData::new(&mesh, cell, &quad, &space).unwrap())
            .collect();
        let mut fluid = Vector::new(space.n_dofs);
        for p in 0..space.npoint {
            fluid[space.eq_velocity(p, 0)] = mesh.points[p].coords[1];
        }
        for (e, cell) in mesh.cells.iter().enumerate() {
            let x_center = mesh.points[cell.points[8]].coords[0];
            fluid[space.eq_pressure_local(e, 0)] = x_center;
            fluid[space.eq_pressure_local(e, 1)] = 0.25;
        }
        let norms = error_norms(&data, &space, &fluid, &Linear);
        approx_eq(norms.l2_velocity, 0.0, 1e-14);
        approx_eq(norms.l2_pressure, 0.0, 1e-14);
    }

    #[test]
    fn output_recorder_works() {
        let state = GlobalState {
            time: 0.5,
            step: 5,
            current: BlockVector::new(2, 1),
            previous: BlockVector::new(2, 1),
        };
        let diagnostics = Diagnostics {
            step: 5,
            time: 0.5,
            boundary_flux: 0.0,
            structure_area: 1.0,
            structure_centroid: vec![0.5, 0.5],
        };
        let mut recorder = OutputRecorder::new(true);
        recorder.push(&state, &diagnostics).unwrap();
        assert_eq!(recorder.states.len(), 1);
        assert_eq!(recorder.diagnostics[0].step, 5);
        let json = serde_json::to_string(&recorder.diagnostics).unwrap();
        assert_eq!(
            json,
            r#"[{"step":5,"time":0.5,"boundary_flux":0.0,"structure_area":1.0,"structure_centroid":[0.5,0.5]}]"#
        );
        let mut recorder = OutputRecorder::new(false);
        recorder.push(&state, &diagnostics).unwrap();
        assert_eq!(recorder.states.len(), 0);
        assert_eq!(recorder.diagnostics.len(), 1);
    }
}
