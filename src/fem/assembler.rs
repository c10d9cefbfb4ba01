use super::{BlockMatrix, BlockVector, CellShapes, ConstraintEnforcer, ConstraintMap};
use super::{FluidSpace, GaugeAccumulator, ImmersedMapping, PointLocator, PressureGauge, Quadrature};
use super::{SolidCellData, SolidSpace};
use crate::base::{Config, IfemError, ParamImmersed, SolidQuadrature};
use crate::material::ModelStress;
use crate::{FnField, StrError};
use gemlab::mesh::{Cell, Mesh};
use russell_lab::{mat_inverse, Matrix, Vector};

/// Holds the interpolation data at the Gauss points of a fluid cell
pub struct FluidCellData {
    /// Velocity interpolation functions Nᵐ at each Gauss point
    pub nn: Vec<Vec<f64>>,

    /// Pressure interpolation functions at each Gauss point
    pub nn_p: Vec<Vec<f64>>,

    /// Gradients ∂Nᵐ/∂x at each Gauss point (nnode × ndim)
    pub gg: Vec<Matrix>,

    /// Determinant of the Jacobian times the weight at each Gauss point
    pub jxw: Vec<f64>,

    /// Real coordinates of each Gauss point
    pub xx: Vec<Vec<f64>>,
}

impl FluidCellData {
    /// Allocates a new instance
    pub fn new(mesh: &Mesh, cell: &Cell, quad: &Quadrature, fluid: &FluidSpace) -> Result<Self, StrError> {
        let mut shapes = CellShapes::new(mesh, cell)?;
        let mut corners = CellShapes::corners(mesh, cell)?;
        let (ndim, nnode) = (shapes.ndim, shapes.nnode);
        let nip = quad.len();
        let mut data = FluidCellData {
            nn: Vec::with_capacity(nip),
            nn_p: Vec::with_capacity(nip),
            gg: Vec::with_capacity(nip),
            jxw: Vec::with_capacity(nip),
            xx: Vec::with_capacity(nip),
        };
        for p in 0..nip {
            let ksi = &quad.points[p];
            let det = shapes.calc_gradient(ksi)?;
            if det <= 0.0 {
                return Err("the Jacobian of a fluid cell must be positive");
            }
            let mut x = vec![0.0; ndim];
            shapes.calc_coords(&mut x, ksi);
            let mut nn_p = vec![0.0; fluid.nnode_p];
            fluid.calc_pressure_interp(&mut nn_p, ksi, &mut corners);
            let mut g = Matrix::new(nnode, ndim);
            for m in 0..nnode {
                for i in 0..ndim {
                    g.set(m, i, shapes.pad.gradient.get(m, i));
                }
            }
            data.nn.push(shapes.pad.interp.as_data().to_vec());
            data.nn_p.push(nn_p);
            data.gg.push(g);
            data.jxw.push(det * quad.weights[p]);
            data.xx.push(x);
        }
        Ok(data)
    }
}

/// Holds the arguments of one assembly call
pub struct AssemblyArgs<'a> {
    /// The rate ξ′ = (ξ - ξ_prev) / dt
    pub rate: &'a BlockVector,

    /// The current state ξ
    pub state: &'a BlockVector,

    /// The state converged at the previous time step (drives the semi-implicit mapping)
    pub previous: &'a BlockVector,

    /// The coefficient α = 1/dt multiplying ∂R/∂ξ′ in the Jacobian
    pub alpha: f64,

    /// The current time
    pub time: f64,

    /// The prescribed values of the fluid equations
    pub constraints: &'a ConstraintMap,
}

/// Assembles the residual R(ξ′, ξ, t) and the Jacobian ∂R/∂ξ + α ∂R/∂ξ′
///
/// The assembly runs two passes:
///
/// 1. Over the fluid cells: the weak incompressible Navier-Stokes equations
///    (momentum and continuity) and the mean-pressure data.
/// 2. Over the structure cells: the structure stress into the fluid momentum (directly or
///    through the spreading field) and the kinematic equation Φ_B (ẇ - u(X + w)) · y.
///
/// The coupling blocks of the Jacobian have a pattern depending on the current position of
/// the structure; hence, the pattern is rebuilt whenever a Jacobian is requested.
pub struct ResidualJacobianAssembler {
    /// Space dimension
    pub ndim: usize,

    /// Material constants
    param: ParamImmersed,

    /// Freezes the mapping at the previous displacement
    semi_implicit: bool,

    /// Transfers the structure stress via the spreading field
    use_spread: bool,

    /// Body force
    body_force: Option<FnField>,

    /// Fluid degrees-of-freedom
    pub fluid: FluidSpace,

    /// Structure degrees-of-freedom
    pub solid: SolidSpace,

    /// Interpolation data at the Gauss points of fluid cells
    pub fluid_data: Vec<FluidCellData>,

    /// Interpolation data at the integration points of structure cells
    pub solid_data: Vec<SolidCellData>,

    /// Shapes of fluid cells evaluated at the structure points
    fluid_shapes: Vec<CellShapes>,

    /// Finds the fluid cells containing the structure points
    locator: PointLocator,

    /// Maps the structure points to the current configuration
    pub mapping: ImmersedMapping,

    /// Stress model of the structure
    model: ModelStress,

    /// Imposes prescribed values and the pressure gauge
    pub enforcer: ConstraintEnforcer,

    /// Inverse of the scalar mass matrix of the structure (spread mode only)
    mass_inv: Option<Matrix>,
}

impl ResidualJacobianAssembler {
    /// Allocates a new instance
    pub fn new(config: &Config, fluid_mesh: &Mesh, solid_mesh: &Mesh) -> Result<Self, IfemError> {
        if let Some(message) = config.validate() {
            return Err(IfemError::Configuration(message));
        }
        let ndim = fluid_mesh.ndim;
        if solid_mesh.ndim != ndim {
            return Err(IfemError::Configuration(
                "the fluid and structure meshes must have the same space dimension".to_string(),
            ));
        }
        let fluid = FluidSpace::new(fluid_mesh, config.pressure_space)
            .map_err(|e| IfemError::Configuration(e.to_string()))?;
        let solid = SolidSpace::new(solid_mesh).map_err(|e| IfemError::Configuration(e.to_string()))?;
        let model = ModelStress::new(ndim, &config.param.stress)?;

        // quadrature rules
        let quad_f = Quadrature::gauss(ndim, config.n_gauss_fluid(fluid.degree))?;
        let quad_s = match config.solid_quadrature(fluid.degree) {
            SolidQuadrature::Gauss(n) => Quadrature::gauss(ndim, n)?,
            SolidQuadrature::Trapezoid(n) => Quadrature::trapezoid(ndim, n)?,
        };
        let fluid_data = fluid_mesh
            .cells
            .iter()
            .map(|cell| FluidCellData::new(fluid_mesh, cell, &quad_f, &fluid))
            .collect::<Result<Vec<_>, _>>()?;
        let solid_data = SolidCellData::all(solid_mesh, &quad_s)?;

        // the direct coupling tangent needs exact hessians
        let mut fluid_shapes = Vec::with_capacity(fluid_mesh.cells.len());
        for cell in &fluid_mesh.cells {
            fluid_shapes.push(CellShapes::new(fluid_mesh, cell)?);
        }
        if !config.use_spread && !config.semi_implicit {
            for shapes in fluid_shapes.iter_mut() {
                if !shapes.is_affine()? {
                    return Err(IfemError::Configuration(
                        "the direct coupling tangent requires affine fluid cells".to_string(),
                    ));
                }
            }
        }

        // constraints
        let gauge = if config.gauge_active() {
            Some(PressureGauge::new(fluid_mesh, &fluid, &quad_f)?)
        } else {
            None
        };
        let enforcer = ConstraintEnforcer::new(fluid.min_diameter, gauge);

        // inverse of the structure mass matrix
        let mass_inv = if config.use_spread {
            let n = solid.npoint;
            let mut mm = Matrix::new(n, n);
            for (e, data) in solid_data.iter().enumerate() {
                let points = &solid_mesh.cells[e].points;
                for p in 0..data.n_points() {
                    for a in 0..solid.nnode {
                        for b in 0..solid.nnode {
                            mm.add(points[a], points[b], data.nn[p][a] * data.nn[p][b] * data.jxw[p]);
                        }
                    }
                }
            }
            let mut mm_inv = Matrix::new(n, n);
            mat_inverse(&mut mm_inv, &mm)
                .map_err(|_| IfemError::SingularSystem("the structure mass matrix is singular".to_string()))?;
            Some(mm_inv)
        } else {
            None
        };

        let locator = PointLocator::build(fluid_mesh)?;
        Ok(ResidualJacobianAssembler {
            ndim,
            param: config.param,
            semi_implicit: config.semi_implicit,
            use_spread: config.use_spread,
            body_force: config.body_force,
            fluid,
            solid,
            fluid_data,
            solid_data,
            fluid_shapes,
            locator,
            mapping: ImmersedMapping::new(config.semi_implicit),
            model,
            enforcer,
            mass_inv,
        })
    }

    /// Allocates a block vector with the dimensions of the state
    pub fn new_vector(&self) -> BlockVector {
        BlockVector::new(self.fluid.n_dofs, self.solid.n_dofs)
    }

    /// Assembles the residual and, if requested, the Jacobian
    ///
    /// The residual is overwritten. The mapping of the structure points is rebuilt first.
    pub fn assemble(
        &mut self,
        args: &AssemblyArgs,
        residual: &mut BlockVector,
        with_jacobian: bool,
    ) -> Result<Option<BlockMatrix>, IfemError> {
        residual.fill(0.0);
        let w = self.mapping.displacement(&args.state.solid, &args.previous.solid);
        self.mapping
            .rebuild(&mut self.locator, &self.solid, &self.solid_data, w)?;
        let mut jacobian = if with_jacobian {
            Some(self.allocate_jacobian()?)
        } else {
            None
        };
        let mut acc = GaugeAccumulator::new(&self.fluid);
        self.fluid_pass(args, residual, jacobian.as_mut(), &mut acc)?;
        self.enforcer
            .add_gauge(&mut residual.fluid, jacobian.as_mut().map(|jj| &mut jj.ff), &acc)?;
        self.coupling_pass(args, residual, jacobian.as_mut())?;
        Ok(jacobian)
    }

    /// Allocates the Jacobian with room for the entries of the current mapping
    fn allocate_jacobian(&self) -> Result<BlockMatrix, StrError> {
        let (n_local_f, n_local_s) = (self.fluid.n_local(), self.solid.n_local());
        let nvel = self.ndim * self.fluid.nnode;
        let mut nnz_ff = self.fluid.local_to_global.len() * n_local_f * n_local_f;
        if self.enforcer.gauge.is_some() {
            nnz_ff += self.fluid.n_dofs_p;
        }
        let n_group: usize = self.mapping.owners.iter().map(|groups| groups.len()).sum();
        let nnz_fs = n_group * nvel * n_local_s;
        let nnz_ss = (self.solid.local_to_global.len() + n_group) * n_local_s * n_local_s;
        BlockMatrix::new(
            self.fluid.n_dofs,
            self.solid.n_dofs,
            [nnz_ff, nnz_fs, nnz_fs, nnz_ss],
        )
    }

    /// Computes the spreading field (1/Φ_B) M⁻¹ A_γ with A_γ = ∫ Pe : ∇y dX
    pub fn spread_field(&self, w: &Vector) -> Result<Vector, IfemError> {
        let mass_inv = match &self.mass_inv {
            Some(m) => m,
            None => {
                return Err(IfemError::Configuration(
                    "the spreading field is only available in spread mode".to_string(),
                ))
            }
        };
        let (ndim, nnode, npoint) = (self.ndim, self.solid.nnode, self.solid.npoint);
        let mut aa = Vector::new(self.solid.n_dofs);
        let mut ff = Matrix::new(ndim, ndim);
        let mut pe = Matrix::new(ndim, ndim);
        for (e, data) in self.solid_data.iter().enumerate() {
            let l2g = &self.solid.local_to_global[e];
            for p in 0..data.n_points() {
                data.deformation_gradient(&mut ff, p, l2g, w);
                self.model.actual.stress(&mut pe, &ff, &data.xx[p])?;
                for c in 0..ndim {
                    for m in 0..nnode {
                        let mut value = 0.0;
                        for d in 0..ndim {
                            value += pe.get(c, d) * data.gg[p].get(m, d);
                        }
                        aa[l2g[c * nnode + m]] += value * data.jxw[p];
                    }
                }
            }
        }
        let mut field = Vector::new(self.solid.n_dofs);
        for c in 0..ndim {
            for a in 0..npoint {
                let mut sum = 0.0;
                for b in 0..npoint {
                    sum += mass_inv.get(a, b) * aa[c * npoint + b];
                }
                field[c * npoint + a] = sum / self.param.phi_b;
            }
        }
        Ok(field)
    }

    /// Assembles the Navier-Stokes terms over the fluid cells
    fn fluid_pass(
        &self,
        args: &AssemblyArgs,
        residual: &mut BlockVector,
        mut jacobian: Option<&mut BlockMatrix>,
        acc: &mut GaugeAccumulator,
    ) -> Result<(), IfemError> {
        let (ndim, nnode, nnode_p) = (self.ndim, self.fluid.nnode, self.fluid.nnode_p);
        let (rho, eta, alpha) = (self.param.rho, self.param.eta, args.alpha);
        let n_local = self.fluid.n_local();
        let with_jacobian = jacobian.is_some();
        let gauge_active = self.enforcer.gauge.is_some();
        let xi = &args.state.fluid;
        let xi_t = &args.rate.fluid;
        let mut rr = Vector::new(n_local);
        let mut kk = Matrix::new(n_local, n_local);
        let mut u = [0.0; 3];
        let mut ut = [0.0; 3];
        let mut bb = [0.0; 3];
        let mut grad_u = [[0.0; 3]; 3];
        for (e, data) in self.fluid_data.iter().enumerate() {
            let l2g = &self.fluid.local_to_global[e];
            rr.fill(0.0);
            if with_jacobian {
                kk.fill(0.0);
            }
            for p in 0..data.jxw.len() {
                let (nn, nn_p, gg, jxw) = (&data.nn[p], &data.nn_p[p], &data.gg[p], data.jxw[p]);

                // fields at the Gauss point
                let mut pressure = 0.0;
                for m in 0..nnode_p {
                    pressure += nn_p[m] * xi[l2g[ndim * nnode + m]];
                }
                for c in 0..ndim {
                    u[c] = 0.0;
                    ut[c] = 0.0;
                    for d in 0..ndim {
                        grad_u[c][d] = 0.0;
                    }
                    for m in 0..nnode {
                        let eq = l2g[c * nnode + m];
                        u[c] += nn[m] * xi[eq];
                        ut[c] += nn[m] * xi_t[eq];
                        for d in 0..ndim {
                            grad_u[c][d] += gg.get(m, d) * xi[eq];
                        }
                    }
                    bb[c] = match self.body_force {
                        Some(f) => f(&data.xx[p], args.time, c),
                        None => 0.0,
                    };
                }
                let div: f64 = (0..ndim).map(|c| grad_u[c][c]).sum();

                // momentum: ρ(u̇ - b)·v - p ∇·v + η(∇u + ∇uᵀ):∇v + ρ(∇u u)·v
                for ci in 0..ndim {
                    for m in 0..nnode {
                        let i = ci * nnode + m;
                        let mut value = rho * (ut[ci] - bb[ci]) * nn[m] - pressure * gg.get(m, ci);
                        for d in 0..ndim {
                            value += eta * (grad_u[ci][d] + grad_u[d][ci]) * gg.get(m, d)
                                + rho * grad_u[ci][d] * u[d] * nn[m];
                        }
                        rr[i] += value * jxw;
                        if !with_jacobian {
                            continue;
                        }
                        for cj in 0..ndim {
                            for n in 0..nnode {
                                let mut value = eta * gg.get(m, cj) * gg.get(n, ci) + rho * grad_u[ci][cj] * nn[m] * nn[n];
                                if ci == cj {
                                    value += rho * alpha * nn[m] * nn[n];
                                    for d in 0..ndim {
                                        value += eta * gg.get(m, d) * gg.get(n, d) + rho * nn[m] * u[d] * gg.get(n, d);
                                    }
                                }
                                kk.add(i, cj * nnode + n, value * jxw);
                            }
                        }
                        for n in 0..nnode_p {
                            kk.add(i, ndim * nnode + n, -gg.get(m, ci) * nn_p[n] * jxw);
                        }
                    }
                }

                // continuity: -q ∇·u
                for m in 0..nnode_p {
                    let i = ndim * nnode + m;
                    rr[i] -= div * nn_p[m] * jxw;
                    if with_jacobian {
                        for cj in 0..ndim {
                            for n in 0..nnode {
                                kk.add(i, cj * nnode + n, -nn_p[m] * gg.get(n, cj) * jxw);
                            }
                        }
                    }
                    if gauge_active {
                        acc.add(l2g[i], xi[l2g[i]], nn_p[m] * jxw);
                    }
                }
            }

            // constraints and scatter
            let kk_opt = if with_jacobian { Some(&mut kk) } else { None };
            self.enforcer.apply_local(&mut rr, kk_opt, l2g, xi, args.constraints);
            for i in 0..n_local {
                residual.fluid[l2g[i]] += rr[i];
            }
            if let Some(jj) = jacobian.as_deref_mut() {
                for i in 0..n_local {
                    for j in 0..n_local {
                        jj.ff.put(l2g[i], l2g[j], kk.get(i, j))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Assembles the immersed terms over the structure cells
    fn coupling_pass(
        &mut self,
        args: &AssemblyArgs,
        residual: &mut BlockVector,
        mut jacobian: Option<&mut BlockMatrix>,
    ) -> Result<(), IfemError> {
        let ndim = self.ndim;
        let (nnode_f, nnode_s) = (self.fluid.nnode, self.solid.nnode);
        let nvel = ndim * nnode_f;
        let (n_local_f, n_local_s) = (self.fluid.n_local(), self.solid.n_local());
        let (phi_b, alpha) = (self.param.phi_b, args.alpha);
        let with_jacobian = jacobian.is_some();
        let need_hessian = with_jacobian && !self.use_spread && !self.semi_implicit;
        let chain_rule = with_jacobian && !self.semi_implicit;
        let spread = if self.use_spread {
            Some(self.spread_field(&args.state.solid)?)
        } else {
            None
        };
        let xi_f = &args.state.fluid;
        let w = &args.state.solid;
        let w_t = &args.rate.solid;

        let mut ff = Matrix::new(ndim, ndim);
        let mut pe = Matrix::new(ndim, ndim);
        let mut rr_f = Vector::new(n_local_f);
        let mut rr_s = Vector::new(n_local_s);
        let mut kk_fs = Matrix::new(n_local_f, n_local_s);
        let mut kk_sf = Matrix::new(n_local_s, n_local_f);
        let mut kk_ss = Matrix::new(n_local_s, n_local_s);
        let mut hh: Vec<Matrix> = (0..nnode_f).map(|_| Matrix::new(ndim, ndim)).collect();
        let mut grad_k = vec![0.0; ndim];
        let mut u = [0.0; 3];
        let mut w_t_p = vec![0.0; ndim];
        let mut grad_u = [[0.0; 3]; 3];

        for (e, data) in self.solid_data.iter().enumerate() {
            let l2g_s = &self.solid.local_to_global[e];
            let nip = data.n_points();

            // Pe·Fᵀ and its derivatives at the integration points
            let mut pe_ft_all = Vec::with_capacity(nip);
            let mut dd_all = Vec::with_capacity(if with_jacobian { nip } else { 0 });
            for p in 0..nip {
                data.deformation_gradient(&mut ff, p, l2g_s, w);
                let mut pe_ft = Matrix::new(ndim, ndim);
                self.model.actual.stress_times_ft(&mut pe_ft, &mut pe, &ff, &data.xx[p])?;
                pe_ft_all.push(pe_ft);
                if with_jacobian {
                    let mut dd = Vec::with_capacity(n_local_s);
                    for ck in 0..ndim {
                        for k in 0..nnode_s {
                            for d in 0..ndim {
                                grad_k[d] = data.gg[p].get(k, d);
                            }
                            let mut dd_k = Matrix::new(ndim, ndim);
                            self.model
                                .actual
                                .pe_ft_derivative(&mut dd_k, &ff, &data.xx[p], ck, &grad_k)?;
                            dd.push(dd_k);
                        }
                    }
                    dd_all.push(dd);
                }
            }

            // interaction with each fluid cell owning some integration points
            for group in &self.mapping.owners[e] {
                let l2g_f = &self.fluid.local_to_global[group.cell_id];
                let shapes = &mut self.fluid_shapes[group.cell_id];
                rr_f.fill(0.0);
                rr_s.fill(0.0);
                if with_jacobian {
                    kk_fs.fill(0.0);
                    kk_sf.fill(0.0);
                    kk_ss.fill(0.0);
                }
                for (q, ksi) in group.ksi.iter().enumerate() {
                    let p = group.index[q];
                    let (ns, jxw) = (&data.nn[p], data.jxw[p]);
                    if need_hessian {
                        shapes.calc_hessians(&mut hh, ksi)?;
                    } else {
                        shapes.calc_gradient(ksi)?;
                    }
                    shapes.calc_interp(ksi);
                    let nf = &shapes.pad.interp;
                    let gf = &shapes.pad.gradient;

                    // fluid velocity at x = X + w
                    for c in 0..ndim {
                        u[c] = 0.0;
                        for d in 0..ndim {
                            grad_u[c][d] = 0.0;
                        }
                        for m in 0..nnode_f {
                            let value = xi_f[l2g_f[c * nnode_f + m]];
                            u[c] += nf[m] * value;
                            for d in 0..ndim {
                                grad_u[c][d] += gf.get(m, d) * value;
                            }
                        }
                    }

                    // momentum: Pe·Fᵀ : ∇v (direct) or Φ_B ψ·v (spread)
                    let pe_ft = &pe_ft_all[p];
                    for ci in 0..ndim {
                        for m in 0..nnode_f {
                            let i = ci * nnode_f + m;
                            match &spread {
                                Some(field) => {
                                    let mut psi = 0.0;
                                    for n in 0..nnode_s {
                                        psi += ns[n] * field[l2g_s[ci * nnode_s + n]];
                                    }
                                    rr_f[i] += phi_b * nf[m] * psi * jxw;
                                }
                                None => {
                                    let mut value = 0.0;
                                    for d in 0..ndim {
                                        value += pe_ft.get(ci, d) * gf.get(m, d);
                                    }
                                    rr_f[i] += value * jxw;
                                }
                            }
                            if !with_jacobian {
                                continue;
                            }
                            let dd = &dd_all[p];
                            for cj in 0..ndim {
                                for n in 0..nnode_s {
                                    let j = cj * nnode_s + n;
                                    let mut value = 0.0;
                                    for d in 0..ndim {
                                        value += dd[j].get(ci, d) * gf.get(m, d);
                                    }
                                    if need_hessian {
                                        for d in 0..ndim {
                                            value += pe_ft.get(ci, d) * hh[m].get(cj, d) * ns[n];
                                        }
                                    }
                                    kk_fs.add(i, j, value * jxw);
                                }
                            }
                        }
                    }

                    // kinematics: -Φ_B u(X + w) · y
                    for ci in 0..ndim {
                        for a in 0..nnode_s {
                            let i = ci * nnode_s + a;
                            rr_s[i] -= phi_b * u[ci] * ns[a] * jxw;
                            if !with_jacobian {
                                continue;
                            }
                            for m in 0..nnode_f {
                                kk_sf.add(i, ci * nnode_f + m, -phi_b * ns[a] * nf[m] * jxw);
                            }
                            if chain_rule {
                                for ck in 0..ndim {
                                    for k in 0..nnode_s {
                                        kk_ss.add(i, ck * nnode_s + k, -phi_b * ns[a] * ns[k] * grad_u[ci][ck] * jxw);
                                    }
                                }
                            }
                        }
                    }
                }

                // constrained fluid rows receive nothing
                let kk_opt = if with_jacobian { Some(&mut kk_fs) } else { None };
                self.enforcer.eliminate_rows(&mut rr_f, kk_opt, l2g_f, args.constraints);
                for i in 0..nvel {
                    residual.fluid[l2g_f[i]] += rr_f[i];
                }
                for i in 0..n_local_s {
                    residual.solid[l2g_s[i]] += rr_s[i];
                }
                if let Some(jj) = jacobian.as_deref_mut() {
                    for i in 0..nvel {
                        for j in 0..n_local_s {
                            jj.fs.put(l2g_f[i], l2g_s[j], kk_fs.get(i, j))?;
                        }
                    }
                    for i in 0..n_local_s {
                        for j in 0..nvel {
                            jj.sf.put(l2g_s[i], l2g_f[j], kk_sf.get(i, j))?;
                        }
                    }
                    if chain_rule {
                        for i in 0..n_local_s {
                            for j in 0..n_local_s {
                                jj.ss.put(l2g_s[i], l2g_s[j], kk_ss.get(i, j))?;
                            }
                        }
                    }
                }
            }

            // rate of the structure: Φ_B ẇ · y
            rr_s.fill(0.0);
            if with_jacobian {
                kk_ss.fill(0.0);
            }
            for p in 0..nip {
                let (ns, jxw) = (&data.nn[p], data.jxw[p]);
                data.displacement(&mut w_t_p, p, l2g_s, w_t);
                for ci in 0..ndim {
                    for a in 0..nnode_s {
                        let i = ci * nnode_s + a;
                        rr_s[i] += phi_b * w_t_p[ci] * ns[a] * jxw;
                        if with_jacobian {
                            for b in 0..nnode_s {
                                kk_ss.add(i, ci * nnode_s + b, phi_b * alpha * ns[a] * ns[b] * jxw);
                            }
                        }
                    }
                }
            }
            for i in 0..n_local_s {
                residual.solid[l2g_s[i]] += rr_s[i];
            }
            if let Some(jj) = jacobian.as_deref_mut() {
                for i in 0..n_local_s {
                    for j in 0..n_local_s {
                        jj.ss.put(l2g_s[i], l2g_s[j], kk_ss.get(i, j))?;
                    }
                }
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
