use super::{CellShapes, FluidSpace, Quadrature};
use crate::base::Essential;
use crate::StrError;
use gemlab::mesh::Mesh;
use russell_lab::{Matrix, Vector};
use russell_sparse::CooMatrix;
use std::collections::BTreeMap;

/// Holds the prescribed values of the fluid equations at a given time
#[derive(Clone, Debug)]
pub struct ConstraintMap {
    /// Maps the equation number to the prescribed value
    pub values: BTreeMap<usize, f64>,
}

impl ConstraintMap {
    /// Allocates a new instance with the boundary data at time t
    ///
    /// With `fix_pressure`, the first pressure equation is prescribed to zero.
    pub fn new(
        mesh: &Mesh,
        fluid: &FluidSpace,
        essential: &Essential,
        fix_pressure: bool,
        time: f64,
    ) -> Result<Self, StrError> {
        let mut values = BTreeMap::new();
        for ebc in &essential.all {
            let c = ebc.dof.component();
            if c >= fluid.ndim {
                return Err("the velocity component is incompatible with the space dimension");
            }
            for p in &fluid.boundary_points {
                let x = &mesh.points[*p].coords;
                if let Some(filter) = ebc.filter {
                    if !filter(x) {
                        continue;
                    }
                }
                values.insert(fluid.eq_velocity(*p, c), (ebc.value)(x, time));
            }
        }
        if fix_pressure {
            values.insert(fluid.first_pressure_dof(), 0.0);
        }
        Ok(ConstraintMap { values })
    }

    /// Returns the prescribed value of an equation, if any
    pub fn get(&self, eq: usize) -> Option<f64> {
        self.values.get(&eq).copied()
    }

    /// Returns the number of prescribed equations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Writes the prescribed values into the fluid block of a state vector
    pub fn apply_to(&self, fluid: &mut Vector) {
        for (eq, value) in &self.values {
            fluid[*eq] = *value;
        }
    }
}

/// Holds the pressure gauge anchoring the additive constant of the pressure
///
/// The equation of the gauge DOF is replaced by (scale/area) ∫ p dΩ = 0.
#[derive(Clone, Debug)]
pub struct PressureGauge {
    /// The equation receiving the mean-pressure constraint (the first pressure equation)
    pub dof: usize,

    /// The measure of the fluid domain
    pub area: f64,
}

impl PressureGauge {
    /// Allocates a new instance
    pub fn new(mesh: &Mesh, fluid: &FluidSpace, quad: &Quadrature) -> Result<Self, StrError> {
        let mut area = 0.0;
        for cell in &mesh.cells {
            let mut shapes = CellShapes::corners(mesh, cell)?;
            for p in 0..quad.len() {
                area += shapes.calc_jacobian(&quad.points[p])? * quad.weights[p];
            }
        }
        if area <= 0.0 {
            return Err("the area of the fluid domain must be positive");
        }
        Ok(PressureGauge {
            dof: fluid.first_pressure_dof(),
            area,
        })
    }
}

/// Accumulates the mean pressure and its sensitivity during one assembly
pub struct GaugeAccumulator {
    /// The integral of the pressure over the fluid domain
    pub average: f64,

    /// The integral of each pressure interpolation function (indexed by eq - n_dofs_u)
    pub coef: Vec<f64>,

    /// The first pressure equation
    offset: usize,
}

impl GaugeAccumulator {
    /// Allocates a new instance filled with zeros
    pub fn new(fluid: &FluidSpace) -> Self {
        GaugeAccumulator {
            average: 0.0,
            coef: vec![0.0; fluid.n_dofs_p],
            offset: fluid.n_dofs_u,
        }
    }

    /// Adds the contribution of a pressure interpolation function
    pub fn add(&mut self, eq: usize, p_value: f64, np_jxw: f64) {
        self.average += p_value * np_jxw;
        self.coef[eq - self.offset] += np_jxw;
    }
}

/// Imposes the prescribed values and the pressure gauge on the fluid equations
///
/// The rows of prescribed equations are replaced by scale·(ξ - ḡ) where scale is the minimal
/// fluid cell diameter. The row of the gauge equation receives the mean-pressure constraint.
pub struct ConstraintEnforcer {
    /// The scaling factor of the constraint rows
    pub scale: f64,

    /// The pressure gauge (None if inactive)
    pub gauge: Option<PressureGauge>,
}

impl ConstraintEnforcer {
    /// Allocates a new instance
    pub fn new(scale: f64, gauge: Option<PressureGauge>) -> Self {
        ConstraintEnforcer { scale, gauge }
    }

    /// Indicates whether the equation is the (active) gauge equation
    pub fn is_gauge(&self, eq: usize) -> bool {
        match &self.gauge {
            Some(gauge) => gauge.dof == eq,
            None => false,
        }
    }

    /// Applies the constraints to the local residual and Jacobian of a fluid cell
    ///
    /// # Input
    ///
    /// * `rr` -- the local residual
    /// * `kk` -- the local Jacobian (None if not requested)
    /// * `l2g` -- the local-to-global map of the cell
    /// * `state` -- the fluid block of the current state
    /// * `map` -- the prescribed values
    pub fn apply_local(
        &self,
        rr: &mut Vector,
        mut kk: Option<&mut Matrix>,
        l2g: &[usize],
        state: &Vector,
        map: &ConstraintMap,
    ) {
        for (i, eq) in l2g.iter().enumerate() {
            if let Some(value) = map.get(*eq) {
                rr[i] = self.scale * (state[*eq] - value);
                if let Some(k) = kk.as_deref_mut() {
                    let ncol = k.dims().1;
                    for j in 0..ncol {
                        k.set(i, j, 0.0);
                    }
                    k.set(i, i, self.scale);
                }
            }
            if self.is_gauge(*eq) {
                rr[i] = 0.0;
                if let Some(k) = kk.as_deref_mut() {
                    let ncol = k.dims().1;
                    for j in 0..ncol {
                        k.set(i, j, 0.0);
                    }
                }
            }
        }
    }

    /// Zeroes the rows of prescribed and gauge equations in a coupling contribution
    ///
    /// `rr` and `kk` hold the fluid rows of one cell (kk may have any number of columns).
    pub fn eliminate_rows(&self, rr: &mut Vector, mut kk: Option<&mut Matrix>, l2g: &[usize], map: &ConstraintMap) {
        for (i, eq) in l2g.iter().enumerate() {
            if map.get(*eq).is_some() || self.is_gauge(*eq) {
                rr[i] = 0.0;
                if let Some(k) = kk.as_deref_mut() {
                    let ncol = k.dims().1;
                    for j in 0..ncol {
                        k.set(i, j, 0.0);
                    }
                }
            }
        }
    }

    /// Adds the mean-pressure constraint to the gauge row
    ///
    /// ```text
    /// R[g]    += (scale/area) ∫ p dΩ
    /// J[g][j] += (scale/area) ∫ Nʲ dΩ   (pressure columns)
    /// ```
    pub fn add_gauge(
        &self,
        residual: &mut Vector,
        kk: Option<&mut CooMatrix>,
        acc: &GaugeAccumulator,
    ) -> Result<(), StrError> {
        if let Some(gauge) = &self.gauge {
            let factor = self.scale / gauge.area;
            residual[gauge.dof] += factor * acc.average;
            if let Some(k) = kk {
                for (n, coef) in acc.coef.iter().enumerate() {
                    k.put(gauge.dof, acc.offset + n, factor * coef)?;
                }
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ConstraintEnforcer, ConstraintMap, GaugeAccumulator, PressureGauge};
    use crate::base::{Dof, Essential, PressureSpace, SampleMeshes};
    use crate::fem::{FluidSpace, Quadrature};
    use gemlab::shapes::GeoKind;
    use russell_lab::{approx_eq, Matrix, Vector};
    use russell_sparse::{CooMatrix, Sym};

    #[test]
    fn constraint_map_works() {
        // 6-----7-----8
        // |     |     |
        // 3-----4-----5
        // |     |     |
        // 0-----1-----2
        let mesh = SampleMeshes::rectangle(GeoKind::Qua4, 2, 2, 0.0, 2.0, 0.0, 2.0).unwrap();
        let fluid = FluidSpace::new(&mesh, PressureSpace::Continuous).unwrap();
        let mut essential = Essential::new();
        essential
            .on_boundary(&[Dof::Vx, Dof::Vy], |_, _| 0.0)
            .on_boundary_where(|x| x[1] > 1.99, &[Dof::Vx], |x, t| x[0] + t);
        let map = ConstraintMap::new(&mesh, &fluid, &essential, false, 0.5).unwrap();
        assert_eq!(map.len(), 16);
        assert_eq!(map.get(fluid.eq_velocity(4, 0)), None);
        assert_eq!(map.get(fluid.eq_velocity(7, 0)), Some(1.5));
        assert_eq!(map.get(fluid.eq_velocity(7, 1)), Some(0.0));
        assert_eq!(map.get(fluid.first_pressure_dof()), None);

        let map = ConstraintMap::new(&mesh, &fluid, &essential, true, 0.5).unwrap();
        assert_eq!(map.len(), 17);
        assert_eq!(map.get(fluid.first_pressure_dof()), Some(0.0));

        let mut state = Vector::new(fluid.n_dofs);
        state.fill(3.0);
        map.apply_to(&mut state);
        assert_eq!(state[fluid.eq_velocity(8, 0)], 2.5);
        assert_eq!(state[fluid.eq_velocity(4, 0)], 3.0);

        let mut essential = Essential::new();
        essential.on_boundary(&[Dof::Vz], |_, _| 0.0);
        assert_eq!(
            ConstraintMap::new(&mesh, &fluid, &essential, false, 0.0).err(),
            Some("the velocity component is incompatible with the space dimension")
        );
    }

    #[test]
    fn apply_local_works() {
        let mesh = SampleMeshes::rectangle(GeoKind::Qua4, 1, 1, 0.0, 1.0, 0.0, 1.0).unwrap();
        let fluid = FluidSpace::new(&mesh, PressureSpace::Continuous).unwrap();
        let essential = Essential::no_slip(2);
        let map = ConstraintMap::new(&mesh, &fluid, &essential, false, 0.0).unwrap();
        let quad = Quadrature::gauss(2, 2).unwrap();
        let gauge = PressureGauge::new(&mesh, &fluid, &quad).unwrap();
        approx_eq(gauge.area, 1.0, 1e-15);
        assert_eq!(gauge.dof, 8);
        let enforcer = ConstraintEnforcer::new(0.5, Some(gauge));
        let n = fluid.n_local();
        let mut rr = Vector::new(n);
        rr.fill(1.0);
        let mut kk = Matrix::new(n, n);
        kk.fill(1.0);
        let mut state = Vector::new(fluid.n_dofs);
        state[0] = 2.0;
        let l2g = &fluid.local_to_global[0];
        enforcer.apply_local(&mut rr, Some(&mut kk), l2g, &state, &map);
        approx_eq(rr[0], 1.0, 1e-15); // 0.5 (2 - 0)
        approx_eq(kk.get(0, 0), 0.5, 1e-15);
        approx_eq(kk.get(0, 1), 0.0, 1e-15);
        // gauge row (first local pressure)
        assert_eq!(rr[8], 0.0);
        assert_eq!(kk.get(8, 8), 0.0);
        // other pressure rows are untouched
        assert_eq!(rr[9], 1.0);
        assert_eq!(kk.get(9, 0), 1.0);

        let mut rr = Vector::new(n);
        rr.fill(1.0);
        let mut kk = Matrix::new(n, 4);
        kk.fill(1.0);
        enforcer.eliminate_rows(&mut rr, Some(&mut kk), l2g, &map);
        assert_eq!(rr[0], 0.0);
        assert_eq!(kk.get(7, 3), 0.0);
        assert_eq!(rr[8], 0.0);
        assert_eq!(rr[11], 1.0);
        assert_eq!(kk.get(11, 3), 1.0);
    }

    #[test]
    fn add_gauge_works() {
        let mesh = SampleMeshes::rectangle(GeoKind::Qua4, 1, 1, 0.0, 2.0, 0.0, 1.0).unwrap();
        let fluid = FluidSpace::new(&mesh, PressureSpace::Continuous).unwrap();
        let quad = Quadrature::gauss(2, 2).unwrap();
        let gauge = PressureGauge::new(&mesh, &fluid, &quad).unwrap();
        approx_eq(gauge.area, 2.0, 1e-15);
        let enforcer = ConstraintEnforcer::new(1.0, Some(gauge));
        let mut acc = GaugeAccumulator::new(&fluid);
        for n in 0..4 {
            acc.add(fluid.n_dofs_u + n, 3.0, 0.5);
        }
        approx_eq(acc.average, 6.0, 1e-15);
        let mut kk = CooMatrix::new(fluid.n_dofs, fluid.n_dofs, fluid.n_dofs_p, Sym::No).unwrap();
        let mut residual = Vector::new(fluid.n_dofs);
        enforcer.add_gauge(&mut residual, Some(&mut kk), &acc).unwrap();
        approx_eq(residual[8], 3.0, 1e-15);
        assert_eq!(kk.get_info().2, 4);
        approx_eq(kk.as_dense().get(8, 11), 0.25, 1e-15);
        let inactive = ConstraintEnforcer::new(1.0, None);
        let mut residual = Vector::new(fluid.n_dofs);
        inactive.add_gauge(&mut residual, None, &acc).unwrap();
        assert_eq!(residual[8], 0.0);
    }

    #[test]
    fn discontinuous_pressure_constraints_work() {
        let mesh = SampleMeshes::rectangle(GeoKind::Qua9, 2, 1, 0.0, 2.0, 0.0, 1.0).unwrap();
        let fluid = FluidSpace::new(&mesh, PressureSpace::Discontinuous).unwrap();
        let essential = Essential::no_slip(2);
        let map = ConstraintMap::new(&mesh, &fluid, &essential, true, 0.0).unwrap();
        assert_eq!(map.len(), 2 * 12 + 1);
        assert_eq!(map.get(fluid.eq_pressure_local(0, 0)), Some(0.0));
        assert_eq!(map.get(fluid.eq_pressure_local(1, 0)), None);

        // the gauge anchors the constant function of the first cell
        let quad = Quadrature::gauss(2, 3).unwrap();
        let gauge = PressureGauge::new(&mesh, &fluid, &quad).unwrap();
        approx_eq(gauge.area, 2.0, 1e-14);
        assert_eq!(gauge.dof, fluid.eq_pressure_local(0, 0));
        let enforcer = ConstraintEnforcer::new(1.0, Some(gauge));
        let mut acc = GaugeAccumulator::new(&fluid);
        assert_eq!(acc.coef.len(), 6);
        for e in 0..2 {
            acc.add(fluid.eq_pressure_local(e, 0), 4.0, 1.0);
            acc.add(fluid.eq_pressure_local(e, 1), 0.0, 0.0);
        }
        let mut kk = CooMatrix::new(fluid.n_dofs, fluid.n_dofs, fluid.n_dofs_p, Sym::No).unwrap();
        let mut residual = Vector::new(fluid.n_dofs);
        enforcer.add_gauge(&mut residual, Some(&mut kk), &acc).unwrap();
        approx_eq(residual[30], 4.0, 1e-15);
        let dense = kk.as_dense();
        approx_eq(dense.get(30, 30), 0.5, 1e-15);
        approx_eq(dense.get(30, 33), 0.5, 1e-15);
        assert_eq!(dense.get(30, 31), 0.0);
    }
}
