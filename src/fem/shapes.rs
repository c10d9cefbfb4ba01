use crate::StrError;
use gemlab::mesh::{Cell, Mesh, PointId};
use gemlab::shapes::{GeoKind, Scratchpad};
use russell_lab::{mat_inverse, Matrix};

/// Step (in reference coordinates) of the central differences yielding the hessians
pub const HESSIAN_STEP: f64 = 1e-3;

/// Tolerance on the reference coordinates to accept a point inside a cell
pub const INSIDE_TOL: f64 = 1e-10;

/// Maximum number of iterations of the inverse mapping x → ξ
pub const INVERSE_MAP_MAX_IT: usize = 25;

/// Tolerance on the increment of ξ to stop the inverse mapping
pub const INVERSE_MAP_TOL: f64 = 1e-13;

/// Returns the polynomial degree of the interpolation functions of supported cells
pub fn polynomial_degree(kind: GeoKind) -> Result<usize, StrError> {
    match kind {
        GeoKind::Qua4 | GeoKind::Hex8 => Ok(1),
        GeoKind::Qua8 | GeoKind::Qua9 => Ok(2),
        _ => Err("only Qua4, Qua8, Qua9, and Hex8 cells are supported"),
    }
}

/// Returns the kind of the cell formed by the corners of a supported cell
pub fn corner_kind(kind: GeoKind) -> Result<GeoKind, StrError> {
    match kind {
        GeoKind::Qua4 | GeoKind::Qua8 | GeoKind::Qua9 => Ok(GeoKind::Qua4),
        GeoKind::Hex8 => Ok(GeoKind::Hex8),
        _ => Err("only Qua4, Qua8, Qua9, and Hex8 cells are supported"),
    }
}

/// Returns the reference coordinates of the nodes of a supported cell
///
/// ```text
/// 3-----6-----2
/// |     ξ₁    |     Qua4: 0, 1, 2, 3
/// 7     8 ξ₀  5     Qua8: 0, ..., 7
/// |           |     Qua9: 0, ..., 8
/// 0-----4-----1
/// ```
pub fn node_reference_coords(kind: GeoKind) -> Result<Vec<Vec<f64>>, StrError> {
    polynomial_degree(kind)?;
    Ok((0..kind.nnode()).map(|m| kind.reference_coords(m).to_vec()).collect())
}

/// Evaluates interpolation functions, gradients, and hessians on a cell
///
/// This structure wraps the gemlab Scratchpad and adds the Jacobian of the isoparametric
/// map, the hessians of the interpolation functions, and the inverse mapping x → ξ.
pub struct CellShapes {
    /// The gemlab scratchpad (holds interp, deriv, gradient, and the coordinates matrix)
    pub pad: Scratchpad,

    /// Space dimension
    pub ndim: usize,

    /// Number of nodes of the cell
    pub nnode: usize,

    /// Jacobian of the isoparametric map J = dx/dξ
    pub jacobian: Matrix,

    /// Inverse Jacobian J⁻¹ = dξ/dx
    pub inv_jacobian: Matrix,

    /// Derivatives of the gradients along each reference direction
    dgrad: Vec<Matrix>,
}

impl CellShapes {
    /// Allocates a new instance with the nodes of a cell
    pub fn new(mesh: &Mesh, cell: &Cell) -> Result<Self, StrError> {
        CellShapes::with_kind(mesh, cell.kind, &cell.points)
    }

    /// Allocates a new instance with the corners of a cell (e.g., for the pressure field)
    pub fn corners(mesh: &Mesh, cell: &Cell) -> Result<Self, StrError> {
        let kind = corner_kind(cell.kind)?;
        CellShapes::with_kind(mesh, kind, &cell.points[..kind.nnode()])
    }

    /// Allocates a new instance given the kind and the points
    pub fn with_kind(mesh: &Mesh, kind: GeoKind, points: &[PointId]) -> Result<Self, StrError> {
        polynomial_degree(kind)?;
        let ndim = mesh.ndim;
        if kind.ndim() != ndim {
            return Err("the cell kind is incompatible with the space dimension");
        }
        let nnode = kind.nnode();
        if points.len() < nnode {
            return Err("the number of points is insufficient for the cell kind");
        }
        let mut pad = Scratchpad::new(ndim, kind)?;
        for m in 0..nnode {
            for i in 0..ndim {
                pad.set_xx(m, i, mesh.points[points[m]].coords[i]);
            }
        }
        Ok(CellShapes {
            pad,
            ndim,
            nnode,
            jacobian: Matrix::new(ndim, ndim),
            inv_jacobian: Matrix::new(ndim, ndim),
            dgrad: (0..ndim).map(|_| Matrix::new(nnode, ndim)).collect(),
        })
    }

    /// Sets the i-th coordinate of node m (e.g., to describe the current configuration)
    pub fn set_coords(&mut self, m: usize, i: usize, value: f64) {
        self.pad.set_xx(m, i, value);
    }

    /// Calculates the interpolation functions (available in `pad.interp`)
    pub fn calc_interp(&mut self, ksi: &[f64]) {
        (self.pad.fn_interp)(&mut self.pad.interp, ksi);
    }

    /// Calculates the gradients of the interpolation functions (available in `pad.gradient`)
    ///
    /// Returns the determinant of the Jacobian.
    pub fn calc_gradient(&mut self, ksi: &[f64]) -> Result<f64, StrError> {
        self.pad.calc_gradient(ksi)
    }

    /// Calculates the Jacobian J = dx/dξ and its inverse
    ///
    /// Returns the determinant of the Jacobian.
    pub fn calc_jacobian(&mut self, ksi: &[f64]) -> Result<f64, StrError> {
        (self.pad.fn_deriv)(&mut self.pad.deriv, ksi);
        for i in 0..self.ndim {
            for k in 0..self.ndim {
                let mut sum = 0.0;
                for m in 0..self.nnode {
                    sum += self.pad.xxt.get(i, m) * self.pad.deriv.get(m, k);
                }
                self.jacobian.set(i, k, sum);
            }
        }
        mat_inverse(&mut self.inv_jacobian, &self.jacobian)
    }

    /// Calculates the real coordinates x(ξ)
    pub fn calc_coords(&mut self, x: &mut [f64], ksi: &[f64]) {
        self.calc_interp(ksi);
        for i in 0..self.ndim {
            x[i] = 0.0;
            for m in 0..self.nnode {
                x[i] += self.pad.interp[m] * self.pad.xxt.get(i, m);
            }
        }
    }

    /// Calculates the hessians of the interpolation functions
    ///
    /// `hh[m]` receives the (ndim,ndim) matrix ∂²Nᵐ/∂xᵢ∂xⱼ. The result is exact (up to round-off)
    /// for affine cells because the gradients are at most quadratic along each direction.
    /// The gradients in `pad.gradient` correspond to ksi on exit.
    pub fn calc_hessians(&mut self, hh: &mut [Matrix], ksi: &[f64]) -> Result<(), StrError> {
        let (ndim, nnode) = (self.ndim, self.nnode);
        let mut ksi_h = [0.0; 3];
        ksi_h[..ndim].copy_from_slice(&ksi[..ndim]);
        for k in 0..ndim {
            ksi_h[k] = ksi[k] + HESSIAN_STEP;
            self.pad.calc_gradient(&ksi_h[..ndim])?;
            for m in 0..nnode {
                for i in 0..ndim {
                    self.dgrad[k].set(m, i, self.pad.gradient.get(m, i));
                }
            }
            ksi_h[k] = ksi[k] - HESSIAN_STEP;
            self.pad.calc_gradient(&ksi_h[..ndim])?;
            for m in 0..nnode {
                for i in 0..ndim {
                    let diff = self.dgrad[k].get(m, i) - self.pad.gradient.get(m, i);
                    self.dgrad[k].set(m, i, diff / (2.0 * HESSIAN_STEP));
                }
            }
            ksi_h[k] = ksi[k];
        }
        self.calc_jacobian(ksi)?;
        for m in 0..nnode {
            for i in 0..ndim {
                for j in 0..ndim {
                    let mut sum = 0.0;
                    for k in 0..ndim {
                        sum += self.dgrad[k].get(m, i) * self.inv_jacobian.get(k, j);
                    }
                    hh[m].set(i, j, sum);
                }
            }
            for i in 0..ndim {
                for j in (i + 1)..ndim {
                    let sym = (hh[m].get(i, j) + hh[m].get(j, i)) / 2.0;
                    hh[m].set(i, j, sym);
                    hh[m].set(j, i, sym);
                }
            }
        }
        self.pad.calc_gradient(ksi)?;
        Ok(())
    }

    /// Finds the reference coordinates ξ of a point x by Newton iterations
    ///
    /// Returns false if the iterations fail to converge (e.g., x is far away from the cell).
    pub fn inverse_map(&mut self, ksi: &mut [f64], x: &[f64]) -> Result<bool, StrError> {
        let ndim = self.ndim;
        let mut xx = [0.0; 3];
        let mut delta = [0.0; 3];
        for k in 0..ndim {
            ksi[k] = 0.0;
        }
        for _ in 0..INVERSE_MAP_MAX_IT {
            self.calc_coords(&mut xx[..ndim], ksi);
            if self.calc_jacobian(ksi).is_err() {
                return Ok(false);
            }
            let mut norm = 0.0;
            for k in 0..ndim {
                delta[k] = 0.0;
                for l in 0..ndim {
                    delta[k] += self.inv_jacobian.get(k, l) * (x[l] - xx[l]);
                }
                norm = f64::max(norm, f64::abs(delta[k]));
            }
            for k in 0..ndim {
                ksi[k] += delta[k];
                if !ksi[k].is_finite() || f64::abs(ksi[k]) > 10.0 {
                    return Ok(false);
                }
            }
            if norm < INVERSE_MAP_TOL {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Indicates whether the reference coordinates lie inside the reference cell
    pub fn is_inside(ksi: &[f64]) -> bool {
        ksi.iter().all(|k| f64::abs(*k) <= 1.0 + INSIDE_TOL)
    }

    /// Indicates whether the isoparametric map is affine (constant Jacobian)
    pub fn is_affine(&mut self) -> Result<bool, StrError> {
        let ndim = self.ndim;
        let center = vec![0.0; ndim];
        self.calc_jacobian(&center)?;
        let reference = self.jacobian.clone();
        let mut size = 0.0;
        for i in 0..ndim {
            for k in 0..ndim {
                size = f64::max(size, f64::abs(reference.get(i, k)));
            }
        }
        let corners = node_reference_coords(corner_kind(self.pad.kind)?)?;
        for ksi in &corners {
            self.calc_jacobian(ksi)?;
            for i in 0..ndim {
                for k in 0..ndim {
                    if f64::abs(self.jacobian.get(i, k) - reference.get(i, k)) > 1e-10 * size {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
