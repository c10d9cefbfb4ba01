use crate::base::{ParamImmersed, ParamStress, SampleMeshes};
use crate::fem::ExactSolution;
use crate::StrError;
use gemlab::mesh::Mesh;
use gemlab::shapes::GeoKind;
use russell_lab::Matrix;
use std::f64::consts::PI;

/// Equilibrium of a ring with circumferential fibers immersed in a fluid at rest
///
/// The ring (inner radius R, thickness w) lies inside the square [0,l]² filled with fluid.
/// The fibers carry the hoop tension μ; thus, the fluid stays at rest (u = 0) and the radial
/// equilibrium dp/dr = -μ/r holds across the ring:
///
/// ```text
///        ⎧ p_in                      r < R
/// p(r) = ⎨ p_in - μ ln(r/R)          R ≤ r ≤ R + w
///        ⎩ p_in - μ ln((R + w)/R)    r > R + w
/// ```
///
/// with p_in chosen such that the mean pressure over the square vanishes:
///
/// ```text
/// p_in = μ [ln((R + w)/R) - π ((R + w)² - R²) / (2 l²)]
/// ```
pub struct RingWithFibers {
    /// Center of the ring
    pub center: [f64; 2],

    /// Inner radius R
    pub radius: f64,

    /// Thickness w
    pub thickness: f64,

    /// Side of the square fluid domain
    pub l: f64,

    /// Fiber stiffness μ
    pub mu: f64,

    /// Pressure inside the ring
    pub p_in: f64,
}

impl RingWithFibers {
    /// Allocates a new instance
    ///
    /// * `center` -- center of the ring
    /// * `radius` -- inner radius R
    /// * `thickness` -- thickness w
    /// * `l` -- side of the square fluid domain [0,l]²
    /// * `mu` -- fiber stiffness
    pub fn new(center: [f64; 2], radius: f64, thickness: f64, l: f64, mu: f64) -> Result<Self, StrError> {
        if radius <= 0.0 || thickness <= 0.0 {
            return Err("the radius and the thickness must be positive");
        }
        if mu < 0.0 {
            return Err("mu must be ≥ 0.0");
        }
        let r_out = radius + thickness;
        for i in 0..2 {
            if center[i] - r_out <= 0.0 || center[i] + r_out >= l {
                return Err("the ring must lie inside the fluid domain");
            }
        }
        let p_in = mu * (f64::ln(r_out / radius) - PI * (r_out * r_out - radius * radius) / (2.0 * l * l));
        Ok(RingWithFibers {
            center,
            radius,
            thickness,
            l,
            mu,
            p_in,
        })
    }

    /// Returns the sample ring: center (0.5, 0.5), R = 0.25, w = 0.0625, l = 1, μ = 1
    pub fn sample() -> Self {
        RingWithFibers {
            center: [0.5, 0.5],
            radius: 0.25,
            thickness: 0.0625,
            l: 1.0,
            mu: 1.0,
            p_in: f64::ln(1.25) - PI * (0.3125 * 0.3125 - 0.0625) / 2.0,
        }
    }

    /// Returns the material parameters with the circumferential fiber model
    pub fn param(&self, rho: f64, eta: f64) -> ParamImmersed {
        ParamImmersed {
            rho,
            eta,
            phi_b: 1.0,
            stress: ParamStress::CircumferentialFiber {
                mu: self.mu,
                center: self.center,
            },
        }
    }

    /// Returns the area of the ring in the reference configuration
    pub fn area(&self) -> f64 {
        let r_out = self.radius + self.thickness;
        PI * (r_out * r_out - self.radius * self.radius)
    }

    /// Generates the fluid mesh (n × n cells over the square)
    pub fn fluid_mesh(&self, kind: GeoKind, n: usize) -> Result<Mesh, StrError> {
        SampleMeshes::rectangle(kind, n, n, 0.0, self.l, 0.0, self.l)
    }

    /// Generates the structure mesh
    pub fn solid_mesh(&self, kind: GeoKind, n_radial: usize, n_theta: usize) -> Result<Mesh, StrError> {
        SampleMeshes::ring(
            kind,
            &self.center,
            self.radius,
            self.radius + self.thickness,
            n_radial,
            n_theta,
        )
    }
}

impl ExactSolution for RingWithFibers {
    fn velocity(&self, u: &mut [f64], _x: &[f64]) {
        u[0] = 0.0;
        u[1] = 0.0;
    }

    fn velocity_gradient(&self, grad: &mut Matrix, _x: &[f64]) {
        grad.fill(0.0);
    }

    fn pressure(&self, x: &[f64]) -> f64 {
        let dx = x[0] - self.center[0];
        let dy = x[1] - self.center[1];
        let r = f64::sqrt(dx * dx + dy * dy);
        let r_out = self.radius + self.thickness;
        if r < self.radius {
            self.p_in
        } else if r <= r_out {
            self.p_in - self.mu * f64::ln(r / self.radius)
        } else {
            self.p_in - self.mu * f64::ln(r_out / self.radius)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
