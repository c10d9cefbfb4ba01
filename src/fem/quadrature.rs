use crate::StrError;
use gemlab::integ;
use gemlab::shapes::GeoClass;

/// Returns the 1D iterated trapezoidal points and weights on [-1, 1]
fn trapezoid_1d(n_sub: usize) -> Result<(Vec<f64>, Vec<f64>), StrError> {
    if n_sub < 1 {
        return Err("the number of trapezoid subdivisions must be ≥ 1");
    }
    let h = 2.0 / (n_sub as f64);
    let mut points = Vec::with_capacity(n_sub + 1);
    let mut weights = Vec::with_capacity(n_sub + 1);
    for k in 0..(n_sub + 1) {
        points.push(-1.0 + h * (k as f64));
        weights.push(if k == 0 || k == n_sub { h / 2.0 } else { h });
    }
    Ok((points, weights))
}

/// Holds integration points and weights on the reference cell [-1, 1]ⁿᵈⁱᵐ
#[derive(Clone, Debug)]
pub struct Quadrature {
    /// Reference coordinates of the integration points
    pub points: Vec<Vec<f64>>,

    /// Weights of the integration points
    pub weights: Vec<f64>,
}

impl Quadrature {
    /// Allocates a tensor-product Gauss-Legendre rule with n points per direction
    ///
    /// The points come from gemlab's Legendre sets (Lin, Qua, and Hex classes). Thus, n must be
    /// in [1, 4], except for Hex cells, which require n ≥ 2.
    pub fn gauss(ndim: usize, n: usize) -> Result<Self, StrError> {
        let class = match ndim {
            1 => GeoClass::Lin,
            2 => GeoClass::Qua,
            3 => GeoClass::Hex,
            _ => return Err("ndim must be 1, 2, or 3"),
        };
        if n < 1 || n > 4 {
            return Err("the number of Gauss points per direction must be in [1, 4]");
        }
        let ips = integ::points(class, n.pow(ndim as u32))?;
        Ok(Quadrature {
            points: ips.iter().map(|ip| ip[..ndim].to_vec()).collect(),
            weights: ips.iter().map(|ip| ip[3]).collect(),
        })
    }

    /// Allocates a tensor-product iterated trapezoidal rule with n_sub subdivisions per direction
    ///
    /// The vertices shared by neighboring sub-intervals are merged; hence, the rule has
    /// (n_sub + 1)ⁿᵈⁱᵐ points.
    pub fn trapezoid(ndim: usize, n_sub: usize) -> Result<Self, StrError> {
        let (points, weights) = trapezoid_1d(n_sub)?;
        Quadrature::tensor_product(ndim, &points, &weights)
    }

    /// Returns the number of integration points
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Builds the tensor product of a 1D rule (the first direction runs fastest)
    fn tensor_product(ndim: usize, pts: &[f64], wts: &[f64]) -> Result<Self, StrError> {
        let n = pts.len();
        let (points, weights) = match ndim {
            1 => (pts.iter().map(|x| vec![*x]).collect(), wts.to_vec()),
            2 => {
                let mut points = Vec::with_capacity(n * n);
                let mut weights = Vec::with_capacity(n * n);
                for j in 0..n {
                    for i in 0..n {
                        points.push(vec![pts[i], pts[j]]);
                        weights.push(wts[i] * wts[j]);
                    }
                }
                (points, weights)
            }
            3 => {
                let mut points = Vec::with_capacity(n * n * n);
                let mut weights = Vec::with_capacity(n * n * n);
                for k in 0..n {
                    for j in 0..n {
                        for i in 0..n {
                            points.push(vec![pts[i], pts[j], pts[k]]);
                            weights.push(wts[i] * wts[j] * wts[k]);
                        }
                    }
                }
                (points, weights)
            }
            _ => return Err("ndim must be 1, 2, or 3"),
        };
        Ok(Quadrature { points, weights })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
