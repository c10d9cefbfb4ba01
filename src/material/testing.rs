use super::StressModel;
use russell_lab::{approx_eq, Matrix};

/// Compares the analytical derivative of Pe·Fᵀ with central differences
pub fn check_derivative(model: &dyn StressModel, ff: &Matrix, x_ref: &[f64], tol: f64) {
    let ndim = ff.dims().0;
    let h = 1e-6;
    let grad = [0.3, -0.7, 0.45];
    let mut dd = Matrix::new(ndim, ndim);
    let mut pe = Matrix::new(ndim, ndim);
    let mut pe_ft_p = Matrix::new(ndim, ndim);
    let mut pe_ft_m = Matrix::new(ndim, ndim);
    for k in 0..ndim {
        model.pe_ft_derivative(&mut dd, ff, x_ref, k, &grad[..ndim]).unwrap();
        let mut ff_p = ff.clone();
        let mut ff_m = ff.clone();
        for l in 0..ndim {
            ff_p.add(k, l, h * grad[l]);
            ff_m.add(k, l, -h * grad[l]);
        }
        model.stress_times_ft(&mut pe_ft_p, &mut pe, &ff_p, x_ref).unwrap();
        model.stress_times_ft(&mut pe_ft_m, &mut pe, &ff_m, x_ref).unwrap();
        for i in 0..ndim {
            for j in 0..ndim {
                let num = (pe_ft_p.get(i, j) - pe_ft_m.get(i, j)) / (2.0 * h);
                approx_eq(dd.get(i, j), num, tol);
            }
        }
    }
}

/// Returns a sample deformation gradient
pub fn sample_ff(ndim: usize) -> Matrix {
    if ndim == 2 {
        Matrix::from(&[[1.1, 0.2], [-0.15, 0.95]])
    } else {
        Matrix::from(&[[1.1, 0.2, 0.05], [-0.15, 0.95, 0.1], [0.02, -0.08, 1.05]])
    }
}
