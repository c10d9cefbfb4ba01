use crate::StrError;
use gemlab::mesh::{Cell, Mesh, Point};
use gemlab::shapes::GeoKind;
use std::f64::consts::PI;

/// Generates structured meshes for the fluid domain and the immersed structure
pub struct SampleMeshes {}

impl SampleMeshes {
    /// Generates a structured mesh of quadrilaterals over a rectangle
    ///
    /// ```text
    ///  ymax  3-----6-----2
    ///        |           |     node numbering of one Qua9 cell
    ///        7     8     5     (Qua8 has no center node; Qua4 has corners only)
    ///        |           |
    ///  ymin  0-----4-----1
    ///      xmin         xmax
    /// ```
    ///
    /// # Input
    ///
    /// * `kind` -- Qua4, Qua8, or Qua9
    /// * `nx` -- number of cells along x
    /// * `ny` -- number of cells along y
    pub fn rectangle(
        kind: GeoKind,
        nx: usize,
        ny: usize,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    ) -> Result<Mesh, StrError> {
        if nx < 1 || ny < 1 {
            return Err("the number of cells along each direction must be ≥ 1");
        }
        if xmax <= xmin || ymax <= ymin {
            return Err("the rectangle limits are incorrect");
        }
        let step = match kind {
            GeoKind::Qua4 => 1,
            GeoKind::Qua8 | GeoKind::Qua9 => 2,
            _ => return Err("rectangle requires Qua4, Qua8, or Qua9"),
        };
        let skip_center = kind == GeoKind::Qua8;
        let (ni, nj) = (step * nx + 1, step * ny + 1);
        let mut ids = vec![None; ni * nj];
        let mut points = Vec::new();
        for j in 0..nj {
            for i in 0..ni {
                if skip_center && i % 2 == 1 && j % 2 == 1 {
                    continue;
                }
                let id = points.len();
                let x = xmin + (xmax - xmin) * (i as f64) / ((ni - 1) as f64);
                let y = ymin + (ymax - ymin) * (j as f64) / ((nj - 1) as f64);
                points.push(Point {
                    id,
                    marker: 0,
                    coords: vec![x, y],
                });
                ids[i + j * ni] = Some(id);
            }
        }
        let mut cells = Vec::new();
        for cj in 0..ny {
            for ci in 0..nx {
                let (i0, j0) = (step * ci, step * cj);
                let at = |di: usize, dj: usize| ids[(i0 + di) + (j0 + dj) * ni];
                let mut local = vec![at(0, 0), at(step, 0), at(step, step), at(0, step)];
                if step == 2 {
                    local.extend_from_slice(&[at(1, 0), at(2, 1), at(1, 2), at(0, 1)]);
                    if !skip_center {
                        local.push(at(1, 1));
                    }
                }
                let cell_points = local.iter().map(|p| p.ok_or("internal error: missing point")).collect::<Result<Vec<_>, _>>()?;
                cells.push(Cell {
                    id: cells.len(),
                    attribute: 1,
                    kind,
                    points: cell_points,
                });
            }
        }
        Ok(Mesh { ndim: 2, points, cells })
    }

    /// Generates a structured mesh of Hex8 cells over a box
    ///
    /// ```text
    ///       7--------------6
    ///      /.             /|
    ///     / .            / |    node numbering of one cell
    ///    /  .           /  |
    ///   /   .          /   |          z
    ///  4--------------5    |          ↑
    ///  |    3---------|----2          o → y
    ///  |   /          |   /          ↙
    ///  |  /           |  /          x
    ///  | /            | /
    ///  |/             |/
    ///  0--------------1
    /// ```
    pub fn block(nx: usize, ny: usize, nz: usize, min: &[f64; 3], max: &[f64; 3]) -> Result<Mesh, StrError> {
        if nx < 1 || ny < 1 || nz < 1 {
            return Err("the number of cells along each direction must be ≥ 1");
        }
        if max[0] <= min[0] || max[1] <= min[1] || max[2] <= min[2] {
            return Err("the box limits are incorrect");
        }
        let (ni, nj, nk) = (nx + 1, ny + 1, nz + 1);
        let mut points = Vec::new();
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    let x = min[0] + (max[0] - min[0]) * (i as f64) / (nx as f64);
                    let y = min[1] + (max[1] - min[1]) * (j as f64) / (ny as f64);
                    let z = min[2] + (max[2] - min[2]) * (k as f64) / (nz as f64);
                    points.push(Point {
                        id: points.len(),
                        marker: 0,
                        coords: vec![x, y, z],
                    });
                }
            }
        }
        let id = |i: usize, j: usize, k: usize| i + j * ni + k * ni * nj;
        let mut cells = Vec::new();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    #[rustfmt::skip]
                    let cell_points = vec![
                        id(i, j, k),     id(i + 1, j, k),     id(i + 1, j + 1, k),     id(i, j + 1, k),
                        id(i, j, k + 1), id(i + 1, j, k + 1), id(i + 1, j + 1, k + 1), id(i, j + 1, k + 1),
                    ];
                    cells.push(Cell {
                        id: cells.len(),
                        attribute: 1,
                        kind: GeoKind::Hex8,
                        points: cell_points,
                    });
                }
            }
        }
        Ok(Mesh { ndim: 3, points, cells })
    }

    /// Generates a ring (annulus) of quadrilaterals about a center
    ///
    /// The first reference direction (ξ₀) follows the radius and the second (ξ₁) follows
    /// the angle (counterclockwise); thus, all cells have a positive Jacobian. The mid
    /// nodes of Qua9 cells are placed on the circles.
    ///
    /// # Input
    ///
    /// * `kind` -- Qua4 or Qua9
    /// * `center` -- center of the ring
    /// * `r_in` -- inner radius
    /// * `r_out` -- outer radius
    /// * `n_radial` -- number of cells across the thickness
    /// * `n_theta` -- number of cells around the ring (≥ 3)
    pub fn ring(
        kind: GeoKind,
        center: &[f64; 2],
        r_in: f64,
        r_out: f64,
        n_radial: usize,
        n_theta: usize,
    ) -> Result<Mesh, StrError> {
        if r_in <= 0.0 || r_out <= r_in {
            return Err("the radii must satisfy 0 < r_in < r_out");
        }
        if n_radial < 1 || n_theta < 3 {
            return Err("ring requires n_radial ≥ 1 and n_theta ≥ 3");
        }
        let step = match kind {
            GeoKind::Qua4 => 1,
            GeoKind::Qua9 => 2,
            _ => return Err("ring requires Qua4 or Qua9"),
        };
        let (ni, nj) = (step * n_radial + 1, step * n_theta);
        let mut points = Vec::new();
        for j in 0..nj {
            let theta = 2.0 * PI * (j as f64) / (nj as f64);
            for i in 0..ni {
                let r = r_in + (r_out - r_in) * (i as f64) / ((ni - 1) as f64);
                points.push(Point {
                    id: points.len(),
                    marker: 0,
                    coords: vec![center[0] + r * f64::cos(theta), center[1] + r * f64::sin(theta)],
                });
            }
        }
        let id = |i: usize, j: usize| i + (j % nj) * ni;
        let mut cells = Vec::new();
        for cj in 0..n_theta {
            for ci in 0..n_radial {
                let (i0, j0) = (step * ci, step * cj);
                let mut cell_points = vec![id(i0, j0), id(i0 + step, j0), id(i0 + step, j0 + step), id(i0, j0 + step)];
                if step == 2 {
                    cell_points.extend_from_slice(&[
                        id(i0 + 1, j0),
                        id(i0 + 2, j0 + 1),
                        id(i0 + 1, j0 + 2),
                        id(i0, j0 + 1),
                        id(i0 + 1, j0 + 1),
                    ]);
                }
                cells.push(Cell {
                    id: cells.len(),
                    attribute: 1,
                    kind,
                    points: cell_points,
                });
            }
        }
        Ok(Mesh { ndim: 2, points, cells })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
