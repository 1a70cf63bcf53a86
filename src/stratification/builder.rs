// mitgcmrs-strat/src/stratification/builder.rs

use super::errors::StratificationBuilderError;
use super::stratification::Stratification;
use crate::eos;
use crate::grid::ModelGrid;
use humantime::format_duration;
use log::{debug, info};
use ndarray::{Array2, Array3, Axis};
use ndarray_stats::QuantileExt;
use std::time::Instant;

pub const DEFAULT_RHO_CONST: f64 = 1.035e3;
pub const DEFAULT_GRAVITY: f64 = 9.81;

#[derive(Default)]
pub struct StratificationBuilder<'a> {
    grid: Option<&'a ModelGrid>,
    drhodr: Option<&'a Array3<f64>>,
    rho_anoma: Option<&'a Array3<f64>>,
    theta: Option<&'a Array3<f64>>,
    salt: Option<&'a Array3<f64>>,
    rho_const: Option<&'a f64>,
    gravity: Option<&'a f64>,
}

impl<'a> StratificationBuilder<'a> {
    pub fn build(&self) -> Result<Stratification, StratificationBuilderError> {
        let grid = self.grid.ok_or_else(|| {
            StratificationBuilderError::UninitializedFieldError("grid".to_string())
        })?;
        let drhodr = self.drhodr.ok_or_else(|| {
            StratificationBuilderError::UninitializedFieldError("drhodr".to_string())
        })?;
        Self::validate_field_shape(grid, drhodr, "drhodr")?;
        let rho_anoma = self.rho_anoma.ok_or_else(|| {
            StratificationBuilderError::UninitializedFieldError("rho_anoma".to_string())
        })?;
        Self::validate_field_shape(grid, rho_anoma, "rho_anoma")?;
        let theta = self.theta.ok_or_else(|| {
            StratificationBuilderError::UninitializedFieldError("theta".to_string())
        })?;
        Self::validate_field_shape(grid, theta, "theta")?;
        let salt = self.salt.ok_or_else(|| {
            StratificationBuilderError::UninitializedFieldError("salt".to_string())
        })?;
        Self::validate_field_shape(grid, salt, "salt")?;
        let rho_const = self.rho_const.copied().unwrap_or(DEFAULT_RHO_CONST);
        Self::validate_rho_const(&rho_const)?;
        let gravity = self.gravity.copied().unwrap_or(DEFAULT_GRAVITY);
        Self::validate_gravity(&gravity)?;

        info!(
            "Computing stratification estimates on a (nz, ny, nx) = {:?} grid",
            grid.shape()
        );

        let start = Instant::now();
        let nsq = Self::nsq_from_drhodr(drhodr, grid.mskc(), &rho_const, &gravity);
        debug!(
            "direct estimate took {}",
            format_duration(start.elapsed())
        );

        let start = Instant::now();
        let nsq_ts = Self::assemble_levels(grid, |k| {
            Self::nsq_ts_level(grid, theta, salt, k, &rho_const, &gravity)
        });
        debug!("T/S estimate took {}", format_duration(start.elapsed()));

        let start = Instant::now();
        let nsq_ra = Self::assemble_levels(grid, |k| {
            Self::nsq_ra_level(grid, rho_anoma, k, &rho_const, &gravity)
        });
        debug!(
            "density anomaly estimate took {}",
            format_duration(start.elapsed())
        );

        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Nsq range [{:e}, {:e}], Nsq_TS range [{:e}, {:e}], Nsq_ra range [{:e}, {:e}]",
                nsq.min_skipnan(),
                nsq.max_skipnan(),
                nsq_ts.min_skipnan(),
                nsq_ts.max_skipnan(),
                nsq_ra.min_skipnan(),
                nsq_ra.max_skipnan(),
            );
        }

        Ok(Stratification::new(nsq, nsq_ts, nsq_ra))
    }

    /// Direct estimate from the saved vertical density gradient. Defined at
    /// cell centers; land cells are forced to zero by the mask.
    pub fn nsq_from_drhodr(
        drhodr: &Array3<f64>,
        mskc: &Array3<f64>,
        rho_const: &f64,
        gravity: &f64,
    ) -> Array3<f64> {
        -drhodr * (*gravity / *rho_const) * mskc
    }

    /// One interface slice of the T/S estimate, for a level index k >= 1.
    ///
    /// The densities above and below the interface are both evaluated at the
    /// pressure of the interface itself, so their difference carries no
    /// pressure-dependent contribution. The gradient is valid only where
    /// both neighboring cells are ocean.
    pub fn nsq_ts_level(
        grid: &ModelGrid,
        theta: &Array3<f64>,
        salt: &Array3<f64>,
        k: usize,
        rho_const: &f64,
        gravity: &f64,
    ) -> Array2<f64> {
        // pressure at the interface, in decibars
        let press = -rho_const * gravity * grid.rf()[k] / 1.0e4;
        let urho = eos::densjmd95_level(
            salt.index_axis(Axis(0), k - 1),
            theta.index_axis(Axis(0), k - 1),
            press,
        );
        let lrho = eos::densjmd95_level(
            salt.index_axis(Axis(0), k),
            theta.index_axis(Axis(0), k),
            press,
        );
        let mask =
            &grid.mskc().index_axis(Axis(0), k) * &grid.mskc().index_axis(Axis(0), k - 1);
        let drhodr = (urho - lrho) / grid.drc()[k] * &mask;
        -drhodr * (*gravity / *rho_const)
    }

    /// One interface slice of the anomaly-based estimate, for a level index
    /// k >= 1.
    ///
    /// The anomaly was computed with each level's own local pressure, so the
    /// difference retains a pressure artifact the T/S estimate avoids. Kept
    /// for comparison.
    pub fn nsq_ra_level(
        grid: &ModelGrid,
        rho_anoma: &Array3<f64>,
        k: usize,
        rho_const: &f64,
        gravity: &f64,
    ) -> Array2<f64> {
        let upper = &rho_anoma.index_axis(Axis(0), k - 1) + *rho_const;
        let lower = &rho_anoma.index_axis(Axis(0), k) + *rho_const;
        let mask =
            &grid.mskc().index_axis(Axis(0), k) * &grid.mskc().index_axis(Axis(0), k - 1);
        let drhodz = (upper - lower) / grid.drc()[k] * &mask;
        -drhodz * (*gravity / *rho_const)
    }

    // Interface estimates are undefined at the top level; it stays zero.
    fn assemble_levels<F>(grid: &ModelGrid, level_fn: F) -> Array3<f64>
    where
        F: Fn(usize) -> Array2<f64>,
    {
        let (nz, ny, nx) = grid.shape();
        let mut result = Array3::zeros((nz, ny, nx));
        for k in 1..nz {
            result.index_axis_mut(Axis(0), k).assign(&level_fn(k));
        }
        result
    }

    fn validate_field_shape(
        grid: &ModelGrid,
        field: &Array3<f64>,
        name: &'static str,
    ) -> Result<(), StratificationBuilderError> {
        if field.dim() != grid.shape() {
            return Err(StratificationBuilderError::FieldShapeMismatch(
                name,
                field.dim(),
                grid.shape(),
            ));
        }
        Ok(())
    }

    fn validate_rho_const(rho_const: &f64) -> Result<(), StratificationBuilderError> {
        if !(*rho_const > 0.0) {
            return Err(StratificationBuilderError::InvalidRhoConst(*rho_const));
        }
        Ok(())
    }

    fn validate_gravity(gravity: &f64) -> Result<(), StratificationBuilderError> {
        if !(*gravity > 0.0) {
            return Err(StratificationBuilderError::InvalidGravity(*gravity));
        }
        Ok(())
    }

    pub fn grid(&mut self, grid: &'a ModelGrid) -> &mut Self {
        self.grid = Some(grid);
        self
    }

    pub fn drhodr(&mut self, drhodr: &'a Array3<f64>) -> &mut Self {
        self.drhodr = Some(drhodr);
        self
    }

    pub fn rho_anoma(&mut self, rho_anoma: &'a Array3<f64>) -> &mut Self {
        self.rho_anoma = Some(rho_anoma);
        self
    }

    pub fn theta(&mut self, theta: &'a Array3<f64>) -> &mut Self {
        self.theta = Some(theta);
        self
    }

    pub fn salt(&mut self, salt: &'a Array3<f64>) -> &mut Self {
        self.salt = Some(salt);
        self
    }

    pub fn rho_const(&mut self, rho_const: &'a f64) -> &mut Self {
        self.rho_const = Some(rho_const);
        self
    }

    pub fn gravity(&mut self, gravity: &'a f64) -> &mut Self {
        self.gravity = Some(gravity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ModelGrid;
    use ndarray::{Array1, Array2, Array3};

    fn water_column_grid(nz: usize, hfacc: Array3<f64>) -> ModelGrid {
        let (_, ny, nx) = hfacc.dim();
        let mut drc = Array1::from_elem(nz, 10.0);
        drc[0] = f64::NAN;
        ModelGrid::from_arrays(
            Array2::zeros((ny, nx)),
            Array2::from_shape_fn((ny, nx), |(j, _)| j as f64),
            Array1::from_shape_fn(nz, |k| -5.0 - 10.0 * k as f64),
            Array1::from_shape_fn(nz, |k| -10.0 * k as f64),
            drc,
            hfacc,
        )
        .unwrap()
    }

    fn build(
        grid: &ModelGrid,
        drhodr: &Array3<f64>,
        rho_anoma: &Array3<f64>,
        theta: &Array3<f64>,
        salt: &Array3<f64>,
    ) -> Stratification {
        let mut builder = StratificationBuilder::default();
        builder.grid(grid);
        builder.drhodr(drhodr);
        builder.rho_anoma(rho_anoma);
        builder.theta(theta);
        builder.salt(salt);
        builder.build().unwrap()
    }

    #[test]
    fn top_level_has_no_interface_estimate() {
        let grid = water_column_grid(3, Array3::ones((3, 2, 2)));
        let theta = Array3::from_shape_fn((3, 2, 2), |(k, j, i)| 15.0 - (k + j + i) as f64);
        let salt = Array3::from_shape_fn((3, 2, 2), |(k, _, _)| 34.0 + 0.2 * k as f64);
        let strat = build(
            &grid,
            &Array3::zeros((3, 2, 2)),
            &Array3::zeros((3, 2, 2)),
            &theta,
            &salt,
        );
        for j in 0..2 {
            for i in 0..2 {
                assert_eq!(strat.nsq_ts()[[0, j, i]], 0.0);
                assert_eq!(strat.nsq_ra()[[0, j, i]], 0.0);
            }
        }
        // interior interfaces of a cold-under-warm column are stable
        assert!(strat.nsq_ts()[[1, 0, 0]] > 0.0);
    }

    #[test]
    fn masked_neighbors_zero_the_interface_estimates() {
        let mut hfacc = Array3::ones((3, 1, 2));
        hfacc[[1, 0, 0]] = 0.0; // land cell in the middle of the first column
        let grid = water_column_grid(3, hfacc);
        let theta = Array3::from_shape_fn((3, 1, 2), |(k, _, _)| 15.0 - 2.0 * k as f64);
        let salt = Array3::from_elem((3, 1, 2), 34.5);
        let rho_anoma = Array3::from_shape_fn((3, 1, 2), |(k, _, _)| 0.5 * k as f64);
        let strat = build(
            &grid,
            &Array3::zeros((3, 1, 2)),
            &rho_anoma,
            &theta,
            &salt,
        );
        // both interfaces touching the land cell are zeroed
        assert_eq!(strat.nsq_ts()[[1, 0, 0]], 0.0);
        assert_eq!(strat.nsq_ts()[[2, 0, 0]], 0.0);
        assert_eq!(strat.nsq_ra()[[1, 0, 0]], 0.0);
        assert_eq!(strat.nsq_ra()[[2, 0, 0]], 0.0);
        // the all-ocean column is untouched
        assert!(strat.nsq_ts()[[1, 0, 1]] > 0.0);
        assert!(strat.nsq_ra()[[1, 0, 1]] > 0.0);
    }

    #[test]
    fn direct_estimate_is_an_affine_map() {
        let mut hfacc = Array3::ones((2, 2, 2));
        hfacc[[1, 1, 1]] = 0.0;
        let grid = water_column_grid(2, hfacc);
        let drhodr = Array3::from_shape_fn((2, 2, 2), |(k, j, i)| {
            -1e-3 * (1 + k + 2 * j + 4 * i) as f64
        });
        let (rho_const, gravity) = (DEFAULT_RHO_CONST, DEFAULT_GRAVITY);
        let nsq =
            StratificationBuilder::nsq_from_drhodr(&drhodr, grid.mskc(), &rho_const, &gravity);
        for ((k, j, i), &value) in nsq.indexed_iter() {
            let expected =
                -drhodr[[k, j, i]] * gravity / rho_const * grid.mskc()[[k, j, i]];
            assert!((value - expected).abs() < 1e-15);
        }
        assert_eq!(nsq[[1, 1, 1]], 0.0);

        // linear in the input gradient
        let scaled = StratificationBuilder::nsq_from_drhodr(
            &(&drhodr * 3.0),
            grid.mskc(),
            &rho_const,
            &gravity,
        );
        for ((k, j, i), &value) in scaled.indexed_iter() {
            assert!((value - 3.0 * nsq[[k, j, i]]).abs() < 1e-15);
        }
    }

    #[test]
    fn uniform_water_column_is_neutrally_stratified() {
        let grid = water_column_grid(3, Array3::ones((3, 1, 1)));
        let theta = Array3::from_elem((3, 1, 1), 10.0);
        let salt = Array3::from_elem((3, 1, 1), 35.0);
        let strat = build(
            &grid,
            &Array3::zeros((3, 1, 1)),
            &Array3::zeros((3, 1, 1)),
            &theta,
            &salt,
        );
        for k in 0..3 {
            assert_eq!(strat.nsq_ts()[[k, 0, 0]], 0.0);
        }
    }

    #[test]
    fn anomaly_estimate_recovers_a_linear_profile() {
        let grid = water_column_grid(3, Array3::ones((3, 1, 1)));
        // density grows by 0.5 kg/m^3 per level over drc = 10 m
        let rho_anoma = Array3::from_shape_fn((3, 1, 1), |(k, _, _)| 0.5 * k as f64);
        let theta = Array3::from_elem((3, 1, 1), 10.0);
        let salt = Array3::from_elem((3, 1, 1), 35.0);
        let strat = build(
            &grid,
            &Array3::zeros((3, 1, 1)),
            &rho_anoma,
            &theta,
            &salt,
        );
        let expected = 0.05 * DEFAULT_GRAVITY / DEFAULT_RHO_CONST;
        for k in 1..3 {
            assert!((strat.nsq_ra()[[k, 0, 0]] - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_uninitialized_fields() {
        let grid = water_column_grid(2, Array3::ones((2, 1, 1)));
        let mut builder = StratificationBuilder::default();
        builder.grid(&grid);
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            StratificationBuilderError::UninitializedFieldError(_)
        ));
    }

    #[test]
    fn rejects_mismatched_field_shapes() {
        let grid = water_column_grid(2, Array3::ones((2, 1, 1)));
        let drhodr = Array3::zeros((2, 1, 2));
        let zeros = Array3::zeros((2, 1, 1));
        let mut builder = StratificationBuilder::default();
        builder.grid(&grid);
        builder.drhodr(&drhodr);
        builder.rho_anoma(&zeros);
        builder.theta(&zeros);
        builder.salt(&zeros);
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            StratificationBuilderError::FieldShapeMismatch("drhodr", _, _)
        ));
    }
}
