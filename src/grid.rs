// mitgcmrs-strat/src/grid.rs

use crate::mds::{self, MdsError};
use log::{debug, info};
use ndarray::{Array1, Array2, Array3, ArrayD, Ix3};
use std::path::PathBuf;
use thiserror::Error;

/// Static cell-centered description of a model grid.
///
/// `xc`/`yc` are the horizontal cell-center coordinates shaped (ny, nx),
/// `rc` the cell-center depths, `rf` the cell-interface depths, `drc` the
/// vertical spacing between adjacent centers, and `hfacc` the fractional
/// open height of each cell shaped (nz, ny, nx). The ocean mask `mskc` is
/// derived from `hfacc`: 1.0 where the cell has any open water, 0.0 on land
/// and below the bottom.
#[derive(Debug)]
pub struct ModelGrid {
    xc: Array2<f64>,
    yc: Array2<f64>,
    rc: Array1<f64>,
    rf: Array1<f64>,
    drc: Array1<f64>,
    hfacc: Array3<f64>,
    mskc: Array3<f64>,
}

impl ModelGrid {
    /// Assemble a grid from already-loaded arrays, validating that every
    /// array agrees on (nz, ny, nx).
    pub fn from_arrays(
        xc: Array2<f64>,
        yc: Array2<f64>,
        rc: Array1<f64>,
        rf: Array1<f64>,
        drc: Array1<f64>,
        hfacc: Array3<f64>,
    ) -> Result<Self, GridError> {
        let (nz, ny, nx) = hfacc.dim();
        if xc.dim() != (ny, nx) {
            return Err(GridError::HorizontalShapeMismatch(
                "XC",
                vec![xc.dim().0, xc.dim().1],
                vec![ny, nx],
            ));
        }
        if yc.dim() != (ny, nx) {
            return Err(GridError::HorizontalShapeMismatch(
                "YC",
                vec![yc.dim().0, yc.dim().1],
                vec![ny, nx],
            ));
        }
        if rc.len() != nz {
            return Err(GridError::WrongLength("RC", nz, rc.len()));
        }
        if drc.len() != nz {
            return Err(GridError::WrongLength("DRC", nz, drc.len()));
        }
        if rf.len() < nz {
            return Err(GridError::WrongLength("RF", nz, rf.len()));
        }
        let mskc = hfacc.mapv(|h| if h > 0.0 { 1.0 } else { 0.0 });
        debug!("grid assembled with (nz, ny, nx) = ({}, {}, {})", nz, ny, nx);
        Ok(Self {
            xc,
            yc,
            rc,
            rf,
            drc,
            hfacc,
            mskc,
        })
    }

    pub fn nz(&self) -> usize {
        self.hfacc.shape()[0]
    }

    pub fn ny(&self) -> usize {
        self.hfacc.shape()[1]
    }

    pub fn nx(&self) -> usize {
        self.hfacc.shape()[2]
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.hfacc.dim()
    }

    pub fn xc(&self) -> &Array2<f64> {
        &self.xc
    }

    pub fn yc(&self) -> &Array2<f64> {
        &self.yc
    }

    pub fn rc(&self) -> &Array1<f64> {
        &self.rc
    }

    pub fn rf(&self) -> &Array1<f64> {
        &self.rf
    }

    pub fn drc(&self) -> &Array1<f64> {
        &self.drc
    }

    pub fn hfacc(&self) -> &Array3<f64> {
        &self.hfacc
    }

    pub fn mskc(&self) -> &Array3<f64> {
        &self.mskc
    }
}

impl TryFrom<&PathBuf> for ModelGrid {
    type Error = GridError;

    fn try_from(grid_dir: &PathBuf) -> Result<Self, Self::Error> {
        info!("Loading model grid from {}", grid_dir.display());
        let xc = to_array2(mds::read_mds(grid_dir, "XC", None, 0)?, "XC")?;
        let yc = to_array2(mds::read_mds(grid_dir, "YC", None, 0)?, "YC")?;
        let rc = to_array1(mds::read_mds(grid_dir, "RC", None, 0)?, "RC")?;
        let rf = to_array1(mds::read_mds(grid_dir, "RF", None, 0)?, "RF")?;
        let drc = to_array1(mds::read_mds(grid_dir, "DRC", None, 0)?, "DRC")?;
        let hfacc = to_array3(mds::read_mds(grid_dir, "hFacC", None, 0)?, "hFacC")?;
        Self::from_arrays(xc, yc, rc, rf, drc, hfacc)
    }
}

// Vertical grid variables come shaped (nz, 1, 1); flatten them in logical
// order.
fn to_array1(array: ArrayD<f64>, name: &'static str) -> Result<Array1<f64>, GridError> {
    let non_singleton = array.shape().iter().filter(|&&d| d > 1).count();
    if non_singleton > 1 {
        return Err(GridError::WrongRank(name, 1, array.shape().to_vec()));
    }
    Ok(array.iter().copied().collect())
}

fn to_array2(array: ArrayD<f64>, name: &'static str) -> Result<Array2<f64>, GridError> {
    let shape: Vec<usize> = array.shape().iter().copied().filter(|&d| d != 1).collect();
    if shape.len() != 2 {
        return Err(GridError::WrongRank(name, 2, array.shape().to_vec()));
    }
    let values: Vec<f64> = array.iter().copied().collect();
    Ok(Array2::from_shape_vec((shape[0], shape[1]), values)?)
}

fn to_array3(array: ArrayD<f64>, name: &'static str) -> Result<Array3<f64>, GridError> {
    if array.ndim() != 3 {
        return Err(GridError::WrongRank(name, 3, array.shape().to_vec()));
    }
    Ok(array.into_dimensionality::<Ix3>()?)
}

#[derive(Error, Debug)]
pub enum GridError {
    #[error(transparent)]
    MdsError(#[from] MdsError),
    #[error(transparent)]
    ShapeError(#[from] ndarray::ShapeError),
    #[error("{0} must be {1}-dimensional, but got shape {2:?}")]
    WrongRank(&'static str, usize, Vec<usize>),
    #[error("{0} has horizontal shape {1:?} but the grid is {2:?}")]
    HorizontalShapeMismatch(&'static str, Vec<usize>, Vec<usize>),
    #[error("{0} must hold one value per level ({1}), but got {2}")]
    WrongLength(&'static str, usize, usize),
}
