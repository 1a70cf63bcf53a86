// mitgcmrs-strat/src/eos.rs

//! In-situ seawater density after Jackett and McDougall (1995).
//!
//! This is the polynomial equation of state MITgcm evaluates when run with
//! `eosType = 'JMD95Z'`: a surface density polynomial divided by a secant
//! bulk modulus term. Pressure is taken in decibars and converted to bars
//! internally. Check value: rho(35.5 PSU, 3 degC, 3000 dbar) = 1041.83267
//! kg/m^3.

use libm::sqrt;
use ndarray::{Array2, ArrayView2, Zip};

// density of fresh water at p = 0
const EOS_JMDC_FW: [f64; 6] = [
    999.842594,
    6.793952e-02,
    -9.095290e-03,
    1.001685e-04,
    -1.120083e-06,
    6.536332e-09,
];

// density of sea water at p = 0
const EOS_JMDC_SW: [f64; 9] = [
    8.244930e-01,
    -4.089900e-03,
    7.643800e-05,
    -8.246700e-07,
    5.387500e-09,
    -5.724660e-03,
    1.022700e-04,
    -1.654600e-06,
    4.831400e-04,
];

// secant bulk modulus K of fresh water at p = 0
const EOS_JMDC_KFW: [f64; 5] = [
    1.965933e+04,
    1.444304e+02,
    -1.706103e+00,
    9.648704e-03,
    -4.190253e-05,
];

// secant bulk modulus K of sea water at p = 0
const EOS_JMDC_KSW: [f64; 7] = [
    5.284855e+01,
    -3.101089e-01,
    6.283263e-03,
    -5.084188e-05,
    3.886640e-01,
    9.085835e-03,
    -4.619924e-04,
];

// secant bulk modulus K of sea water at pressure p
const EOS_JMDC_KP: [f64; 14] = [
    3.186519e+00,
    2.212276e-02,
    -2.984642e-04,
    1.956415e-06,
    6.704388e-03,
    -1.847318e-04,
    2.059331e-07,
    1.480266e-04,
    2.102898e-04,
    -1.202016e-05,
    1.394680e-07,
    -2.040237e-06,
    6.128773e-08,
    6.207323e-10,
];

/// In-situ density (kg/m^3) from salinity (PSU), potential temperature
/// (degC) and pressure (dbar).
pub fn densjmd95(salt: f64, theta: f64, pressure: f64) -> f64 {
    let p = 0.1 * pressure; // dbar -> bar
    let t = theta;
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let s = salt;
    let s3o2 = s * sqrt(s);

    // density of fresh water at the surface
    let mut rho = EOS_JMDC_FW[0]
        + EOS_JMDC_FW[1] * t
        + EOS_JMDC_FW[2] * t2
        + EOS_JMDC_FW[3] * t3
        + EOS_JMDC_FW[4] * t4
        + EOS_JMDC_FW[5] * t4 * t;
    // density of sea water at the surface
    rho += s
        * (EOS_JMDC_SW[0]
            + EOS_JMDC_SW[1] * t
            + EOS_JMDC_SW[2] * t2
            + EOS_JMDC_SW[3] * t3
            + EOS_JMDC_SW[4] * t4)
        + s3o2 * (EOS_JMDC_SW[5] + EOS_JMDC_SW[6] * t + EOS_JMDC_SW[7] * t2)
        + EOS_JMDC_SW[8] * s * s;

    rho / (1.0 - p / bulkmodjmd95(s, t, p))
}

/// Elementwise density for one model level, every cell evaluated at the same
/// pressure.
pub fn densjmd95_level(
    salt: ArrayView2<f64>,
    theta: ArrayView2<f64>,
    pressure: f64,
) -> Array2<f64> {
    Zip::from(salt)
        .and(theta)
        .map_collect(|&s, &t| densjmd95(s, t, pressure))
}

// secant bulk modulus, pressure already in bars
fn bulkmodjmd95(s: f64, t: f64, p: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let s3o2 = s * sqrt(s);

    let mut bulkmod = EOS_JMDC_KFW[0]
        + EOS_JMDC_KFW[1] * t
        + EOS_JMDC_KFW[2] * t2
        + EOS_JMDC_KFW[3] * t3
        + EOS_JMDC_KFW[4] * t4;
    bulkmod += s
        * (EOS_JMDC_KSW[0] + EOS_JMDC_KSW[1] * t + EOS_JMDC_KSW[2] * t2 + EOS_JMDC_KSW[3] * t3)
        + s3o2 * (EOS_JMDC_KSW[4] + EOS_JMDC_KSW[5] * t + EOS_JMDC_KSW[6] * t2);
    bulkmod += p * (EOS_JMDC_KP[0] + EOS_JMDC_KP[1] * t + EOS_JMDC_KP[2] * t2 + EOS_JMDC_KP[3] * t3)
        + p * s * (EOS_JMDC_KP[4] + EOS_JMDC_KP[5] * t + EOS_JMDC_KP[6] * t2)
        + p * s3o2 * EOS_JMDC_KP[7]
        + p * p * (EOS_JMDC_KP[8] + EOS_JMDC_KP[9] * t + EOS_JMDC_KP[10] * t2)
        + p * p * s * (EOS_JMDC_KP[11] + EOS_JMDC_KP[12] * t + EOS_JMDC_KP[13] * t2);
    bulkmod
}
