use pretty_env_logger;
use std::sync::Once;

static INIT: Once = Once::new();

pub fn _setup_pretty_env_logger_default() {
    INIT.call_once(|| {
        pretty_env_logger::init();
    });
}

pub use stratification::{Stratification, StratificationBuilder};

pub mod eos;
pub mod grid;
pub mod mds;
pub mod stratification;
