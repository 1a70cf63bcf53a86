// src/bin/est_nsq.rs

use clap::Parser;
use log::info;
use mitgcmrs_strat::grid::ModelGrid;
use mitgcmrs_strat::mds;
use mitgcmrs_strat::stratification::StratificationBuilder;
use ndarray::{Array3, Ix3};
use pretty_env_logger;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

const VERSION: &'static str = env! {"MITGCMRS_STRAT_VERSION"};

#[derive(Parser, Debug)]
#[command(
    author,
    about = "Estimate the Brunt-Vaisala frequency squared (N^2) from MITgcm output",
    long_about = "Computes three alternative N^2 estimates for one model snapshot: directly \
                  from the saved DRHODR diagnostic, from temperature and salinity via the \
                  JMD95 equation of state evaluated at the layer-interface pressure, and \
                  from the saved density anomaly. The three are compared side by side in a \
                  filled-contour plot over a depth-by-latitude slice."
)]
#[command(version = VERSION)]
struct Cli {
    /// Directory holding the model output (.meta/.data pairs)
    run_path: PathBuf,

    #[clap(long, help = "Directory holding the grid files; defaults to the run directory")]
    grid_dir: Option<PathBuf>,

    #[clap(short, long, help = "Model iteration number of the snapshot")]
    iter: u64,

    #[clap(
        long,
        default_value = "ocestrat",
        help = "Dataset holding DRHODR and RHOAnoma"
    )]
    strat_prefix: String,

    #[clap(long, default_value = "0", help = "Record index of DRHODR")]
    drhodr_rec: usize,

    #[clap(long, default_value = "1", help = "Record index of RHOAnoma")]
    rho_anoma_rec: usize,

    #[clap(
        long,
        default_value = "dynDiag",
        help = "Dataset holding THETA and SALT"
    )]
    diag_prefix: String,

    #[clap(long, default_value = "2", help = "Record index of THETA")]
    theta_rec: usize,

    #[clap(long, default_value = "3", help = "Record index of SALT")]
    salt_rec: usize,

    #[clap(long, default_value = "1035.", help = "Reference density (kg/m^3)")]
    rho_const: f64,

    #[clap(long, default_value = "9.81", help = "Gravitational acceleration (m/s^2)")]
    gravity: f64,

    #[clap(long, default_value = "5", help = "Longitude index of the shown slice")]
    longitude_index: usize,

    #[clap(long, default_value = "5", help = "Number of surface levels to show")]
    levels: usize,

    #[clap(long, default_value = "1e5", help = "Display scale factor applied to N^2")]
    scale: f64,

    #[clap(long, action)]
    show_plot: bool,

    #[clap(long, help = "Write the comparison plot to an HTML file")]
    save_plot: Option<PathBuf>,

    #[clap(long, help = "Write a per-level profile summary as CSV")]
    output_csv: Option<PathBuf>,
}

fn read_field(
    dir: &PathBuf,
    prefix: &str,
    iteration: u64,
    record: usize,
) -> Result<Array3<f64>, Box<dyn Error>> {
    let field = mds::read_mds(dir, prefix, Some(iteration), record)?;
    Ok(field.into_dimensionality::<Ix3>()?)
}

fn entrypoint() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let grid_dir = cli.grid_dir.clone().unwrap_or_else(|| cli.run_path.clone());
    let grid = ModelGrid::try_from(&grid_dir)?;
    info!("Grid dimensions (nz, ny, nx) = {:?}", grid.shape());

    let drhodr = read_field(&cli.run_path, &cli.strat_prefix, cli.iter, cli.drhodr_rec)?;
    let rho_anoma = read_field(&cli.run_path, &cli.strat_prefix, cli.iter, cli.rho_anoma_rec)?;
    let theta = read_field(&cli.run_path, &cli.diag_prefix, cli.iter, cli.theta_rec)?;
    let salt = read_field(&cli.run_path, &cli.diag_prefix, cli.iter, cli.salt_rec)?;

    let mut builder = StratificationBuilder::default();
    builder.grid(&grid);
    builder.drhodr(&drhodr);
    builder.rho_anoma(&rho_anoma);
    builder.theta(&theta);
    builder.salt(&salt);
    builder.rho_const(&cli.rho_const);
    builder.gravity(&cli.gravity);
    let stratification = builder.build()?;

    if let Some(ref path) = cli.output_csv {
        stratification.write_profile_csv(&grid, path)?;
        println!("Profile summary written to: {}", path.display());
    }

    if cli.show_plot || cli.save_plot.is_some() {
        let plot = stratification.make_comparison_plot(
            &grid,
            cli.longitude_index,
            cli.levels,
            cli.scale,
        )?;
        if let Some(ref path) = cli.save_plot {
            plot.write_html(path);
            println!("Comparison plot written to: {}", path.display());
        }
        if cli.show_plot {
            plot.show();
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    match entrypoint() {
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}
