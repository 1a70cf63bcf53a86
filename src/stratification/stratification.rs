// mitgcmrs-strat/src/stratification/stratification.rs

use super::errors::{ComparisonPlotError, ProfileExportError};
use crate::grid::ModelGrid;
use ndarray::{Array3, Axis};
use plotly::color::NamedColor;
use plotly::common::{ColorScale, ColorScalePalette, Font, Title};
use plotly::contour::{Coloring, Contours};
use plotly::layout::{Annotation, Axis as LayoutAxis, GridPattern, Layout, LayoutGrid};
use plotly::{Contour, Plot};
use std::path::PathBuf;

/// Three alternative estimates of the Brunt-Vaisala frequency squared on one
/// model snapshot, each shaped (nz, ny, nx).
///
/// `nsq` comes straight from the saved vertical density gradient and lives
/// at cell centers. `nsq_ts` is recomputed from temperature and salinity at
/// the layer interfaces. `nsq_ra` differences the saved density anomaly and
/// is kept for comparison only.
#[derive(Debug)]
pub struct Stratification {
    nsq: Array3<f64>,
    nsq_ts: Array3<f64>,
    nsq_ra: Array3<f64>,
}

impl Stratification {
    pub(crate) fn new(nsq: Array3<f64>, nsq_ts: Array3<f64>, nsq_ra: Array3<f64>) -> Self {
        Self {
            nsq,
            nsq_ts,
            nsq_ra,
        }
    }

    pub fn nsq(&self) -> &Array3<f64> {
        &self.nsq
    }

    pub fn nsq_ts(&self) -> &Array3<f64> {
        &self.nsq_ts
    }

    pub fn nsq_ra(&self) -> &Array3<f64> {
        &self.nsq_ra
    }

    pub fn nz(&self) -> usize {
        self.nsq.shape()[0]
    }

    /// Three filled-contour panels over a depth-by-latitude slice at a fixed
    /// longitude index, one per method, with shared contour levels 0..15
    /// after scaling.
    pub fn make_comparison_plot(
        &self,
        grid: &ModelGrid,
        lon_index: usize,
        nlevels: usize,
        scale: f64,
    ) -> Result<Plot, ComparisonPlotError> {
        if nlevels < 2 {
            return Err(ComparisonPlotError::InvalidNlevelsValue(nlevels));
        }
        if nlevels > self.nz() {
            return Err(ComparisonPlotError::NlevelsExceedsGrid(nlevels, self.nz()));
        }
        if lon_index >= grid.nx() {
            return Err(ComparisonPlotError::LongitudeIndexOutOfRange(
                lon_index,
                grid.nx(),
            ));
        }

        let latitudes: Vec<f64> = grid.yc().column(0).to_vec();
        let depths: Vec<f64> = grid.rc().iter().take(nlevels).copied().collect();

        let panels = [
            (&self.nsq, "N\u{b2} from DRHODR", "x", "y"),
            (&self.nsq_ts, "N\u{b2} from T and S", "x2", "y2"),
            (&self.nsq_ra, "N\u{b2} from RHOAnoma", "x3", "y3"),
        ];

        let mut plot = Plot::new();
        let mut annotations = Vec::with_capacity(panels.len());
        for (index, (field, name, xaxis, yaxis)) in panels.iter().enumerate() {
            let z: Vec<Vec<f64>> = (0..nlevels)
                .map(|k| {
                    (0..grid.ny())
                        .map(|j| field[[k, j, lon_index]] * scale)
                        .collect()
                })
                .collect();
            let trace = Contour::new(latitudes.clone(), depths.clone(), z)
                .name(name)
                .x_axis(xaxis)
                .y_axis(yaxis)
                .color_scale(ColorScale::Palette(ColorScalePalette::Reds))
                .contours(
                    Contours::new()
                        .start(0.0)
                        .end(15.0)
                        .size(1)
                        .coloring(Coloring::Fill)
                        .show_labels(true)
                        .label_font(Font::new().color(NamedColor::Black)),
                )
                .show_scale(index == panels.len() - 1);
            plot.add_trace(trace);
            let label = format!("{} [x {:.0e} 1/s\u{b2}]", name, scale);
            annotations.push(
                Annotation::new()
                    .text(&label)
                    .x_ref("paper")
                    .y_ref("paper")
                    .x(0.12 + 0.38 * index as f64)
                    .y(1.08)
                    .show_arrow(false),
            );
        }

        let layout = Layout::new()
            .grid(
                LayoutGrid::new()
                    .rows(1)
                    .columns(3)
                    .pattern(GridPattern::Independent),
            )
            .y_axis(LayoutAxis::new().title(Title::new("depth [m]")))
            .x_axis(LayoutAxis::new().title(Title::new("latitude")))
            .x_axis2(LayoutAxis::new().title(Title::new("latitude")))
            .x_axis3(LayoutAxis::new().title(Title::new("latitude")))
            .annotations(annotations);
        plot.set_layout(layout);
        Ok(plot)
    }

    /// Per-level summary: center depth and the ocean-area mean of each
    /// estimate. Land cells hold exact zeros, so the masked sum divided by
    /// the wet cell count is the ocean mean.
    pub fn write_profile_csv(
        &self,
        grid: &ModelGrid,
        filename: &PathBuf,
    ) -> Result<(), ProfileExportError> {
        let mut writer = csv::Writer::from_path(filename)?;
        writer.write_record(&["level", "depth_m", "nsq_mean", "nsq_ts_mean", "nsq_ra_mean"])?;
        for k in 0..self.nz() {
            let wet = grid.mskc().index_axis(Axis(0), k).sum();
            let means = if wet > 0.0 {
                [
                    self.nsq.index_axis(Axis(0), k).sum() / wet,
                    self.nsq_ts.index_axis(Axis(0), k).sum() / wet,
                    self.nsq_ra.index_axis(Axis(0), k).sum() / wet,
                ]
            } else {
                [0.0, 0.0, 0.0]
            };
            writer.write_record(&[
                k.to_string(),
                format!("{:.3}", grid.rc()[k]),
                format!("{:e}", means[0]),
                format!("{:e}", means[1]),
                format!("{:e}", means[2]),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}
