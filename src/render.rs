use std::path::PathBuf;

use plotters::prelude::*;

use crate::error::ExplorerError;
use crate::window::MaterializedWindow;

const DEFAULT_WIDTH: u32 = 1200;
const DEFAULT_HEIGHT: u32 = 600;

/// Renders a materialized window to a PNG: one trace per channel, each
/// shifted by a fixed vertical offset so the traces stack instead of overlap.
pub struct RenderContext {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl RenderContext {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn render(&self, window: &MaterializedWindow) -> Result<(), ExplorerError> {
        if window.row_count() == 0 || window.channel_count() == 0 {
            return Err(ExplorerError::Render(
                "window has no samples to plot".to_string(),
            ));
        }

        let t0 = window.timestamps.first().copied().unwrap_or(0.0);
        let t1 = window.timestamps.last().copied().unwrap_or(t0);
        let (t0, t1) = if t1 > t0 { (t0, t1) } else { (t0, t0 + 1.0) };

        // Each trace is demeaned, then shifted by a shared offset step so the
        // traces stack. A shared step keeps relative amplitudes comparable:
        // it is the largest per-channel peak-to-peak spread, padded.
        let offset_step = channel_offset_step(window);
        let means: Vec<f64> = window
            .samples
            .columns()
            .into_iter()
            .map(|column| column.sum() / column.len() as f64)
            .collect();
        let y_max = offset_step * (window.channel_count() as f64 - 1.0) + offset_step * 0.75;
        let y_min = -offset_step * 0.75;

        let root = BitMapBackend::new(&self.path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|err| ExplorerError::Render(err.to_string()))?;

        let caption = format!(
            "LFP rows {}..{} ({} channels)",
            window.start,
            window.start + window.row_count() as u64,
            window.channel_count()
        );
        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 24))
            .margin(12)
            .x_label_area_size(44)
            .y_label_area_size(64)
            .build_cartesian_2d(t0..t1, y_min..y_max)
            .map_err(|err| ExplorerError::Render(err.to_string()))?;

        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc(format!("amplitude ({}) + offset", window.unit))
            .draw()
            .map_err(|err| ExplorerError::Render(err.to_string()))?;

        for (idx, &channel) in window.channels.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let offset = offset_step * idx as f64;
            let column = window.samples.column(idx);
            let mean = means[idx];
            let points = window
                .timestamps
                .iter()
                .zip(column.iter())
                .map(|(&t, &v)| (t, v - mean + offset))
                .collect::<Vec<_>>();
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(1)))
                .map_err(|err| ExplorerError::Render(err.to_string()))?
                .label(format!("channel {channel}"))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(|err| ExplorerError::Render(err.to_string()))?;

        root.present()
            .map_err(|err| ExplorerError::Render(err.to_string()))?;
        tracing::info!(path = %self.path.display(), "wrote plot");
        Ok(())
    }
}

fn channel_offset_step(window: &MaterializedWindow) -> f64 {
    let mut max_spread = 0.0f64;
    for column in window.samples.columns() {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &value in column {
            lo = lo.min(value);
            hi = hi.max(value);
        }
        if hi > lo {
            max_spread = max_spread.max(hi - lo);
        }
    }
    if max_spread > 0.0 {
        max_spread * 1.1
    } else {
        1.0
    }
}
