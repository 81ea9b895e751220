use byteorder::{ByteOrder, LittleEndian};
use ndarray::Array2;
use serde::Serialize;

use crate::container::{Dtype, ElectricalSeries};
use crate::domain::WindowSpec;
use crate::error::ExplorerError;
use crate::remote::{RangeTransport, RemoteFile};

/// Row-range-by-column-subset slice of one electrical series, paired with the
/// matching timestamp slice. Ephemeral: built for display, never persisted.
#[derive(Debug, Clone)]
pub struct MaterializedWindow {
    pub start: u64,
    pub channels: Vec<usize>,
    /// Shape (end - start, channels.len()), channel order as requested.
    pub samples: Array2<f64>,
    pub timestamps: Vec<f64>,
    pub unit: String,
}

impl MaterializedWindow {
    pub fn row_count(&self) -> usize {
        self.samples.nrows()
    }

    pub fn channel_count(&self) -> usize {
        self.samples.ncols()
    }

    pub fn summary(&self) -> WindowSummary {
        WindowSummary {
            start_row: self.start,
            end_row: self.start + self.row_count() as u64,
            channels: self.channels.clone(),
            rows: self.row_count(),
            unit: self.unit.clone(),
            first_timestamp: self.timestamps.first().copied(),
            last_timestamp: self.timestamps.last().copied(),
        }
    }
}

/// Display-ready description of a materialized window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub start_row: u64,
    pub end_row: u64,
    pub channels: Vec<usize>,
    pub rows: usize,
    pub unit: String,
    pub first_timestamp: Option<f64>,
    pub last_timestamp: Option<f64>,
}

/// Fetches the window described by `spec` from `series`.
///
/// Bounds are checked before any remote I/O, so an invalid request costs zero
/// fetches. A valid request issues exactly two: one covering the sample rows
/// (all stored columns, selection happens in memory) and one covering the
/// timestamp slice.
pub fn materialize<T: RangeTransport>(
    file: &mut RemoteFile<T>,
    series: &ElectricalSeries,
    spec: &WindowSpec,
) -> Result<MaterializedWindow, ExplorerError> {
    if spec.start > spec.end || spec.end > series.rows {
        return Err(ExplorerError::RowRangeOutOfBounds {
            start: spec.start,
            end: spec.end,
            rows: series.rows,
        });
    }
    let cols = series.cols as usize;
    for &channel in &spec.channels {
        if channel >= cols {
            return Err(ExplorerError::ColumnOutOfBounds {
                index: channel,
                cols,
            });
        }
    }

    let rows = (spec.end - spec.start) as usize;
    let elem = series.dtype.size();
    let row_stride = cols * elem;

    let data_offset = series.data_offset + spec.start * row_stride as u64;
    let data = file.read_range(data_offset, rows * row_stride)?;

    let ts_offset = series.timestamps_offset + spec.start * 8;
    let ts_bytes = file.read_range(ts_offset, rows * 8)?;

    let samples = Array2::from_shape_fn((rows, spec.channels.len()), |(row, idx)| {
        let col = spec.channels[idx];
        let at = row * row_stride + col * elem;
        match series.dtype {
            Dtype::F32 => LittleEndian::read_f32(&data[at..at + 4]) as f64,
            Dtype::F64 => LittleEndian::read_f64(&data[at..at + 8]),
        }
    });

    let mut timestamps = vec![0f64; rows];
    LittleEndian::read_f64_into(&ts_bytes, &mut timestamps);

    tracing::debug!(
        rows,
        channels = spec.channels.len(),
        bytes = rows * row_stride,
        "materialized window"
    );

    Ok(MaterializedWindow {
        start: spec.start,
        channels: spec.channels.clone(),
        samples,
        timestamps,
        unit: series.unit.clone(),
    })
}
