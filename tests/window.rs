mod common;

use assert_matches::assert_matches;

use lfpscope::container::Container;
use lfpscope::domain::WindowSpec;
use lfpscope::error::{ErrorKind, ExplorerError};
use lfpscope::remote::{MemoryTransport, RemoteFile};

use common::lfp_fixture;

const SERIES_PATH: [&str; 4] = [
    "acquisition",
    "probe_0_lfp",
    "electrical_series",
    "probe_0_lfp_data",
];

fn fixture_container(rows: usize, cols: usize) -> Container<MemoryTransport> {
    let file = RemoteFile::open(MemoryTransport::new(lfp_fixture(0, rows, cols))).unwrap();
    Container::parse(file).unwrap()
}

#[test]
fn window_shape_follows_the_request() {
    let mut container = fixture_container(200, 8);
    let series = container.series(&SERIES_PATH).unwrap();

    let spec = WindowSpec::new(50, 100, vec![0, 2, 4, 6]).unwrap();
    let window = container.window(&series, &spec).unwrap();

    assert_eq!(window.row_count(), 50);
    assert_eq!(window.channel_count(), 4);
    assert_eq!(window.timestamps.len(), 50);
    assert_eq!(window.unit, "volts");

    // Sample value at (row, col) is row * cols + col.
    assert_eq!(window.samples[[0, 0]], (50 * 8) as f64);
    assert_eq!(window.samples[[0, 1]], (50 * 8 + 2) as f64);
    assert_eq!(window.samples[[49, 3]], (99 * 8 + 6) as f64);

    let summary = window.summary();
    assert_eq!(summary.start_row, 50);
    assert_eq!(summary.end_row, 100);
    assert_eq!(summary.rows, 50);
}

#[test]
fn channel_order_and_duplicates_are_preserved() {
    let mut container = fixture_container(20, 4);
    let series = container.series(&SERIES_PATH).unwrap();

    let spec = WindowSpec::new(0, 2, vec![3, 0, 3]).unwrap();
    let window = container.window(&series, &spec).unwrap();

    assert_eq!(window.channels, vec![3, 0, 3]);
    assert_eq!(window.samples[[0, 0]], 3.0);
    assert_eq!(window.samples[[0, 1]], 0.0);
    assert_eq!(window.samples[[0, 2]], 3.0);
}

#[test]
fn timestamps_are_strictly_increasing() {
    let mut container = fixture_container(100, 4);
    let series = container.series(&SERIES_PATH).unwrap();

    let spec = WindowSpec::new(10, 60, vec![0]).unwrap();
    let window = container.window(&series, &spec).unwrap();

    assert!(window
        .timestamps
        .windows(2)
        .all(|pair| pair[1] > pair[0]));
}

#[test]
fn out_of_range_request_costs_zero_fetches() {
    let mut container = fixture_container(100, 8);
    let series = container.series(&SERIES_PATH).unwrap();
    let before = container.file().fetch_count();

    let spec = WindowSpec::new(90, 200, vec![0]).unwrap();
    let err = container.window(&series, &spec).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    assert_matches!(err, ExplorerError::RowRangeOutOfBounds { rows: 100, .. });

    let spec = WindowSpec::new(0, 10, vec![8]).unwrap();
    let err = container.window(&series, &spec).unwrap_err();
    assert_matches!(err, ExplorerError::ColumnOutOfBounds { index: 8, cols: 8 });

    assert_eq!(container.file().fetch_count(), before);
}

#[test]
fn valid_window_costs_exactly_two_fetches() {
    let mut container = fixture_container(100, 8);
    let series = container.series(&SERIES_PATH).unwrap();
    let before = container.file().fetch_count();

    let spec = WindowSpec::new(0, 50, vec![0, 1]).unwrap();
    container.window(&series, &spec).unwrap();

    // One fetch for the sample rows, one for the timestamp slice.
    assert_eq!(container.file().fetch_count(), before + 2);
}
