mod common;

use assert_matches::assert_matches;
use ndarray::Array2;

use lfpscope::container::Container;
use lfpscope::domain::WindowSpec;
use lfpscope::error::ExplorerError;
use lfpscope::remote::{MemoryTransport, RemoteFile};
use lfpscope::render::RenderContext;
use lfpscope::window::MaterializedWindow;

use common::lfp_fixture;

#[test]
fn empty_window_is_rejected_before_touching_the_backend() {
    let window = MaterializedWindow {
        start: 0,
        channels: vec![],
        samples: Array2::zeros((0, 0)),
        timestamps: vec![],
        unit: "volts".to_string(),
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.png");
    let err = RenderContext::new(path.clone()).render(&window).unwrap_err();
    assert_matches!(err, ExplorerError::Render(_));
    assert!(!path.exists());
}

#[test]
#[ignore = "draws text, requires a system font"]
fn renders_window_to_png() {
    let file = RemoteFile::open(MemoryTransport::new(lfp_fixture(0, 100, 8))).unwrap();
    let mut container = Container::parse(file).unwrap();
    let series = container
        .series(&[
            "acquisition",
            "probe_0_lfp",
            "electrical_series",
            "probe_0_lfp_data",
        ])
        .unwrap();
    let spec = WindowSpec::new(0, 100, vec![0, 2, 4]).unwrap();
    let window = container.window(&series, &spec).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("window.png");
    RenderContext::new(path.clone())
        .with_dimensions(800, 400)
        .render(&window)
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
