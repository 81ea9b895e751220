mod common;

use lfpscope::container::Container;
use lfpscope::metadata::{
    self, channel_count_matches, ELECTRODE_COLUMNS,
};
use lfpscope::remote::{MemoryTransport, RemoteFile};

use common::lfp_fixture;

fn fixture_container(rows: usize, cols: usize) -> Container<MemoryTransport> {
    let file = RemoteFile::open(MemoryTransport::new(lfp_fixture(0, rows, cols))).unwrap();
    Container::parse(file).unwrap()
}

#[test]
fn session_and_subject_fields_come_through() {
    let container = fixture_container(10, 4);

    let session = metadata::extract_session(&container);
    assert_eq!(session.session_id.as_deref(), Some("1290510496"));
    assert_eq!(session.institution.as_deref(), Some("Allen Institute"));

    let subject = metadata::extract_subject(&container).unwrap();
    assert_eq!(subject.subject_id.as_deref(), Some("681446"));
    assert_eq!(subject.species.as_deref(), Some("Mus musculus"));
    assert_eq!(subject.age.as_deref(), Some("P154D"));
}

#[test]
fn probes_report_name_and_sampling_rate() {
    let container = fixture_container(10, 4);
    let probes = metadata::extract_probes(&container).unwrap();

    assert_eq!(probes.len(), 1);
    assert_eq!(probes[0].name, "probeA");
    assert_eq!(probes[0].manufacturer.as_deref(), Some("imec"));
    assert_eq!(probes[0].sampling_rate, Some(625.0));
}

#[test]
fn electrode_table_honors_the_column_contract() {
    let container = fixture_container(10, 12);
    let table = metadata::extract_electrodes(&container).unwrap();

    assert_eq!(table.row_count(), 12);
    assert_eq!(table.colnames().len(), ELECTRODE_COLUMNS.len());

    // Counts are exact and sum to the channel total.
    let counts = table.location_counts();
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    assert_eq!(total, 12);
    assert_eq!(counts[0].0, "APN");

    // The fixture leaves impedance unmeasured.
    assert_eq!(table.row(0).unwrap().imp, None);
    assert_eq!(table.sample_rows(5).len(), 5);
}

#[test]
fn electrode_rows_match_series_channels() {
    let container = fixture_container(10, 4);
    let table = metadata::extract_electrodes(&container).unwrap();
    let series = container
        .series(&[
            "acquisition",
            "probe_0_lfp",
            "electrical_series",
            "probe_0_lfp_data",
        ])
        .unwrap();

    assert!(channel_count_matches(&table, &series));
}
