use lfpscope::archive::{AssetDescriptor, DandisetInfo};
use lfpscope::metadata::{SessionInfo, SubjectInfo};
use lfpscope::pipeline::{ElectrodeReport, LfpOutcome, PipelineStage, RunReport};
use lfpscope::report::write_text;
use lfpscope::window::WindowSummary;

fn sample_report(lfp: LfpOutcome) -> RunReport {
    let asset = AssetDescriptor {
        path: "sub-681446/sub-681446_ses-1290510496_probe-0_ecephys.nwb".to_string(),
        identifier: "aaaaaaaa-0000-0000-0000-000000000002".parse().unwrap(),
    };
    RunReport {
        dandiset_id: "000563".to_string(),
        version: "0.250311.2145".to_string(),
        dandiset: DandisetInfo {
            name: "Allen Institute Openscope - Barcoding".to_string(),
            url: None,
            description: Some("Temporal barcodes.".to_string()),
            asset_count: Some(94),
        },
        listing_prefix: vec![asset.clone()],
        asset,
        file_size: 10_168_076,
        session: SessionInfo {
            session_description: Some("LFP data and trials".to_string()),
            session_id: Some("1290510496".to_string()),
            identifier: None,
            institution: Some("Allen Institute".to_string()),
        },
        subject: SubjectInfo {
            subject_id: Some("681446".to_string()),
            species: Some("Mus musculus".to_string()),
            genotype: None,
            sex: Some("M".to_string()),
            age: Some("P154D".to_string()),
            strain: None,
        },
        acquisition_keys: vec!["probe_0_lfp".to_string()],
        probes: vec![],
        electrodes: ElectrodeReport {
            row_count: 73,
            colnames: vec![
                "location".to_string(),
                "group".to_string(),
                "group_name".to_string(),
            ],
            location_counts: vec![("APN".to_string(), 43), ("LP".to_string(), 30)],
            sample_rows: vec![],
            matches_series_channels: Some(true),
        },
        lfp,
        plot_path: None,
        generated_at: "2026-08-25T00:00:00+00:00".to_string(),
        stage: PipelineStage::WindowMaterialized,
    }
}

#[test]
fn text_report_covers_every_section() {
    let report = sample_report(LfpOutcome::Materialized(WindowSummary {
        start_row: 10000,
        end_row: 15000,
        channels: vec![0, 10, 20, 30],
        rows: 5000,
        unit: "volts".to_string(),
        first_timestamp: Some(16.0),
        last_timestamp: Some(24.0),
    }));

    let mut buffer = Vec::new();
    write_text(&mut buffer, &report).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert!(text.contains("Dandiset 000563 (version 0.250311.2145)"));
    assert!(text.contains("probe-0_ecephys.nwb"));
    assert!(text.contains("id: 681446"));
    assert!(text.contains("genotype: unknown"));
    assert!(text.contains("columns: location, group, group_name"));
    assert!(text.contains("APN: 43"));
    assert!(text.contains("rows 10000..15000"));
    assert!(text.contains("WindowMaterialized"));
}

#[test]
fn missing_probe_is_reported_as_skipped_slice() {
    let report = sample_report(LfpOutcome::Missing {
        key: "probe_0_lfp".to_string(),
        detail: "container section missing: acquisition/probe_0_lfp".to_string(),
    });

    let mut buffer = Vec::new();
    write_text(&mut buffer, &report).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    assert!(text.contains("probe_0_lfp not present in this file"));
}
