use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use usage_report_downloader::output::ReportPathBuilder;
use usage_report_downloader::range::DateRange;

fn range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 11, 20).unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
    )
}

#[test]
fn test_all_files_share_report_directory() {
    let builder = ReportPathBuilder::new("usage_reports", "8f2c-org");
    let run_date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

    for path in [
        builder.raw_artifact(&range(), 0),
        builder.decompressed(&range(), 0),
        builder.merged_report(run_date),
    ] {
        assert_eq!(path.parent(), Some(Path::new("usage_reports")));
    }
}

#[test]
fn test_raw_and_decompressed_names_differ_in_layout() {
    let builder = ReportPathBuilder::new(PathBuf::from("out"), "8f2c-org");

    assert_eq!(
        builder.raw_artifact(&range(), 0),
        PathBuf::from("out/8f2c-org_2024-11-20_2024-12-20.csv.gz")
    );
    assert_eq!(
        builder.decompressed(&range(), 0),
        PathBuf::from("out/2024-11-20_to_2024-12-20_8f2c-org.csv")
    );
}

#[test]
fn test_same_day_reruns_share_merged_name() {
    let builder = ReportPathBuilder::new("out", "org");
    let day = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();

    assert_eq!(builder.merged_report(day), builder.merged_report(day));
    assert_ne!(
        builder.merged_report(day),
        builder.merged_report(day.succ_opt().unwrap())
    );
}

#[test]
fn test_path_separators_in_org_id_stay_in_directory() {
    let builder = ReportPathBuilder::new("out", "team/a\\b:c");
    let raw = builder.raw_artifact(&range(), 0);

    assert_eq!(raw.parent(), Some(Path::new("out")));
    assert_eq!(
        raw.file_name().unwrap().to_string_lossy(),
        "team_a_b_c_2024-11-20_2024-12-20.csv.gz"
    );
}
