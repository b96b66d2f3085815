//! Exit code mapping.

use casegen_cli::exit::ExitStatus;
use casegen_model::BatchStatus;

#[test]
fn batch_status_maps_to_documented_codes() {
    let codes: Vec<i32> = [
        BatchStatus::AllDone,
        BatchStatus::PartiallyFailed,
        BatchStatus::Aborted,
    ]
    .into_iter()
    .map(|status| ExitStatus::from_batch(status).code())
    .collect();
    assert_eq!(codes, vec![0, 1, 2]);
    assert_eq!(ExitStatus::Fatal.code(), 3);
}

#[test]
fn check_fails_only_with_rejected_rows() {
    assert_eq!(ExitStatus::from_check(0), ExitStatus::Success);
    assert_eq!(ExitStatus::from_check(2).code(), 1);
}
