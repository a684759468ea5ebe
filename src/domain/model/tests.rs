// Unit tests for domain models

use crate::domain::errors::*;
use crate::domain::model::*;

#[test]
fn test_uploaded_file_extension() {
    let file = UploadedFile::new(vec![1, 2, 3], "holiday.final.mov").unwrap();
    assert_eq!(file.extension(), "mov");
    assert_eq!(file.name(), "holiday.final.mov");
    assert_eq!(file.len(), 3);
}

#[test]
fn test_uploaded_file_without_dot_uses_whole_name() {
    let file = UploadedFile::new(vec![0], "clip").unwrap();
    assert_eq!(file.extension(), "clip");
    assert_eq!(ArtifactNames::input(file.extension()), "input.clip");
}

#[test]
fn test_uploaded_file_rejects_empty_name() {
    assert_eq!(
        UploadedFile::new(vec![0], "  "),
        Err(DomainError::BadArgs("File name cannot be empty".to_string()))
    );
}

#[tokio::test]
async fn test_uploaded_file_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.mp4");
    std::fs::write(&path, b"not really a video").unwrap();

    let file = UploadedFile::load(&path).await.unwrap();
    assert_eq!(file.name(), "sample.mp4");
    assert_eq!(file.bytes(), b"not really a video");
}

#[tokio::test]
async fn test_uploaded_file_load_missing() {
    let dir = tempfile::tempdir().unwrap();
    let result = UploadedFile::load(&dir.path().join("missing.mp4")).await;
    assert!(matches!(result, Err(DomainError::FsFail(_))));
}

#[test]
fn test_artifact_names() {
    assert_eq!(ArtifactNames::input("mkv"), "input.mkv");
    assert_eq!(ArtifactNames::segment(0), "part_1.mp4");
    assert_eq!(ArtifactNames::output(2, "talk.mov"), "part_3_talk.mov");
}

#[test]
fn test_internal_names_never_match_output_names() {
    assert!(ArtifactNames::is_internal("input.mp4"));
    assert!(ArtifactNames::is_internal("part_12.mp4"));
    assert!(!ArtifactNames::is_internal("part_1_talk.mp4"));
    assert!(!ArtifactNames::is_internal(&ArtifactNames::output(0, "a.mp4")));
}

#[test]
fn test_job_failure_summary() {
    let failure = JobFailure {
        stage: JobState::Executing,
        message: "Transcoding engine error: exit status 1".to_string(),
        segments_completed: 1,
        segments_total: Some(5),
        diagnostics: vec!["Invalid data found".to_string()],
    };
    assert_eq!(
        failure.summary(),
        "Transcoding engine error: exit status 1 (1 of 5 segments completed)"
    );
    assert!(failure.to_string().ends_with("Details:\nInvalid data found"));
}

#[test]
fn test_job_failure_summary_without_plan() {
    let failure = JobFailure {
        stage: JobState::Probing,
        message: "Could not determine the duration of the video".to_string(),
        segments_completed: 0,
        segments_total: None,
        diagnostics: vec![],
    };
    assert_eq!(failure.to_string(), "Could not determine the duration of the video");
}

#[test]
fn test_outcome_states() {
    assert_eq!(
        JobOutcome::Completed { segments_written: 2 }.state(),
        JobState::Completed
    );
    assert_eq!(
        JobOutcome::Aborted { reason: AbortReason::Cancelled }.state(),
        JobState::Aborted
    );
    assert!(JobState::Failed.is_terminal());
    assert!(!JobState::Executing.is_terminal());
}

#[test]
fn test_outcome_serializes_with_status_tag() {
    let outcome = JobOutcome::Aborted {
        reason: AbortReason::Interrupted { completed: 2, total: 4 },
    };
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "aborted");
    assert_eq!(json["reason"]["kind"], "interrupted");
    assert_eq!(json["reason"]["completed"], 2);
}
