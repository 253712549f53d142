mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use portrait_studio::{
    FaceStatus, GenerationError, IntakeError, PhotoFile, PhotoId, RunOutcome, Step, StudioError,
    StudioSession, UserAction, ViewerError,
};
use support::{test_config, RecordingDetector, ScriptedGenerator};

const MB: usize = 1024 * 1024;

struct Harness {
    session: StudioSession,
    detector: Arc<RecordingDetector>,
    generator: Arc<ScriptedGenerator>,
}

fn harness() -> Harness {
    let detector = Arc::new(RecordingDetector::default());
    let generator = Arc::new(ScriptedGenerator::default());
    let session = StudioSession::new(&test_config(), detector.clone(), generator.clone());
    Harness {
        session,
        detector,
        generator,
    }
}

fn file(name: &str, size: usize) -> PhotoFile {
    PhotoFile::new(name, vec![0; size])
}

async fn upload(session: &mut StudioSession, files: Vec<PhotoFile>) -> Vec<PhotoId> {
    session.select_files(files).unwrap();
    let ids = session.agree_to_privacy().await.unwrap();
    session.wait_for_validations().await;
    ids
}

#[tokio::test]
async fn test_two_photos_one_generation_failure() {
    let Harness {
        mut session,
        generator,
        ..
    } = harness();
    session.start().unwrap();

    upload(
        &mut session,
        vec![file("first.jpg", 3 * MB), file("second_fail.jpg", 4 * MB)],
    )
    .await;
    assert!(session.is_batch_ready());
    session.continue_to_templates().unwrap();

    let outcome = session.confirm_template("crib", "cream").await.unwrap();
    let report = match outcome {
        RunOutcome::Completed(report) => report,
        other => panic!("expected completion, got {:?}", other),
    };

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.summary(), "1 of 2 portraits generated");
    assert_eq!(session.step(), Step::Result);
    assert_eq!(session.orchestrator().progress().attempted, 2);
    assert_eq!(generator.calls().len(), 2);

    let current = session.current_result().unwrap();
    assert_eq!(current.template_name, "婴儿床时光 软萌奶油风");
    assert_eq!(session.viewer().position_label(), "1 / 1");
    assert!(!session.next_result());
}

#[tokio::test]
async fn test_oversize_photo_never_enters_the_set() {
    let Harness {
        mut session,
        detector,
        ..
    } = harness();
    session.start().unwrap();

    let outcome = session.select_files(vec![file("huge.jpg", 12 * MB)]).unwrap();
    assert_eq!(outcome.rejected_oversize.len(), 1);
    assert!(outcome.notice().is_some());
    assert_eq!(session.pending_count(), 0);

    let err = session.agree_to_privacy().await.unwrap_err();
    assert!(matches!(
        err,
        StudioError::Intake(IntakeError::NothingPending)
    ));
    assert!(session.photos().is_empty());
    assert!(detector.calls().is_empty());
}

#[tokio::test]
async fn test_capacity_exceeded_leaves_set_unchanged() {
    let Harness { mut session, .. } = harness();
    session.start().unwrap();

    upload(&mut session, vec![file("a.jpg", MB), file("b.jpg", MB)]).await;
    let before: Vec<_> = session.photos().into_iter().map(|p| p.id).collect();

    session
        .select_files(vec![file("c.jpg", MB), file("d.png", MB)])
        .unwrap();
    let err = session.agree_to_privacy().await.unwrap_err();
    assert!(matches!(err, StudioError::Intake(_)));
    assert!(err.to_string().contains("2 already added, 2 selected"));
    assert_eq!(
        err.suggested_actions(),
        &[UserAction::ReselectPhotos, UserAction::RemovePhoto]
    );

    let after: Vec<_> = session.photos().into_iter().map(|p| p.id).collect();
    assert_eq!(before, after);
    assert_eq!(session.pending_count(), 0);
    // only the two accepted photos hold previews
    assert_eq!(session.previews().stats().0, 2);

    // a third photo still fits
    upload(&mut session, vec![file("c.jpg", MB)]).await;
    assert_eq!(session.photos().len(), 3);
    assert!(!session.can_add_more());
}

#[tokio::test]
async fn test_declined_consent_adds_nothing() {
    let Harness { mut session, .. } = harness();
    session.start().unwrap();

    session.select_files(vec![file("a.jpg", MB)]).unwrap();
    assert_eq!(session.pending_count(), 1);
    session.decline_privacy();
    assert_eq!(session.pending_count(), 0);
    assert!(session.photos().is_empty());
}

#[tokio::test]
async fn test_rotate_revalidates_at_new_angle() {
    let Harness {
        mut session,
        detector,
        ..
    } = harness();
    session.start().unwrap();

    let ids = upload(&mut session, vec![file("sideways.jpg", MB)]).await;
    assert_eq!(session.photos()[0].face, FaceStatus::Absent);
    assert!(session.continue_to_templates().is_err());

    assert!(session.rotate_photo(&ids[0]).unwrap());
    assert!(session.photos()[0].is_validating);
    assert!(!session.is_batch_ready());

    session.wait_for_validations().await;
    let photos = session.photos();
    let photo = &photos[0];
    assert_eq!(photo.rotation.degrees(), 90);
    assert_eq!(photo.face, FaceStatus::Present);
    assert_eq!(
        detector.calls(),
        vec![
            ("sideways.jpg".to_string(), 0),
            ("sideways.jpg".to_string(), 90)
        ]
    );
    session.continue_to_templates().unwrap();
}

#[tokio::test]
async fn test_stale_detection_does_not_overwrite_rotation_result() {
    let Harness { mut session, .. } = harness();
    session.start().unwrap();

    session
        .select_files(vec![file("slow_sideways.jpg", MB)])
        .unwrap();
    let ids = session.agree_to_privacy().await.unwrap();
    // rotate while the 0 degree check is still running
    session.rotate_photo(&ids[0]).unwrap();

    session.wait_for_validations().await;
    assert_eq!(session.photos()[0].face, FaceStatus::Present);

    // let the slow 0 degree answer (no face) land; it must be discarded
    tokio::time::sleep(Duration::from_millis(250)).await;
    let photos = session.photos();
    let photo = &photos[0];
    assert_eq!(photo.face, FaceStatus::Present);
    assert!(!photo.is_validating);
    assert!(session.is_batch_ready());
}

#[tokio::test]
async fn test_no_face_blocks_until_removed() {
    let Harness { mut session, .. } = harness();
    session.start().unwrap();

    upload(
        &mut session,
        vec![file("good.jpg", MB), file("noface.jpg", MB), file("error.jpg", MB)],
    )
    .await;

    let faces: Vec<_> = session.photos().iter().map(|p| p.face).collect();
    assert_eq!(
        faces,
        vec![FaceStatus::Present, FaceStatus::Absent, FaceStatus::CheckFailed]
    );
    let err = session.continue_to_templates().unwrap_err();
    assert!(matches!(err, StudioError::BatchNotReady));

    let blocked: Vec<PhotoId> = session
        .photos()
        .into_iter()
        .filter(|p| !p.usable)
        .map(|p| p.id)
        .collect();
    for id in &blocked {
        assert!(session.remove_photo(id).unwrap());
        // removing twice is fine
        assert!(!session.remove_photo(id).unwrap());
    }
    assert_eq!(session.previews().stats().0, 1);
    session.continue_to_templates().unwrap();
    assert_eq!(session.step(), Step::Template);
}

#[tokio::test]
async fn test_all_failures_stay_on_generating_with_retry() {
    let Harness {
        mut session,
        generator,
        ..
    } = harness();
    session.start().unwrap();
    upload(&mut session, vec![file("a.jpg", MB)]).await;
    session.continue_to_templates().unwrap();

    generator.fail_all.store(true, Ordering::SeqCst);
    let err = session.confirm_template("park", "film").await.unwrap_err();
    assert!(matches!(err, StudioError::Generation(_)));
    let expected = GenerationError::BatchGenerationFailed { attempted: 1 };
    assert_eq!(session.generation_error(), Some(&expected));
    assert_eq!(session.step(), Step::Generating);

    generator.fail_all.store(false, Ordering::SeqCst);
    let outcome = session.retry_generation().await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert!(session.generation_error().is_none());
    let current = session.current_result().unwrap();
    assert_eq!(current.template_name, "公园草坪 复古胶片风");
}

#[tokio::test]
async fn test_back_from_generation_returns_to_templates() {
    let Harness {
        mut session,
        generator,
        ..
    } = harness();
    session.start().unwrap();
    upload(&mut session, vec![file("a.jpg", MB)]).await;
    session.continue_to_templates().unwrap();

    generator.fail_all.store(true, Ordering::SeqCst);
    assert!(session.confirm_template("beach", "dreamy").await.is_err());

    session.back_from_generation().unwrap();
    assert_eq!(session.step(), Step::Template);
    assert!(!session.orchestrator().is_running());
    assert_eq!(session.photos().len(), 1);
}

#[tokio::test]
async fn test_dropped_run_can_be_left_and_rerun() {
    let Harness {
        mut session,
        generator,
        ..
    } = harness();
    session.start().unwrap();
    let files = vec![file("a.jpg", MB), file("hang.jpg", MB)];
    let ids = upload(&mut session, files).await;
    session.continue_to_templates().unwrap();

    // give up on the run while the second photo hangs
    let limit = Duration::from_millis(100);
    let run = session.confirm_template("window", "fresh");
    assert!(tokio::time::timeout(limit, run).await.is_err());
    assert!(!session.orchestrator().is_running());
    assert_eq!(session.step(), Step::Generating);
    assert!(session.viewer().is_empty());

    session.back_from_generation().unwrap();
    session.back_to_upload().unwrap();
    session.remove_photo(&ids[1]).unwrap();
    session.continue_to_templates().unwrap();

    let outcome = session.confirm_template("window", "fresh").await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(session.step(), Step::Result);
    assert_eq!(session.viewer().len(), 1);
    assert_eq!(generator.calls().len(), 3);
}

#[tokio::test]
async fn test_restart_keeps_or_drops_photos() {
    let Harness { mut session, .. } = harness();
    session.start().unwrap();
    upload(&mut session, vec![file("a.jpg", MB), file("b.jpg", MB)]).await;
    session.continue_to_templates().unwrap();
    session.confirm_template("autumn", "salt").await.unwrap();
    assert_eq!(session.viewer().len(), 2);

    // different template, same photos
    session.restart(false).unwrap();
    assert_eq!(session.step(), Step::Template);
    assert_eq!(session.photos().len(), 2);
    session.confirm_template("birthday", "fresh").await.unwrap();
    assert_eq!(
        session.current_result().unwrap().template_name,
        "周岁生日 简约清新风"
    );

    session.restart(true).unwrap();
    assert_eq!(session.step(), Step::Home);
    assert!(session.photos().is_empty());
    assert_eq!(session.previews().stats(), (0, 0));
    assert!(matches!(
        session.current_result(),
        Err(StudioError::Viewer(ViewerError::EmptyResultSet))
    ));
}

#[tokio::test]
async fn test_actions_outside_their_step_are_refused() {
    let Harness { mut session, .. } = harness();

    match session.select_files(vec![file("a.jpg", MB)]) {
        Err(StudioError::WrongStep { expected, actual }) => {
            assert_eq!(expected, Step::Upload);
            assert_eq!(actual, Step::Home);
        }
        other => panic!("expected a wrong-step error, got {:?}", other),
    }
    assert!(session.confirm_template("crib", "cream").await.is_err());
    assert!(session.restart(true).is_err());

    session.start().unwrap();
    assert!(session.start().is_err());
    session.back_to_home().unwrap();
    assert_eq!(session.step(), Step::Home);
}

#[tokio::test]
async fn test_unknown_template_is_rejected() {
    let Harness { mut session, .. } = harness();
    session.start().unwrap();
    upload(&mut session, vec![file("a.jpg", MB)]).await;
    session.continue_to_templates().unwrap();

    let err = session.confirm_template("moon", "cream").await.unwrap_err();
    assert!(matches!(err, StudioError::Template(_)));
    assert_eq!(err.suggested_actions(), &[UserAction::ChooseTemplate]);
    assert_eq!(session.step(), Step::Template);
}
