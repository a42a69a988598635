// tests/engine_end_to_end.rs

use std::sync::Arc;

use jobdag::config::SchedulerConfig;
use jobdag::dag::{ClientId, JobId, JobSpec, JobStatus};
use jobdag::engine;
use jobdag::errors::{JobdagError, TaskError};
use jobdag::exec::{TaskRegistry, handler_fn};
use jobdag::notify::{ClientHub, FanoutNotifier};
use jobdag_test_utils::notifier::RecordingNotifier;
use jobdag_test_utils::{init_tracing, with_timeout};
use serde_json::{Value, json};

async fn process_image(_args: Vec<Value>) -> Result<Value, TaskError> {
    Ok(json!("resized"))
}

async fn upload_image(args: Vec<Value>) -> Result<Value, TaskError> {
    match args.as_slice() {
        [Value::String(s)] if s == "resized" => Ok(json!("hash123")),
        other => Err(TaskError::InvalidArgs(format!("unexpected upload input {other:?}"))),
    }
}

fn image_tasks() -> TaskRegistry {
    let mut tasks = TaskRegistry::new();
    tasks
        .register("processImage", handler_fn(process_image))
        .register("uploadImage", handler_fn(upload_image));
    tasks
}

#[tokio::test]
async fn dependent_job_receives_dependency_result() {
    init_tracing();

    with_timeout(async {
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = engine::spawn(SchedulerConfig::default(), image_tasks(), notifier.clone());

        let ids = queue
            .admit_batch(vec![
                JobSpec::new("imgJob", "processImage"),
                JobSpec::new("uploadJob", "uploadImage").after("imgJob"),
            ])
            .await
            .expect("admission should succeed");
        assert_eq!(ids, vec![JobId::from("imgJob"), JobId::from("uploadJob")]);

        queue.wait_idle().await.unwrap();

        let img = queue.status(&"imgJob".into()).await.unwrap().expect("imgJob status");
        assert_eq!(img.status, JobStatus::Completed);
        assert_eq!(img.result, Some(json!("resized")));

        let upload = queue
            .status(&"uploadJob".into())
            .await
            .unwrap()
            .expect("uploadJob status");
        assert_eq!(upload.status, JobStatus::Completed);
        assert_eq!(upload.result, Some(json!("hash123")));
        assert_eq!(upload.error, None);

        assert_eq!(
            notifier.statuses_of("uploadJob"),
            vec![JobStatus::Processing, JobStatus::Completed]
        );

        queue.shutdown().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn parameters_come_before_dependency_results() {
    init_tracing();

    with_timeout(async {
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = engine::spawn(
            SchedulerConfig::default(),
            TaskRegistry::with_builtins(),
            notifier,
        );

        queue
            .admit_batch(vec![
                JobSpec::new("a", "echo").param("from-a"),
                JobSpec::new("b", "echo").param(1).param(2).after("a"),
            ])
            .await
            .unwrap();
        queue.wait_idle().await.unwrap();

        let b = queue.status(&"b".into()).await.unwrap().unwrap();
        assert_eq!(b.result, Some(json!([1, 2, "from-a"])));
    })
    .await;
}

#[tokio::test]
async fn each_transition_is_notified_exactly_once() {
    init_tracing();

    with_timeout(async {
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = engine::spawn(
            SchedulerConfig::default().with_max_concurrent(2),
            TaskRegistry::with_builtins(),
            notifier.clone(),
        );

        queue
            .admit_batch(vec![
                JobSpec::new("root", "echo").param("x"),
                JobSpec::new("left", "echo").after("root"),
                JobSpec::new("right", "echo").after("root"),
                JobSpec::new("join", "echo").after("left").after("right"),
            ])
            .await
            .unwrap();
        queue.wait_idle().await.unwrap();

        for id in ["root", "left", "right", "join"] {
            assert_eq!(
                notifier.statuses_of(id),
                vec![JobStatus::Processing, JobStatus::Completed],
                "unexpected notifications for {id}"
            );
        }

        let join = queue.status(&"join".into()).await.unwrap().unwrap();
        assert_eq!(join.result, Some(json!(["x", "x"])));
    })
    .await;
}

#[tokio::test]
async fn unknown_job_has_no_status() {
    init_tracing();

    with_timeout(async {
        let queue = engine::spawn(
            SchedulerConfig::default(),
            TaskRegistry::with_builtins(),
            Arc::new(RecordingNotifier::new()),
        );

        assert_eq!(queue.status(&"nobody".into()).await.unwrap(), None);
    })
    .await;
}

#[tokio::test]
async fn anonymous_jobs_get_generated_ids() {
    init_tracing();

    with_timeout(async {
        let queue = engine::spawn(
            SchedulerConfig::default(),
            TaskRegistry::with_builtins(),
            Arc::new(RecordingNotifier::new()),
        );

        let id = queue
            .admit(JobSpec::anonymous("echo").param(5))
            .await
            .unwrap();
        assert!(!id.as_str().is_empty());

        queue.wait_idle().await.unwrap();
        let report = queue.status(&id).await.unwrap().unwrap();
        assert_eq!(report.result, Some(json!(5)));
    })
    .await;
}

#[tokio::test]
async fn client_hub_routes_updates_to_the_submitting_client() {
    init_tracing();

    with_timeout(async {
        let hub = Arc::new(ClientHub::default());
        let alice: ClientId = "alice".into();
        let bob: ClientId = "bob".into();
        let mut alice_rx = hub.register(alice.clone());
        let mut bob_rx = hub.register(bob.clone());

        let recorder = Arc::new(RecordingNotifier::new());
        let notifier = FanoutNotifier::new().with(hub.clone()).with(recorder.clone());
        let queue = engine::spawn(
            SchedulerConfig::default(),
            TaskRegistry::with_builtins(),
            Arc::new(notifier),
        );

        queue
            .admit(JobSpec::new("mine", "echo").param("hi").for_client("alice"))
            .await
            .unwrap();
        queue.wait_idle().await.unwrap();

        let first = alice_rx.recv().await.expect("processing update");
        assert_eq!(first.id, JobId::from("mine"));
        assert_eq!(first.status, JobStatus::Processing);

        let second = alice_rx.recv().await.expect("completed update");
        assert_eq!(second.status, JobStatus::Completed);
        assert_eq!(second.result, Some(json!("hi")));

        assert!(bob_rx.try_recv().is_err());
        assert_eq!(recorder.clients_of("mine"), vec![Some(alice.clone()), Some(alice)]);
    })
    .await;
}

#[tokio::test]
async fn shutdown_closes_the_queue() {
    init_tracing();

    with_timeout(async {
        let queue = engine::spawn(
            SchedulerConfig::default(),
            TaskRegistry::with_builtins(),
            Arc::new(RecordingNotifier::new()),
        );
        queue.shutdown().await.unwrap();

        let err = queue.status(&"x".into()).await.unwrap_err();
        assert!(matches!(err, JobdagError::EngineClosed));
    })
    .await;
}

#[tokio::test]
async fn dropping_the_last_handle_still_finishes_admitted_jobs() {
    init_tracing();

    with_timeout(async {
        let notifier = Arc::new(RecordingNotifier::new());
        let queue = engine::spawn(
            SchedulerConfig::default(),
            TaskRegistry::with_builtins(),
            notifier.clone(),
        );

        queue
            .admit_batch(vec![
                JobSpec::new("a", "sleep").param(50),
                JobSpec::new("b", "echo").param("done").after("a"),
            ])
            .await
            .unwrap();
        drop(queue);

        while !notifier.statuses_of("b").contains(&JobStatus::Completed) {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(
            notifier.statuses_of("a"),
            vec![JobStatus::Processing, JobStatus::Completed]
        );
        assert_eq!(
            notifier.statuses_of("b"),
            vec![JobStatus::Processing, JobStatus::Completed]
        );

        // Once idle, the engine stops and releases its notifier.
        while Arc::strong_count(&notifier) > 1 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;
}
