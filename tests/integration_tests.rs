//! Integration tests
//!
//! End-to-end flows: trigger → resumable loop → pull cycles → query, against
//! both the in-memory log and a mock log service over HTTP.

use base64::Engine as _;
use logpump::cli::{Cli, Runner};
use logpump::decode::{decoder_for, EventDecoder, JsonEventDecoder, StreamEvent};
use logpump::engine::{LoopConfig, ProcessingStep, ResumableLoop};
use logpump::pull::{Cancellation, PullConfig, PullCycle};
use logpump::query::CountQuery;
use logpump::source::{HttpLogSource, LogSource, MemoryLogSource};
use logpump::state::StateManager;
use logpump::trigger::{start_instance, TriggerResponse};
use logpump::{PumpConfig, StartPosition};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn body(event: StreamEvent) -> String {
    let bytes = JsonEventDecoder::new().encode(&event).unwrap();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn resumable(source: Arc<dyn LogSource>, pull: PullConfig, config: LoopConfig) -> ResumableLoop {
    let cycle = PullCycle::new(
        source,
        Arc::new(JsonEventDecoder::new()),
        pull,
        Cancellation::new(),
    );
    ResumableLoop::new(ProcessingStep::new(cycle), config)
}

/// Mount a two-partition log: partition 0 holds three events, partition 1 is
/// empty, both sealed
async fn mount_sealed_log(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/partitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "partitions": [
                {"id": 0, "last_sequence": 2},
                {"id": 1, "last_sequence": null}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/partitions/0/events"))
        .and(query_param("from", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"sequence": 0, "body": body(StreamEvent::point(1, 10))},
                {"sequence": 1, "body": body(StreamEvent::punctuation(1))},
                {"sequence": 2, "body": body(StreamEvent::point(2, 20))}
            ],
            "end_of_partition": false
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/partitions/0/events"))
        .and(query_param("from", "3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"events": [], "end_of_partition": true})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/partitions/1/events"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"events": [], "end_of_partition": true})),
        )
        .mount(server)
        .await;
}

// ============================================================================
// HTTP End-to-End Tests
// ============================================================================

#[tokio::test]
async fn test_http_end_to_end() {
    let server = MockServer::start().await;
    mount_sealed_log(&server).await;

    let config = PumpConfig::from_yaml_str(&format!(
        r#"
source:
  base_url: {}
  max_retries: 0
pull:
  min_wait_secs: 1
  max_wait_secs: 5
  fetch_wait_secs: 1
"#,
        server.uri()
    ))
    .unwrap();

    let source: Arc<dyn LogSource> = Arc::new(HttpLogSource::from_config(&config.source).unwrap());
    let dir = tempdir().unwrap();
    let states = StateManager::new(dir.path());

    let response = start_instance(source.as_ref(), &states, "orders", StartPosition::FromZero).await;
    assert_eq!(
        response,
        TriggerResponse::Accepted {
            instance_id: "orders".to_string(),
            positions: vec![0, 0],
        }
    );

    let cycle = PullCycle::new(
        Arc::clone(&source),
        decoder_for(config.source.decoder),
        config.pull.to_pull_config(),
        Cancellation::new(),
    );
    let resumable = ResumableLoop::new(ProcessingStep::new(cycle), config.resume.to_loop_config());

    let mut query = CountQuery::new();
    let outcome = resumable.run(&mut query, &states, "orders").await.unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.events_processed, 3);
    assert_eq!(outcome.state.positions, vec![3, 0]);
    assert_eq!(query.count(), 2);
    assert_eq!(query.watermark(), Some(1));
    assert!(!states.exists("orders").await.unwrap());
}

#[tokio::test]
async fn test_http_start_from_current() {
    let server = MockServer::start().await;
    mount_sealed_log(&server).await;

    let config = PumpConfig::from_yaml_str(&format!("source: {{base_url: '{}'}}", server.uri())).unwrap();
    let source = HttpLogSource::from_config(&config.source).unwrap();
    let states = StateManager::in_memory();

    let response = start_instance(&source, &states, "tail", StartPosition::FromCurrent).await;
    assert!(matches!(response, TriggerResponse::Accepted { ref positions, .. } if positions == &vec![3, 0]));
}

#[tokio::test]
async fn test_cli_start_show_run() {
    let server = MockServer::start().await;
    mount_sealed_log(&server).await;

    let dir = tempdir().unwrap();
    let config_path = dir.path().join("logpump.yaml");
    std::fs::write(
        &config_path,
        format!(
            "source:\n  base_url: {}\npull:\n  min_wait_secs: 1\n  max_wait_secs: 5\n  fetch_wait_secs: 1\nstate_dir: {}\n",
            server.uri(),
            dir.path().join("state").display()
        ),
    )
    .unwrap();
    let config_arg = config_path.to_str().unwrap();

    let run = |args: &[&str]| {
        let mut argv = vec!["logpump", "-c", config_arg];
        argv.extend_from_slice(args);
        Runner::new(Cli::parse_from(argv))
    };

    run(&["start", "--instance", "cli"]).run().await.unwrap();
    run(&["show", "--instance", "cli"]).run().await.unwrap();
    run(&["list"]).run().await.unwrap();

    // Starting the same instance twice is rejected
    assert!(run(&["start", "--instance", "cli"]).run().await.is_err());

    run(&["run", "--instance", "cli"]).run().await.unwrap();

    // Completed instances leave no state behind
    assert!(run(&["show", "--instance", "cli"]).run().await.is_err());
}

// ============================================================================
// Memory End-to-End Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_restart_from_disk_resumes_exactly() {
    let source = Arc::new(MemoryLogSource::new(3));
    for partition in 0..3 {
        for i in 0..5 {
            source.append(partition, StreamEvent::point(i, i)).unwrap();
        }
    }

    let dir = tempdir().unwrap();
    {
        let states = StateManager::new(dir.path());
        assert!(start_instance(source.as_ref(), &states, "q", StartPosition::FromZero)
            .await
            .is_accepted());

        let first = resumable(
            Arc::clone(&source) as Arc<dyn LogSource>,
            PullConfig::default(),
            LoopConfig::new().with_max_iterations(1),
        )
        .run(&mut CountQuery::new(), &states, "q")
        .await
        .unwrap();
        assert_eq!(first.events_processed, 15);
        assert!(!first.completed);
    }

    // New process: new state manager, new query engine, more input
    for partition in 0..3 {
        source.append(partition, StreamEvent::point(9, 9)).unwrap();
    }
    source.seal_all();

    let states = StateManager::new(dir.path());
    let record = states.load("q").await.unwrap().unwrap();
    assert_eq!(record.state.positions, vec![5, 5, 5]);

    let mut query = CountQuery::new();
    let second = resumable(
        Arc::clone(&source) as Arc<dyn LogSource>,
        PullConfig::default(),
        LoopConfig::new(),
    )
    .run(&mut query, &states, "q")
    .await
    .unwrap();

    assert!(second.completed);
    assert_eq!(second.events_processed, 3);
    assert_eq!(second.state.positions, vec![6, 6, 6]);
    assert_eq!(query.count(), 18);
}

#[tokio::test(start_paused = true)]
async fn test_idle_log_backs_off_then_completes() {
    let source = Arc::new(MemoryLogSource::new(2));
    let states = StateManager::in_memory();
    assert!(start_instance(source.as_ref(), &states, "idle", StartPosition::FromZero)
        .await
        .is_accepted());

    // Data shows up while the loop sleeps after its first, empty step
    {
        let source = Arc::clone(&source);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(35)).await;
            source.append(1, StreamEvent::point(1, 1)).unwrap();
            source.seal_all();
        });
    }

    let started = tokio::time::Instant::now();
    let mut query = CountQuery::new();
    let outcome = resumable(
        Arc::clone(&source) as Arc<dyn LogSource>,
        PullConfig::default(),
        LoopConfig::default(),
    )
    .run(&mut query, &states, "idle")
    .await
    .unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(query.count(), 1);
    // 20s idle cycle followed by the 30s passive wait
    assert!(started.elapsed() >= Duration::from_secs(50));
}
