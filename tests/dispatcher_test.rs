//! End-to-end routing through a fully wired runtime

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use common::*;
use distill_core::config::{Catalog, ChuteDefaults, DistillConfig};
use distill_core::constants::{events, routing};
use distill_core::dispatch::{DispatchOutcome, DropReason};
use distill_core::distilleries::Distillery;
use distill_core::messaging::{InMemoryQueueService, QueueService};
use distill_core::monitors::{Monitor, MonitorStatus};
use distill_core::sieves::{FieldRule, Operator, Sieve};
use distill_core::sifter::Chute;
use distill_core::watchdogs::{Trigger, Watchdog};
use distill_core::{AlertLevel, Runtime, ShutdownSignal, TimeUnit};

const MAIL: &str = "elasticsearch.cyphon.mail";
const LOGS: &str = "elasticsearch.cyphon.logs";

fn catalog() -> Catalog {
    let urgent = Sieve::all(vec![FieldRule::new("subject", Operator::Contains, json!("urgent"))]);
    let auth = Sieve::all(vec![FieldRule::new(
        "message",
        Operator::Contains,
        json!("authentication failure"),
    )]);

    Catalog {
        distilleries: vec![
            Distillery::new(MAIL).with_categories(["mail"]),
            Distillery::new(LOGS).with_categories(["logs"]),
        ],
        log_chutes: vec![Chute::new(LOGS).with_name("auth").with_sieve(auth)],
        data_chutes: vec![Chute::new(MAIL).with_platform("imap")],
        watchdogs: vec![Watchdog::new("mail_watch", vec![Trigger::new(0, AlertLevel::High, urgent)])
            .with_categories(["mail"])],
        monitors: vec![Monitor::new("mail_health", vec![MAIL.to_string()], 5, TimeUnit::Minutes)],
    }
}

fn runtime() -> (Runtime, Arc<InMemoryQueueService>) {
    let mut config = DistillConfig::default();
    config.sweep.enabled = false;
    config.consumers.polling_interval_ms = 10;
    config.sifter.log = ChuteDefaults {
        default_distillery: Some(LOGS.to_string()),
        default_enabled: false,
    };
    let queue = Arc::new(InMemoryQueueService::new());
    (Runtime::build(&config, catalog(), queue.clone()), queue)
}

#[tokio::test]
async fn test_undecodable_message_is_logged_with_body_and_dropped() {
    let (runtime, _) = runtime();
    let capture = LogCapture::new();
    let _guard = capture.install();

    let outcome = runtime
        .dispatcher
        .dispatch(routing::WATCHDOGS, b"not json at all")
        .await;

    assert!(matches!(outcome, DispatchOutcome::Dropped(DropReason::Decode(_))));
    assert!(capture.contains("An error occurred while processing the message"));
    assert!(capture.contains("not json at all"));
}

#[tokio::test]
async fn test_unroutable_key_is_logged_and_dropped() {
    let (runtime, _) = runtime();
    let capture = LogCapture::new();
    let _guard = capture.install();
    let mut receiver = runtime.publisher.subscribe();

    let outcome = runtime
        .dispatcher
        .dispatch("bogus", &message_body("1", json!({"marker": "unroutable-4411"})))
        .await;

    assert_eq!(outcome, DispatchOutcome::Dropped(DropReason::Unroutable("bogus".to_string())));
    assert!(capture.contains("Dropping message with unknown routing key"));
    assert!(capture.contains("unroutable-4411"));

    let event = receiver.recv().await.unwrap();
    assert_eq!(event.name, events::MESSAGE_DROPPED);
    assert_eq!(event.context["reason"], "unroutable_key");
}

#[tokio::test]
async fn test_processor_failure_is_logged_with_body_and_dropped() {
    let (runtime, _) = runtime();
    let capture = LogCapture::new();
    let _guard = capture.install();

    // the monitor processor needs a collection
    let outcome = runtime
        .dispatcher
        .dispatch(routing::MONITORS, br#"{"@uuid": "9", "marker": "sentinel-7731"}"#)
        .await;

    match outcome {
        DispatchOutcome::Dropped(DropReason::ProcessorFailure { processor, .. }) => {
            assert_eq!(processor, "MonitorProcessor");
        }
        other => panic!("expected a processor failure, got {other:?}"),
    }
    assert!(capture.contains("MonitorProcessor failed"));
    assert!(capture.contains("sentinel-7731"));
}

#[tokio::test]
async fn test_monitor_message_heartbeats() {
    let (runtime, _) = runtime();
    let body = serde_json::to_vec(&json!({"@uuid": "5", "collection": MAIL})).unwrap();

    let outcome = runtime.dispatcher.dispatch(routing::MONITORS, &body).await;

    assert_eq!(outcome, DispatchOutcome::Processed { processor: "MonitorProcessor" });
    let monitor = runtime.monitors.snapshot("mail_health").unwrap();
    assert_eq!(monitor.status(), MonitorStatus::Green);
    assert_eq!(monitor.state().last_saved_doc.as_deref(), Some("5"));
    assert!(monitor.state().last_healthy.is_some());
}

#[tokio::test]
async fn test_watchdog_message_raises_alert() {
    let (runtime, _) = runtime();
    let body = serde_json::to_vec(&json!({
        "@uuid": "7",
        "collection": MAIL,
        "subject": "urgent: wire transfer",
        "title": "urgent: wire transfer",
    }))
    .unwrap();

    let outcome = runtime.dispatcher.dispatch(routing::WATCHDOGS, &body).await;

    assert!(outcome.is_processed());
    let alerts = runtime.alerts.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].level, AlertLevel::High);
    assert_eq!(alerts[0].display_title(), "urgent: wire transfer");
    assert_eq!(alerts[0].doc_id.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_data_chute_saves_and_notifies_listeners() {
    let (runtime, _) = runtime();
    let body = serde_json::to_vec(&json!({
        "@uuid": "raw-1",
        "collection": "mongodb.imap.raw",
        "subject": "urgent: call me",
    }))
    .unwrap();

    let outcome = runtime.dispatcher.dispatch(routing::DATACHUTES, &body).await;

    assert_eq!(outcome, DispatchOutcome::Processed { processor: "DataProcessor" });

    let saved = runtime.documents.documents_in(MAIL);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["_platform"], "imap");
    assert_eq!(saved[0]["_distillery"], MAIL);
    assert_eq!(saved[0]["_raw_data"]["doc_id"], "raw-1");

    // saving into the mail distillery is activity for its monitor and
    // input for its watchdog
    let monitor = runtime.monitors.snapshot("mail_health").unwrap();
    assert_eq!(monitor.state().last_active_distillery.as_deref(), Some(MAIL));
    assert_eq!(runtime.alerts.count(), 1);
}

#[tokio::test]
async fn test_log_chute_without_match_and_disabled_default_saves_nothing() {
    let (runtime, _) = runtime();
    let body = serde_json::to_vec(&json!({"message": "all good"})).unwrap();

    let outcome = runtime.dispatcher.dispatch(routing::LOGCHUTES, &body).await;

    assert!(outcome.is_processed());
    assert!(runtime.documents.documents_in(LOGS).is_empty());
}

#[tokio::test]
async fn test_consumers_drain_queue_and_ack_everything() {
    let (runtime, queue) = runtime();
    let shutdown = ShutdownSignal::new();
    let handles = runtime
        .consumer
        .create_consumers(routing::MONITORS, 2, &shutdown)
        .await
        .unwrap();

    let good = serde_json::to_vec(&json!({"@uuid": "11", "collection": MAIL})).unwrap();
    queue.publish(routing::MONITORS, &good).await.unwrap();
    queue.publish(routing::MONITORS, b"{broken").await.unwrap();
    queue.publish(routing::MONITORS, &good).await.unwrap();

    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while queue.acked_count(routing::MONITORS).await < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "queue was not drained");

    shutdown.trigger();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(queue.queue_length(routing::MONITORS).await, 0);
    assert_eq!(queue.nacked_count(routing::MONITORS).await, 0);
    assert_eq!(
        runtime.monitors.snapshot("mail_health").unwrap().status(),
        MonitorStatus::Green
    );
}

#[tokio::test]
async fn test_runtime_start_and_shutdown() {
    let (runtime, queue) = runtime();
    let shutdown = ShutdownSignal::new();

    let handles = runtime.start(&shutdown).await.unwrap();
    assert_eq!(handles.len(), routing::ALL.len());

    // every queue was declared, so publishing succeeds on each key
    let body = serde_json::to_vec(&json!({"@uuid": "21", "collection": MAIL})).unwrap();
    for key in routing::ALL {
        queue.publish(key, &body).await.unwrap();
    }
    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while queue.acked_count(routing::MONITORS).await < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "monitor queue was not consumed");

    shutdown.trigger();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker stops")
            .unwrap();
    }
}
