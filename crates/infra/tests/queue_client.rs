//! Integration tests for the queue adapter against a mock queue service.

use std::sync::Arc;

use routesync_core::{QueueDrainer, RoutePublisher};
use routesync_domain::{JobRecord, QueueConfig, ReceiptHandle, Route, RouteSyncError};
use routesync_infra::QueueClient;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn queue_config(server: &MockServer) -> QueueConfig {
    serde_json::from_value(json!({
        "endpoint": server.uri(),
        "queue_url": "http://queue.local/000000000000/routes",
        "max_messages": 10,
        "request_timeout_ms": 2_000
    }))
    .unwrap()
}

fn target(action: &str) -> wiremock::matchers::HeaderExactMatcher {
    header("X-Amz-Target", format!("AmazonSQS.{action}"))
}

fn route(id: &str, jobs: usize) -> Route {
    Route {
        route_id: id.to_string(),
        jobs: (0..jobs).map(|n| JobRecord::new(id).with_attribute("JobId", n)).collect(),
    }
}

fn all_successful(count: usize) -> ResponseTemplate {
    let successful: Vec<Value> =
        (0..count).map(|id| json!({ "Id": id.to_string(), "MessageId": format!("m-{id}") })).collect();
    ResponseTemplate::new(200).set_body_json(json!({ "Successful": successful, "Failed": [] }))
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|req| serde_json::from_slice(&req.body).unwrap())
        .collect()
}

#[tokio::test]
async fn publish_sends_one_message_per_route() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("SendMessageBatch"))
        .and(header("Content-Type", "application/x-amz-json-1.0"))
        .and(body_partial_json(json!({ "QueueUrl": "http://queue.local/000000000000/routes" })))
        .respond_with(all_successful(2))
        .expect(1)
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let ack = client.publish(&[route("A", 2), route("B", 1)]).await.unwrap();

    assert_eq!(ack.accepted, 2);
    assert!(ack.failed.is_empty());

    let bodies = request_bodies(&server).await;
    let entries = bodies[0]["Entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);

    let first: Value = serde_json::from_str(entries[0]["MessageBody"].as_str().unwrap()).unwrap();
    assert_eq!(first["routeId"], "A");
    assert_eq!(first["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(first["jobs"][1]["RouteId"], "A");
    assert!(first.get("random").is_none());
}

#[tokio::test]
async fn empty_publish_makes_no_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(all_successful(0)).expect(0).mount(&server).await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let ack = client.publish(&[]).await.unwrap();

    assert_eq!(ack.accepted, 0);
}

#[tokio::test]
async fn partial_publish_failure_is_acknowledged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("SendMessageBatch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Successful": [{ "Id": "0", "MessageId": "m-0" }],
            "Failed": [{ "Id": "1", "SenderFault": true, "Code": "InvalidMessageContents" }]
        })))
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let ack = client.publish(&[route("A", 1), route("B", 1)]).await.unwrap();

    assert_eq!(ack.accepted, 1);
    assert_eq!(ack.failed.len(), 1);
    assert_eq!(ack.failed[0].id, "1");
    assert_eq!(ack.failed[0].code, "InvalidMessageContents");
    assert!(ack.failed[0].sender_fault);
}

#[tokio::test]
async fn fully_rejected_publish_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Successful": [],
            "Failed": [{ "Id": "0", "SenderFault": false, "Code": "InternalError" }]
        })))
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let err = client.publish(&[route("A", 1)]).await.unwrap_err();

    assert!(matches!(err, RouteSyncError::QueuePublish(msg) if msg.contains("InternalError")));
}

#[tokio::test]
async fn service_error_is_publish_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.sqs#QueueDoesNotExist",
            "message": "The specified queue does not exist."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let err = client.publish(&[route("A", 1)]).await.unwrap_err();

    match err {
        RouteSyncError::QueuePublish(msg) => {
            assert!(msg.contains("400"));
            assert!(msg.contains("QueueDoesNotExist"));
        }
        other => panic!("expected publish failure, got {other:?}"),
    }
}

#[tokio::test]
async fn large_publish_is_split_at_batch_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("SendMessageBatch"))
        .respond_with(|req: &wiremock::Request| -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let count = body["Entries"].as_array().map_or(0, Vec::len);
            all_successful(count)
        })
        .expect(2)
        .mount(&server)
        .await;

    let routes: Vec<Route> = (0..12).map(|n| route(&format!("R{n}"), 1)).collect();
    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let ack = client.publish(&routes).await.unwrap();

    assert_eq!(ack.accepted, 12);
    let sizes: Vec<usize> = request_bodies(&server)
        .await
        .iter()
        .map(|body| body["Entries"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![10, 2]);
}

#[tokio::test]
async fn receive_maps_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("ReceiveMessage"))
        .and(body_partial_json(json!({ "MaxNumberOfMessages": 10, "WaitTimeSeconds": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Messages": [
                { "MessageId": "m-1", "ReceiptHandle": "h-1", "Body": "{\"routeId\":\"A\"}" },
                { "MessageId": "m-2", "ReceiptHandle": "h-2", "Body": "opaque" }
            ]
        })))
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let messages = client.receive_messages().await.unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].receipt_handle.as_str(), "h-1");
    assert_eq!(messages[1].body, "opaque");
}

#[tokio::test]
async fn receive_without_messages_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("ReceiveMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    assert!(client.receive_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn receive_error_is_receive_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let err = client.receive_messages().await.unwrap_err();
    assert!(matches!(err, RouteSyncError::QueueReceive(_)));
}

#[tokio::test]
async fn delete_reports_per_handle_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("DeleteMessageBatch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Successful": [{ "Id": "0" }, { "Id": "2" }],
            "Failed": [{
                "Id": "1",
                "SenderFault": true,
                "Code": "ReceiptHandleIsInvalid",
                "Message": "expired"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let handles = ["h-0", "h-1", "h-2"].map(ReceiptHandle::new);
    let outcome = client.delete_messages(&handles).await.unwrap();

    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].message.as_deref(), Some("expired"));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["Entries"][1], json!({ "Id": "1", "ReceiptHandle": "h-1" }));
}

#[tokio::test]
async fn failed_delete_chunk_keeps_earlier_counts() {
    let server = MockServer::start().await;
    let all_deleted: Vec<Value> = (0..10).map(|id| json!({ "Id": id.to_string() })).collect();
    Mock::given(method("POST"))
        .and(target("DeleteMessageBatch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "Successful": all_deleted, "Failed": [] })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(target("DeleteMessageBatch"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "__type": "com.amazonaws.sqs#InternalError",
            "message": "try later"
        })))
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let handles: Vec<ReceiptHandle> =
        (0..12).map(|idx| ReceiptHandle::new(format!("h-{idx}"))).collect();
    let outcome = client.delete_messages(&handles).await.unwrap();

    assert_eq!(outcome.deleted, 10);
    let failed_ids: Vec<&str> = outcome.failed.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(failed_ids, vec!["10", "11"]);
    assert!(outcome.failed.iter().all(|f| !f.sender_fault));
}

#[tokio::test]
async fn every_delete_chunk_failing_is_delete_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("DeleteMessageBatch"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let handles: Vec<ReceiptHandle> =
        (0..12).map(|idx| ReceiptHandle::new(format!("h-{idx}"))).collect();
    let err = client.delete_messages(&handles).await.unwrap_err();

    assert!(matches!(err, RouteSyncError::QueueDelete(_)));
}

#[tokio::test]
async fn malformed_receive_body_is_receive_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("ReceiveMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"Messages\": ["))
        .mount(&server)
        .await;

    let client = QueueClient::new(&queue_config(&server)).unwrap();
    let err = client.receive_messages().await.unwrap_err();

    match err {
        RouteSyncError::QueueReceive(msg) => {
            assert!(msg.contains("ReceiveMessage"), "{msg}");
            assert!(msg.contains("JSON"), "{msg}");
        }
        other => panic!("expected receive failure, got {other:?}"),
    }
}

#[tokio::test]
async fn drain_cycle_tolerates_partial_delete_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("ReceiveMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Messages": [
                { "ReceiptHandle": "h-0", "Body": "a" },
                { "ReceiptHandle": "h-1", "Body": "b" },
                { "ReceiptHandle": "h-2", "Body": "c" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(target("DeleteMessageBatch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Successful": [{ "Id": "0" }, { "Id": "1" }],
            "Failed": [{ "Id": "2", "SenderFault": true, "Code": "ReceiptHandleIsInvalid" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(QueueClient::new(&queue_config(&server)).unwrap());
    let report = QueueDrainer::new(client).drain_cycle().await;

    assert_eq!(report.received, 3);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn drain_cycle_with_empty_queue_skips_delete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(target("ReceiveMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Messages": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(target("DeleteMessageBatch"))
        .respond_with(all_successful(0))
        .expect(0)
        .mount(&server)
        .await;

    let client = Arc::new(QueueClient::new(&queue_config(&server)).unwrap());
    let report = QueueDrainer::new(client).drain_cycle().await;

    assert_eq!(report.received, 0);
    assert!(report.is_clean());
}
