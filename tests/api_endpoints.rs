//! Integration tests for the CitizenChain REST API
//!
//! Exercise the router end to end with `axum-test`: envelope shape,
//! status-code mapping and the citizen/election workflow.

use axum_test::TestServer;
use citizenchain::api::build_api_router;
use citizenchain::config::Config;
use citizenchain::crypto::KeyPair;
use citizenchain::node::{Node, NodeState};
use citizenchain::policy::GENESIS_ADMIN;
use citizenchain::transaction::{Transaction, TxData};
use serde_json::{json, Value};
use std::sync::Arc;

async fn ready_server() -> (TestServer, Arc<Node>) {
    let node = Arc::new(Node::new(Config::default()));
    node.set_state(NodeState::Ready).await;
    let server = TestServer::new(build_api_router(node.clone())).expect("Failed to create test server");
    (server, node)
}

async fn register_and_approve(server: &TestServer, name: &str, key: &str) -> String {
    let response = server
        .post("/api/citizens/register")
        .json(&json!({ "name": name, "dateOfBirth": "1990-01-01", "publicKey": key }))
        .await;
    assert_eq!(response.status_code(), 200);

    let citizen: Value = server.get(&format!("/api/citizens/{}", key)).await.json();
    let citizen_id = citizen["data"]["id"].as_str().unwrap_or_default().to_string();

    let response = server
        .post("/api/citizens/approve")
        .json(&json!({ "citizenId": citizen_id, "approverKey": GENESIS_ADMIN }))
        .await;
    assert_eq!(response.status_code(), 200);
    citizen_id
}

#[tokio::test]
async fn test_system_endpoints() {
    let (server, _node) = ready_server().await;

    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
    assert_eq!(json["data"]["node_id"], "node-1");
    assert!(json["data"]["timestamp"].is_string());

    let response = server.get("/api/blocks").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["data"][0]["index"], 0);
    assert_eq!(json["data"][0]["prev_hash"], "0".repeat(64));

    let response = server.get("/api/blocks/validate").await;
    let json: Value = response.json();
    assert_eq!(json["data"]["valid"], true);
    assert_eq!(json["data"]["height"], 1);

    let response = server.get("/api/mempool").await;
    let json: Value = response.json();
    assert_eq!(json["data"]["count"], 0);
    assert!(json["data"]["transactions"].is_array());

    let response = server.get("/api/stats").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["data"]["height"], 1);
    assert!(json["data"]["total_requests"].is_number());
}

#[tokio::test]
async fn test_health_reports_booting_node() {
    let node = Arc::new(Node::new(Config::default()));
    let server = TestServer::new(build_api_router(node)).expect("Failed to create test server");

    let response = server.get("/api/health").await;
    assert_eq!(response.status_code(), 503);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["node_state"], "Booting");
}

#[tokio::test]
async fn test_transfer_and_block_cut() {
    let (server, _node) = ready_server().await;

    let response = server
        .post("/api/transactions")
        .json(&json!({ "from": "alice", "to": "bob", "amount": 42 }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    let tx_id = json["data"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(json["data"]["amount"], 42);

    let response = server.get(&format!("/api/transactions/{}", tx_id)).await;
    assert_eq!(response.status_code(), 200);

    let response = server.post("/api/blocks/cut").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["data"]["index"], 1);
    assert_eq!(json["data"]["transactions"][0]["id"], tx_id.as_str());

    let json: Value = server.get("/api/blocks/latest").await.json();
    assert_eq!(json["data"]["index"], 1);

    let response = server
        .post("/api/transactions")
        .json(&json!({ "from": "", "to": "bob", "amount": 1 }))
        .await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "INVALID_INPUT");

    let response = server.get("/api/transactions/unknown").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_signed_transaction_submission() {
    let (server, node) = ready_server().await;

    let keypair = KeyPair::generate();
    let mut tx = Transaction::new(keypair.identity(), "bob", 5);
    tx.sign(&keypair).expect("sign");

    let response = server.post("/api/transactions/signed").json(&tx).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(node.chain.pool_size(), 1);

    let response = server.post("/api/transactions/signed").json(&tx).await;
    assert_eq!(response.status_code(), 409);
    let json: Value = response.json();
    assert_eq!(json["kind"], "DUPLICATE_TRANSACTION");

    let mut forged = tx.clone();
    forged.amount = 500;
    let response = server.post("/api/transactions/signed").json(&forged).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_signed_submission_rejects_tagged_payloads() {
    let (server, node) = ready_server().await;

    let keypair = KeyPair::generate();
    let payloads = [
        TxData::VoteCast {
            candidate_id: "ghost".to_string(),
        },
        TxData::CitizenApproval {
            citizen_id: "someone".to_string(),
            approver_key: GENESIS_ADMIN.to_string(),
        },
    ];

    for payload in payloads {
        let mut tx = Transaction::new(keypair.identity(), "ELECTION", 0).with_data(payload);
        tx.sign(&keypair).expect("sign");

        let response = server.post("/api/transactions/signed").json(&tx).await;
        assert_eq!(response.status_code(), 400);
        let json: Value = response.json();
        assert_eq!(json["kind"], "INVALID_TRANSACTION");
    }

    assert_eq!(node.chain.pool_size(), 0);
    let json: Value = server.post("/api/blocks/cut").await.json();
    assert_eq!(json["data"]["transactions"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_block_by_index() {
    let (server, _node) = ready_server().await;
    server.post("/api/blocks/cut").await;

    let response = server.get("/api/blocks/1").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["data"]["index"], 1);

    let response = server.get("/api/blocks/0").await;
    let json: Value = response.json();
    assert_eq!(json["data"]["prev_hash"], "0".repeat(64));

    let response = server.get("/api/blocks/7").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_citizen_workflow_status_codes() {
    let (server, _node) = ready_server().await;

    let citizen_id = register_and_approve(&server, "Abebe", "pk-abebe").await;

    let response = server
        .post("/api/citizens/register")
        .json(&json!({ "name": "Again", "dateOfBirth": "2000-01-01", "publicKey": "pk-abebe" }))
        .await;
    assert_eq!(response.status_code(), 409);
    let json: Value = response.json();
    assert_eq!(json["kind"], "ALREADY_REGISTERED");

    let response = server
        .post("/api/citizens/approve")
        .json(&json!({ "citizenId": citizen_id, "approverKey": GENESIS_ADMIN }))
        .await;
    assert_eq!(response.status_code(), 409);

    server
        .post("/api/citizens/register")
        .json(&json!({ "name": "Kebede", "dateOfBirth": "1985-03-03", "publicKey": "pk-kebede" }))
        .await;
    let kebede: Value = server.get("/api/citizens/pk-kebede").await.json();
    let response = server
        .post("/api/citizens/reject")
        .json(&json!({ "citizenId": kebede["data"]["id"], "approverKey": "pk-abebe" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = server
        .post("/api/citizens/approve")
        .json(&json!({ "citizenId": "missing", "approverKey": GENESIS_ADMIN }))
        .await;
    assert_eq!(response.status_code(), 404);

    let json: Value = server.get("/api/citizens").await.json();
    assert_eq!(json["data"].as_array().map(Vec::len), Some(2));

    let response = server.get("/api/citizens/pk-nobody").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_election_endpoints() {
    let (server, _node) = ready_server().await;

    let response = server.get("/api/elections/current").await;
    assert_eq!(response.status_code(), 404);

    register_and_approve(&server, "Almaz", "pk-almaz").await;
    register_and_approve(&server, "Voter", "pk-voter").await;

    let response = server
        .post("/api/elections/start")
        .json(&json!({ "name": "Regional", "durationDays": 14 }))
        .await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["data"]["data"]["type"], "ELECTION_START");

    let response = server
        .post("/api/elections/start")
        .json(&json!({ "name": "Another", "durationDays": 14 }))
        .await;
    assert_eq!(response.status_code(), 409);

    let response = server
        .post("/api/elections/candidates")
        .json(&json!({ "name": "Almaz", "publicKey": "pk-almaz", "platform": "Water" }))
        .await;
    assert_eq!(response.status_code(), 200);

    let json: Value = server.get("/api/elections/current/candidates").await.json();
    let candidate_id = json["data"][0]["id"].as_str().unwrap_or_default().to_string();

    let vote = json!({ "citizenPublicKey": "pk-voter", "candidateId": candidate_id });
    let response = server.post("/api/elections/vote").json(&vote).await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["data"]["from"], "pk-voter");

    let response = server.post("/api/elections/vote").json(&vote).await;
    assert_eq!(response.status_code(), 409);
    let json: Value = response.json();
    assert_eq!(json["kind"], "ALREADY_VOTED");

    let json: Value = server.get("/api/elections/current").await.json();
    assert_eq!(json["data"]["status"], "InProgress");

    let response = server.post("/api/elections/end").await;
    assert_eq!(response.status_code(), 200);

    let response = server.post("/api/elections/end").await;
    assert_eq!(response.status_code(), 409);
    let json: Value = response.json();
    assert_eq!(json["kind"], "NO_ACTIVE_ELECTION");

    let json: Value = server.get("/api/elections/history").await.json();
    assert_eq!(json["data"][0]["winner"]["id"], candidate_id.as_str());
}

#[tokio::test]
async fn test_cancel_election_requires_permission() {
    let (server, _node) = ready_server().await;

    server
        .post("/api/elections/start")
        .json(&json!({ "name": "Snap", "durationDays": 1 }))
        .await;

    let response = server
        .post("/api/elections/cancel")
        .json(&json!({ "approverKey": "intruder" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = server
        .post("/api/elections/cancel")
        .json(&json!({ "approverKey": GENESIS_ADMIN }))
        .await;
    assert_eq!(response.status_code(), 200);

    let json: Value = server.get("/api/elections/history").await.json();
    assert_eq!(json["data"][0]["status"], "Cancelled");
}
