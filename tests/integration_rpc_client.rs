use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use solana_outflow_monitor::blockchain::{BlockSource, ProviderAccess, RpcClient};
use solana_outflow_monitor::error::ProviderError;
use solana_outflow_monitor::models::BlockFetch;

fn client(endpoint: String) -> RpcClient {
    RpcClient::new(endpoint, "finalized".to_string(), 5)
}

async fn mount_rpc_result(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1
        })))
        .mount(server)
        .await;
}

async fn mount_rpc_error(server: &MockServer, rpc_method: &str, code: i64, message: &str) {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": code, "message": message },
            "id": 1
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_slot() {
    let server = MockServer::start().await;
    mount_rpc_result(&server, "getSlot", json!(341_913_040u64)).await;

    let slot = client(server.uri()).get_slot().await.unwrap();
    assert_eq!(slot, 341_913_040);
}

#[tokio::test]
async fn test_get_block_null_result_is_absent() {
    let server = MockServer::start().await;
    mount_rpc_result(&server, "getBlock", json!(null)).await;

    let fetch = client(server.uri()).get_block(100).await.unwrap();
    assert_eq!(fetch, BlockFetch::Absent);
}

#[tokio::test]
async fn test_get_block_skipped_slot_is_absent() {
    let server = MockServer::start().await;
    mount_rpc_error(&server, "getBlock", -32007, "Slot 100 was skipped").await;

    let fetch = client(server.uri()).get_block(100).await.unwrap();
    assert_eq!(fetch, BlockFetch::Absent);
}

#[tokio::test]
async fn test_get_block_long_term_storage_skip_is_absent() {
    let server = MockServer::start().await;
    mount_rpc_error(
        &server,
        "getBlock",
        -32009,
        "Slot 100 was skipped, or missing in long-term storage",
    )
    .await;

    let fetch = client(server.uri()).get_block(100).await.unwrap();
    assert_eq!(fetch, BlockFetch::Absent);
}

#[tokio::test]
async fn test_get_block_not_yet_available_is_transient() {
    let server = MockServer::start().await;
    mount_rpc_error(&server, "getBlock", -32004, "Block not available for slot 100").await;

    let err = client(server.uri()).get_block(100).await.unwrap_err();
    assert!(matches!(err, ProviderError::BlockNotReady { slot: 100 }));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_get_block_decodes_transactions() {
    let server = MockServer::start().await;
    mount_rpc_result(
        &server,
        "getBlock",
        json!({
            "blockhash": "hash",
            "parentSlot": 99,
            "transactions": [
                {
                    "transaction": {
                        "signatures": ["5sig"],
                        "message": { "accountKeys": ["ACC1", "ACC2"] }
                    },
                    "meta": {
                        "preBalances": [100_000_000_000u64, 10_000_000_000u64],
                        "postBalances": [80_500_000_000u64, 29_500_000_000u64]
                    }
                }
            ]
        }),
    )
    .await;

    let fetch = client(server.uri()).get_block(100).await.unwrap();
    let transactions = match fetch {
        BlockFetch::Present(txs) => txs,
        BlockFetch::Absent => panic!("expected a present block"),
    };
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].signature, "5sig");
    assert_eq!(transactions[0].balances[0].pre_sol, 100.0);
    assert_eq!(transactions[0].balances[0].post_sol, 80.5);
    assert_eq!(transactions[0].balances[1].account, "ACC2");
}

#[tokio::test]
async fn test_rate_limit_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(server.uri()).get_slot().await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimit));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_server_error_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(server.uri()).get_slot().await.unwrap_err();
    assert!(matches!(err, ProviderError::Connection(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unexpected_rpc_error_passes_through() {
    let server = MockServer::start().await;
    mount_rpc_error(&server, "getBlock", -32602, "Invalid params").await;

    let err = client(server.uri()).get_block(100).await.unwrap_err();
    assert!(matches!(err, ProviderError::Rpc { code: -32602, .. }));
}

#[tokio::test]
async fn test_failover_to_secondary_endpoint() {
    let primary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&primary)
        .await;

    let secondary = MockServer::start().await;
    mount_rpc_result(&secondary, "getSlot", json!(200u64)).await;

    let mut provider = ProviderAccess::new(
        client(primary.uri()),
        Some(client(secondary.uri())),
    );

    assert!(provider.current_height().await.is_err());
    provider.report_failure();
    assert!(provider.is_on_secondary());
    assert_eq!(provider.current_height().await.unwrap(), 200);

    provider.report_recovery();
    assert!(!provider.is_on_secondary());
    assert!(provider.current_height().await.is_err());
}
