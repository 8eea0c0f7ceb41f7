use ethers::types::Address;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use vault_greeks_core::{Snapshot, Vault, VaultStore};
use vault_greeks_web_api::{BroadcastHub, HubServer};

fn store() -> Arc<VaultStore> {
    Arc::new(VaultStore::new(vec![Vault {
        name: "WETH-USDC".to_string(),
        address: Address::from_low_u64_be(1),
        position_manager: Address::from_low_u64_be(2),
        oracle_aggregator: Address::from_low_u64_be(3),
        base_decimals: 18,
        quote_decimals: 6,
    }]))
}

async fn start(hub: Arc<BroadcastHub>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(HubServer::new(hub).serve_on(listener));
    format!("ws://{addr}")
}

async fn next_snapshot<S>(ws: &mut S) -> Snapshot
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn subscriber_gets_state_on_connect_then_updates() {
    let store = store();
    store.set_price("WETH-USDC", 2010.5).unwrap();
    let hub = Arc::new(BroadcastHub::new(store.clone()));
    let url = start(hub.clone()).await;

    let (mut ws, _) = connect_async(format!("{url}/delta")).await.unwrap();
    let initial = next_snapshot(&mut ws).await;
    assert_eq!(initial.get("WETH-USDC").unwrap().price, 2010.5);
    assert_eq!(hub.open_count(), 1);

    // arbitrary client text is ignored
    ws.send(Message::Text("ping".to_string())).await.unwrap();

    store.set_delta("WETH-USDC", 1.25).unwrap();
    let report = hub.broadcast().unwrap();
    assert_eq!(report.delivered, 1);

    let update = next_snapshot(&mut ws).await;
    assert_eq!(update.get("WETH-USDC").unwrap().delta, 1.25);
}

#[tokio::test]
async fn root_path_is_also_a_publish_channel() {
    let hub = Arc::new(BroadcastHub::new(store()));
    let url = start(hub).await;

    let (mut ws, _) = connect_async(format!("{url}/")).await.unwrap();
    let initial = next_snapshot(&mut ws).await;

    assert_eq!(initial.deltas.len(), 1);
    assert_eq!(initial.deltas[0].price, 1.0);
    assert_eq!(initial.deltas[0].delta, 0.0);
}

#[tokio::test]
async fn closed_subscriber_is_forgotten() {
    let hub = Arc::new(BroadcastHub::new(store()));
    let url = start(hub.clone()).await;

    let (mut ws, _) = connect_async(url).await.unwrap();
    let _ = next_snapshot(&mut ws).await;
    ws.close(None).await.unwrap();

    for _ in 0..50 {
        if hub.open_count() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(hub.open_count(), 0);
}
