//! Failure injection tests for the rate gateway.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;

/// Upstream that answers with `script[n]` on the n-th call, repeating the last entry.
async fn scripted_upstream(script: Vec<(u16, &'static str)>) -> (std::net::SocketAddr, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let script = Arc::new(script);
    let addr = common::start_programmable_backend(move || {
        let cc = cc.clone();
        let script = script.clone();
        async move {
            let n = cc.fetch_add(1, Ordering::SeqCst) as usize;
            let (status, body) = script[n.min(script.len() - 1)];
            (status, body.to_string())
        }
    })
    .await;
    (addr, calls)
}

#[tokio::test]
async fn test_retry_on_failure() {
    let (upstream, calls) = scripted_upstream(vec![
        (503, "Service Unavailable"),
        (503, "Service Unavailable"),
        (200, common::EUR_BODY),
    ])
    .await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{gateway}/exchange/EUR"))
        .send()
        .await
        .expect("Gateway unreachable");

    assert_eq!(res.status(), 200, "Should eventually succeed after retries");
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["currencyCode"], "EUR");
    assert_eq!(body["currencyName"], "EUR");
    assert_eq!(body["buyRate"], 6.125);
    assert_eq!(body["lastUpdate"], "2026-01-20T14:30:00.000Z");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let (upstream, calls) = scripted_upstream(vec![(404, "{}")]).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{gateway}/exchange/USD"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_empty_quote_list_is_not_retried() {
    let (upstream, calls) = scripted_upstream(vec![(200, "[]")]).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{gateway}/exchange/USD"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_persistent_failure_exhausts_retries() {
    let (upstream, calls) = scripted_upstream(vec![(500, "boom")]).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;

    let res = common::client()
        .get(format!("http://{gateway}/exchange/EUR"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Exchange rate service unavailable");
    assert_eq!(body["message"], "Unable to retrieve exchange rates at this time");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_circuit_opens_and_recovers() {
    let healthy = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let calls = Arc::new(AtomicU32::new(0));
    let (h, cc) = (healthy.clone(), calls.clone());
    let upstream = common::start_programmable_backend(move || {
        let (h, cc) = (h.clone(), cc.clone());
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            if h.load(Ordering::SeqCst) {
                (200, common::EUR_BODY.to_string())
            } else {
                (500, "dead".to_string())
            }
        }
    })
    .await;

    let mut config = common::gateway_config(upstream);
    config.resilience.circuit_breaker.open_duration_ms = 500;
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{gateway}/exchange/EUR");

    // 3 failed attempts, then the 4th opens the breaker and the retry stops
    assert_eq!(client.get(&url).send().await.unwrap().status(), 503);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 503);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    // open: rejected without touching the network
    healthy.store(true, Ordering::SeqCst);
    assert_eq!(client.get(&url).send().await.unwrap().status(), 503);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    // after the cool-down one trial goes through and closes the circuit
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let upstream = common::start_programmable_backend(move || {
        let cc = cc.clone();
        async move {
            cc.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            (200, common::EUR_BODY.to_string())
        }
    })
    .await;

    let mut config = common::gateway_config(upstream);
    config.resilience.timeout_ms = 100;
    config.resilience.retry.max_attempts = 2;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let start = Instant::now();
    let res = common::client()
        .get(format!("http://{gateway}/exchange/EUR"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 503);
    assert!(start.elapsed() < Duration::from_millis(500), "attempts must be cut short");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn test_cache_hit_and_bypass() {
    let (upstream, calls) = scripted_upstream(vec![(200, common::USD_BODY)]).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{gateway}/exchange/usd");

    let first: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let second: serde_json::Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first["currencyCode"], "USD");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let res = client.get(&url).header("no-cache", "true").send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let res = client.get(format!("{url}?no_cache=true")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_failure_does_not_evict_cached_quote() {
    let (upstream, calls) = scripted_upstream(vec![(200, common::EUR_BODY), (500, "boom")]).await;
    let (gateway, shutdown) = common::start_gateway(common::gateway_config(upstream)).await;
    let client = common::client();
    let url = format!("http://{gateway}/exchange/EUR");

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);

    // a failed bypass returns absent but leaves the cached entry alone
    let res = client.get(&url).header("cache-control", "no-cache").send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    assert_eq!(client.get(&url).send().await.unwrap().status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    shutdown.trigger();
}
