//! End-to-end tests of the lookup gateway against an in-memory upstream.

mod common;

use barcode_gateway::{GatewayError, UpstreamError};
use common::{found, gateway_with, search_envelope, FakeSource};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_short_barcode_not_found_upstream() {
    let source = Arc::new(FakeSource::new());
    let gateway = gateway_with(source.clone());

    let err = gateway.lookup_by_barcode("12345").await.unwrap_err();

    assert!(matches!(err, GatewayError::NotFound(ref code) if code == "00012345"));
    assert_eq!(source.requested(), vec!["00012345".to_string()]);
    // L'appel amont a bien consommé du quota.
    let status = gateway.rate_limit_status().await;
    assert_eq!(status.product_queries.remaining, 2);
}

#[tokio::test]
async fn test_invalid_barcode_never_reaches_upstream() {
    let source = Arc::new(FakeSource::new());
    let gateway = gateway_with(source.clone());

    let err = gateway
        .lookup_by_barcode("123456789012345")
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert_eq!(source.product_calls(), 0);
    assert_eq!(gateway.rate_limit_status().await.product_queries.remaining, 3);
}

#[tokio::test]
async fn test_successful_lookup_is_transformed_and_cached() {
    let source = Arc::new(FakeSource::new().with_product(|_| {
        Ok(found(json!({
            "product_name": "Nutella",
            "brands": "Ferrero, Nutella",
            "nova_group": 4,
            "nutriments": {"energy-kcal_100g": 539},
        })))
    }));
    let gateway = gateway_with(source.clone());

    let first = gateway.lookup_by_barcode("3017620422003").await.unwrap();
    assert_eq!(first.barcode, "3017620422003");
    assert_eq!(first.name.as_deref(), Some("Nutella"));
    assert_eq!(first.brand.as_deref(), Some("Ferrero"));
    assert_eq!(first.nova_group, Some(4));

    let status_after_first = gateway.rate_limit_status().await;

    // Même produit, écrit différemment : même clé canonique, servi depuis le cache.
    let second = gateway.lookup_by_barcode("3017-6204-22003").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(source.product_calls(), 1);
    assert_eq!(
        gateway.rate_limit_status().await.product_queries.remaining,
        status_after_first.product_queries.remaining
    );
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let source = Arc::new(FakeSource::new().with_product(|_| Ok(found(json!({})))));
    let gateway = gateway_with(source.clone());

    gateway.lookup_by_barcode("12345678").await.unwrap();
    gateway.clear_cache().await;
    gateway.lookup_by_barcode("12345678").await.unwrap();

    assert_eq!(source.product_calls(), 2);
}

#[tokio::test]
async fn test_local_rate_limit_blocks_upstream() {
    let source = Arc::new(FakeSource::new());
    let gateway = gateway_with(source.clone());

    for code in ["00000001", "00000002", "00000003"] {
        let _ = gateway.lookup_by_barcode(code).await;
    }
    let err = gateway.lookup_by_barcode("00000004").await.unwrap_err();

    match err {
        GatewayError::RateLimited {
            category,
            retry_after,
        } => {
            assert_eq!(category, "product");
            assert!(retry_after > Duration::ZERO);
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
    assert_eq!(source.product_calls(), 3);
}

#[tokio::test]
async fn test_cache_hits_still_served_when_rate_limited() {
    let source = Arc::new(FakeSource::new().with_product(|_| Ok(found(json!({"product_name": "x"})))));
    let gateway = gateway_with(source.clone());

    for code in ["00000001", "00000002", "00000003"] {
        gateway.lookup_by_barcode(code).await.unwrap();
    }

    assert!(gateway.lookup_by_barcode("00000001").await.is_ok());
    assert!(matches!(
        gateway.lookup_by_barcode("00000009").await,
        Err(GatewayError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_upstream_failures_are_classified() {
    let source = Arc::new(FakeSource::new().with_product(|barcode| match barcode {
        "00000001" => Err(UpstreamError::Status(404)),
        "00000002" => Err(UpstreamError::Status(429)),
        "00000003" => Err(UpstreamError::Transport("connection refused".into())),
        _ => Err(UpstreamError::Status(500)),
    }));
    let gateway = barcode_gateway::LookupGateway::new(
        source.clone(),
        barcode_gateway::rate_limiter::RateLimiter::default(),
        barcode_gateway::cache::ResponseCache::default(),
        Duration::from_secs(10),
    );

    assert!(matches!(
        gateway.lookup_by_barcode("00000001").await,
        Err(GatewayError::NotFound(_))
    ));
    assert!(matches!(
        gateway.lookup_by_barcode("00000002").await,
        Err(GatewayError::UpstreamRateLimited)
    ));
    assert!(matches!(
        gateway.lookup_by_barcode("00000003").await,
        Err(GatewayError::UpstreamUnavailable)
    ));
    assert!(matches!(
        gateway.lookup_by_barcode("00000004").await,
        Err(GatewayError::UpstreamError)
    ));

    // Les échecs ne sont pas mis en cache et comptent tous contre le quota.
    assert!(gateway.cache().is_empty().await);
    assert_eq!(gateway.rate_limit_status().await.product_queries.remaining, 96);
}

#[tokio::test(start_paused = true)]
async fn test_slow_upstream_times_out_as_unavailable() {
    let source = Arc::new(
        FakeSource::new()
            .with_product(|_| Ok(found(json!({}))))
            .with_delay(Duration::from_secs(30)),
    );
    let gateway = gateway_with(source.clone());

    let err = gateway.lookup_by_barcode("12345678").await.unwrap_err();
    assert!(matches!(err, GatewayError::UpstreamUnavailable));
    assert_eq!(source.product_calls(), 1);
}

#[tokio::test]
async fn test_search_transforms_and_drops_codeless_records() {
    let source = Arc::new(FakeSource::new().with_search(|query, page, size| {
        assert_eq!((query, page, size), ("nutella", 2, 5));
        Ok(search_envelope(json!({
            "count": 42,
            "products": [
                {"code": "3017620422003", "product_name": "Nutella", "categories_tags": ["en:spreads"]},
                {"product_name": "No code"},
                {"code": "80135463", "brands": "Ferrero"},
            ],
        })))
    }));
    let gateway = gateway_with(source.clone());

    let results = gateway.search_products("nutella", 2, 5).await.unwrap();

    assert_eq!(results.total_count, 42);
    assert_eq!(results.products.len(), 2);
    assert_eq!(results.products[0].barcode, "3017620422003");
    assert_eq!(
        results.products[0].categories,
        Some(vec!["spreads".to_string()])
    );
    assert_eq!(results.products[1].brand.as_deref(), Some("Ferrero"));
}

#[tokio::test]
async fn test_search_has_its_own_quota() {
    let source = Arc::new(FakeSource::new());
    let gateway = gateway_with(source.clone());

    gateway.search_products("a", 1, 20).await.unwrap();
    gateway.search_products("b", 1, 20).await.unwrap();
    let err = gateway.search_products("c", 1, 20).await.unwrap_err();

    assert!(matches!(err, GatewayError::RateLimited { category: "search", .. }));
    assert_eq!(source.search_calls(), 2);

    let status = gateway.rate_limit_status().await;
    assert_eq!(status.search_queries.remaining, 0);
    assert_eq!(status.product_queries.remaining, 3);
}

#[tokio::test]
async fn test_search_upstream_failure() {
    let source = Arc::new(
        FakeSource::new().with_search(|_, _, _| Err(UpstreamError::Decode("bad json".into()))),
    );
    let gateway = gateway_with(source);

    let err = gateway.search_products("a", 1, 20).await.unwrap_err();
    assert!(matches!(err, GatewayError::SearchFailed));
    assert_eq!(err.to_string(), "Failed to search products");
}

#[tokio::test]
async fn test_search_upstream_404_is_not_a_missing_product() {
    let source = Arc::new(FakeSource::new().with_search(|_, _, _| Err(UpstreamError::Status(404))));
    let gateway = gateway_with(source);

    let err = gateway.search_products("nutella", 1, 20).await.unwrap_err();
    assert!(matches!(err, GatewayError::SearchFailed));
    assert!(!err.to_string().contains("Product not found"));
}

#[tokio::test]
async fn test_concurrent_lookups_never_exceed_quota() {
    let source = Arc::new(FakeSource::new().with_product(|_| Ok(found(json!({})))));
    let gateway = Arc::new(gateway_with(source.clone()));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.lookup_by_barcode(&format!("1000000{}", i)).await })
        })
        .collect();

    let mut limited = 0;
    for handle in handles {
        if let Err(GatewayError::RateLimited { .. }) = handle.await.unwrap() {
            limited += 1;
        }
    }

    assert_eq!(source.product_calls(), 3);
    assert_eq!(limited, 7);
}
