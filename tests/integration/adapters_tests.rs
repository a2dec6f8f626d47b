use super::*;
use limited_sniper::config::DiscordConfig;
use limited_sniper::models::OutcomeKind;
use limited_sniper::plugins::marketplace::{
    BatchThumbnailResolver, CatalogPageSource, CsrfSession, EconomyPurchaser,
};
use limited_sniper::plugins::notifiers::DiscordNotifier;
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials() -> Credentials {
    Credentials {
        cookie: "test-cookie".to_string(),
        csrf_token: "test-token".to_string(),
    }
}

pub fn catalog_page(price: i64) -> String {
    format!(
        r#"<!DOCTYPE html><html><body>
        <div id="item-container" data-item-id="1365767"
             data-expected-price="{}" data-product-id="{}"
             data-expected-seller-id="{}" data-lowest-private-sale-userasset-id="{}">
        </div></body></html>"#,
        price, PRODUCT_ID, SELLER_ID, USER_ASSET_ID
    )
}

#[tokio::test]
async fn test_catalog_page_source() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/1365767/"))
        .and(header("cookie", ".ROBLOSECURITY=test-cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_string(catalog_page(80)))
        .expect(1)
        .mount(&server)
        .await;

    let source = CatalogPageSource::new(Client::new(), &server.uri());
    let sample = source.sample("1365767", "test-cookie").await?;

    assert_eq!(sample.price, 80);
    assert_eq!(sample.product_id, PRODUCT_ID);
    assert_eq!(sample.seller_id, SELLER_ID);
    assert_eq!(sample.user_asset_id, USER_ASSET_ID);

    Ok(())
}

#[tokio::test]
async fn test_catalog_error_status() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = CatalogPageSource::new(Client::new(), &server.uri());
    let err = source.sample("1365767", "test-cookie").await.unwrap_err();
    assert!(err.to_string().contains("429"));

    Ok(())
}

#[tokio::test]
async fn test_economy_purchase_success() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/purchases/products/{}", PRODUCT_ID)))
        .and(header("x-csrf-token", "test-token"))
        .and(header("cookie", ".ROBLOSECURITY=test-cookie"))
        .and(body_json(json!({
            "expectedCurrency": 1,
            "expectedPrice": 80,
            "expectedSellerId": SELLER_ID,
            "userAssetId": USER_ASSET_ID
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "purchased": true,
            "reason": "Success",
            "productId": PRODUCT_ID,
            "price": 80
        })))
        .expect(1)
        .mount(&server)
        .await;

    let purchaser = EconomyPurchaser::new(Client::new(), &server.uri(), Duration::from_secs(5));
    let request = PurchaseRequest {
        item_id: "1365767".to_string(),
        product_id: PRODUCT_ID,
        price: 80,
        seller_id: SELLER_ID,
        user_asset_id: USER_ASSET_ID,
    };
    let receipt = purchaser.execute(&request, &credentials()).await?;

    assert!(receipt.purchased);
    assert_eq!(receipt.price, 80);

    Ok(())
}

#[tokio::test]
async fn test_economy_purchase_rejected() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "purchased": false,
            "reason": "PriceChanged",
            "errorMsg": "This item has changed price. Please try again."
        })))
        .mount(&server)
        .await;

    let purchaser = EconomyPurchaser::new(Client::new(), &server.uri(), Duration::from_secs(5));
    let request = PurchaseRequest {
        item_id: "1365767".to_string(),
        product_id: PRODUCT_ID,
        price: 80,
        seller_id: SELLER_ID,
        user_asset_id: USER_ASSET_ID,
    };
    let receipt = purchaser.execute(&request, &credentials()).await?;

    assert!(!receipt.purchased);
    assert!(receipt.reason.contains("changed price"));

    Ok(())
}

#[tokio::test]
async fn test_economy_error_status_is_transport_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let purchaser = EconomyPurchaser::new(Client::new(), &server.uri(), Duration::from_secs(5));
    let request = PurchaseRequest {
        item_id: "1365767".to_string(),
        product_id: PRODUCT_ID,
        price: 80,
        seller_id: SELLER_ID,
        user_asset_id: USER_ASSET_ID,
    };
    let err = purchaser.execute(&request, &credentials()).await.unwrap_err();

    assert!(matches!(err, AppError::PurchaseTransport(_)));
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("upstream down"));

    Ok(())
}

#[tokio::test]
async fn test_economy_forbidden_is_session_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Token Validation Failed"))
        .expect(1)
        .mount(&server)
        .await;

    let purchaser = EconomyPurchaser::new(Client::new(), &server.uri(), Duration::from_secs(5));
    let request = PurchaseRequest {
        item_id: "1365767".to_string(),
        product_id: PRODUCT_ID,
        price: 80,
        seller_id: SELLER_ID,
        user_asset_id: USER_ASSET_ID,
    };
    let err = purchaser.execute(&request, &credentials()).await.unwrap_err();

    assert!(matches!(err, AppError::Session(_)));
    assert!(err.to_string().contains("Token Validation Failed"));

    Ok(())
}

#[tokio::test]
async fn test_thumbnail_resolver() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/batch"))
        .and(body_json(json!([{
            "requestId": "1365767:undefined:Asset:150x150:webp:regular",
            "type": "Asset",
            "targetId": "1365767",
            "format": "webp",
            "size": "150x150"
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "requestId": "1365767:undefined:Asset:150x150:webp:regular",
                "targetId": 1365767,
                "state": "Completed",
                "imageUrl": "https://tr.rbxcdn.com/thumb/150/150/Image/Webp"
            }]
        })))
        .mount(&server)
        .await;

    let resolver = BatchThumbnailResolver::new(Client::new(), &server.uri());
    let url = resolver.resolve("1365767").await?;
    assert_eq!(url, "https://tr.rbxcdn.com/thumb/150/150/Image/Webp");

    Ok(())
}

#[tokio::test]
async fn test_thumbnail_empty_batch() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let resolver = BatchThumbnailResolver::new(Client::new(), &server.uri());
    let err = resolver.resolve("1365767").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    Ok(())
}

fn session_for(server: &MockServer) -> CsrfSession {
    CsrfSession::new(
        Client::new(),
        "test-cookie",
        format!("{}/v2/login", server.uri()),
        format!("{}/v1/users/authenticated", server.uri()),
        Duration::from_secs(600),
    )
}

#[tokio::test]
async fn test_csrf_token_is_cached() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/login"))
        .and(header("cookie", ".ROBLOSECURITY=test-cookie"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-csrf-token", "fresh-token"))
        .expect(2)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let first = session.credentials().await?;
    let second = session.credentials().await?;
    assert_eq!(first.csrf_token, "fresh-token");
    assert_eq!(second.csrf_token, "fresh-token");
    assert_eq!(second.cookie, "test-cookie");

    // Forcing a refresh is the only way to hit the endpoint again
    session.invalidate().await;
    session.credentials().await?;

    Ok(())
}

#[tokio::test]
async fn test_csrf_refresh_is_retried_then_fails() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/login"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session.credentials().await.unwrap_err();
    assert!(matches!(err, AppError::Session(_)));

    Ok(())
}

#[tokio::test]
async fn test_authenticate() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users/authenticated"))
        .and(header("cookie", ".ROBLOSECURITY=test-cookie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "name": "sniper",
            "displayName": "Sniper"
        })))
        .mount(&server)
        .await;

    let user = session_for(&server).authenticate().await?;
    assert_eq!(user.id, 42);
    assert_eq!(user.name, "sniper");

    Ok(())
}

#[tokio::test]
async fn test_authenticate_rejected_cookie() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = session_for(&server).authenticate().await.unwrap_err();
    assert!(matches!(err, AppError::Session(_)));

    Ok(())
}

fn message() -> NotificationMessage {
    NotificationMessage {
        item_id: "1365767".to_string(),
        kind: OutcomeKind::Purchased,
        title: "Limited Snipe Success".to_string(),
        description: "Item Purchase: `1365767`".to_string(),
        color: 0xF58A42,
        thumbnail_url: None,
    }
}

#[tokio::test]
async fn test_discord_webhook_delivery() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(
        Client::new(),
        format!("{}/api/webhooks/1/token", server.uri()),
        DiscordConfig::default(),
    );
    let result = notifier.notify(&message()).await?;

    assert!(result.success);
    assert!(result.message_id.is_some());

    let requests = server.received_requests().await.unwrap_or_default();
    let payload: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    assert_eq!(payload["embeds"][0]["title"], "Limited Snipe Success");
    assert_eq!(payload["embeds"][0]["color"], 0xF58A42);
    assert_eq!(payload["username"], "Limited Sniper");

    Ok(())
}

#[tokio::test]
async fn test_discord_webhook_rejection() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let notifier = DiscordNotifier::new(Client::new(), server.uri(), DiscordConfig::default());
    let result = notifier.notify(&message()).await?;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("400"));

    Ok(())
}
