use super::*;
use limited_sniper::coordinator::PurchaseCoordinator;
use limited_sniper::models::{ItemStatus, OutcomeKind, TrackedItem};
use limited_sniper::registry::ItemRegistry;

fn coordinator(purchaser: Arc<CountingPurchaser>) -> (ItemRegistry, PurchaseCoordinator, TrackedItem) {
    let registry = ItemRegistry::new();
    let item = TrackedItem::new("1365767", 100);
    registry.register(item.clone()).unwrap();
    let coordinator = PurchaseCoordinator::new(registry.clone(), purchaser, Arc::new(StaticSession));
    (registry, coordinator, item)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cycles_claim_exactly_once() -> anyhow::Result<()> {
    let purchaser = CountingPurchaser::with_delay(vec![PurchaseMode::Succeed], Duration::from_millis(50));
    let (registry, coordinator, item) = coordinator(purchaser.clone());

    let attempts = (0..8).map(|_| {
        let coordinator = coordinator.clone();
        let item = item.clone();
        tokio::spawn(async move { coordinator.try_purchase(&item, &sample(80)).await })
    });
    let results = futures::future::join_all(attempts).await;

    let mut completed = 0;
    let mut skipped = 0;
    for result in results {
        let attempt = result?;
        if attempt.is_skipped() {
            skipped += 1;
        } else {
            completed += 1;
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(skipped, 7);
    assert_eq!(purchaser.calls(), 1);
    assert_eq!(purchaser.max_in_flight(), 1);
    assert_eq!(registry.status(&item.id), Some(ItemStatus::Purchased));
    println!("✓ One claim won out of 8 concurrent attempts");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_attempt_releases_claim_for_next_cycle() -> anyhow::Result<()> {
    let purchaser = CountingPurchaser::new(vec![PurchaseMode::Reject("outbid"), PurchaseMode::Succeed]);
    let (registry, coordinator, item) = coordinator(purchaser.clone());

    let first = coordinator.try_purchase(&item, &sample(80)).await;
    assert_eq!(first.outcome().map(|o| o.kind), Some(OutcomeKind::Rejected));
    assert_eq!(registry.status(&item.id), Some(ItemStatus::Failed));

    // Failed must be reset before the claim is available again
    assert!(coordinator.try_purchase(&item, &sample(80)).await.is_skipped());
    assert!(registry.get(&item.id).unwrap().reset_failed());

    let second = coordinator.try_purchase(&item, &sample(80)).await;
    assert!(second.outcome().unwrap().is_success());
    assert_eq!(purchaser.calls(), 2);

    Ok(())
}

#[tokio::test]
async fn test_independent_items_do_not_block_each_other() -> anyhow::Result<()> {
    let purchaser = CountingPurchaser::with_delay(vec![PurchaseMode::Succeed], Duration::from_millis(20));
    let registry = ItemRegistry::new();
    let items: Vec<TrackedItem> = (1..=3).map(|i| TrackedItem::new(i.to_string(), 100)).collect();
    for item in &items {
        registry.register(item.clone())?;
    }
    let coordinator = PurchaseCoordinator::new(registry.clone(), purchaser.clone(), Arc::new(StaticSession));

    let quote = sample(80);
    let attempts = items.iter().map(|item| coordinator.try_purchase(item, &quote));
    let results = futures::future::join_all(attempts).await;

    assert!(results.iter().all(|r| r.outcome().is_some_and(|o| o.is_success())));
    assert_eq!(registry.count_status(ItemStatus::Purchased), 3);
    assert_eq!(purchaser.max_in_flight(), 3);

    Ok(())
}
