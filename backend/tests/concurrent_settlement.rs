//! Concurrency properties of enrollment and settlement over the in-memory
//! adapters.
//!
//! Many tokio tasks race against one event or one provider transaction; the
//! assertions check occupancy never exceeds capacity and a success signal
//! admits the payer exactly once however often it arrives.

use std::sync::Arc;

use futures::future::join_all;
use gatherings::domain::ports::{
    EnrollmentCommand, PaymentIntentCommand, PaymentLedger, ProviderIntentStatus,
    SettlementCommand,
};
use gatherings::domain::{
    Error, Event, Identity, PaymentStatus, Role, SettlementReport, UserId, WebhookReceipt,
};
use gatherings::test_support::EventBuilder;
use rstest::rstest;

mod support;

use support::settlement::SettlementHarness;

fn rejection_code(result: &Result<Event, Error>) -> Option<&str> {
    result.as_ref().err().and_then(Error::detail_code)
}

#[rstest]
#[case(1, 2)]
#[case(5, 20)]
#[case(10, 64)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_free_joins_fill_exactly_the_free_seats(
    #[case] seats: u32,
    #[case] attendees: usize,
) {
    let event = EventBuilder::new().capacity(seats).build();
    let event_id = event.id();
    let harness = SettlementHarness::with_events([event]);

    let joins = (0..attendees).map(|_| {
        let enrollment = Arc::clone(&harness.enrollment);
        let attendee = UserId::random();
        tokio::spawn(async move { enrollment.join_free(&event_id, &attendee).await })
    });
    let results: Vec<Result<Event, Error>> = join_all(joins)
        .await
        .into_iter()
        .map(|joined| joined.expect("join task"))
        .collect();

    let admitted = results.iter().filter(|result| result.is_ok()).count();
    let full = results
        .iter()
        .filter(|result| rejection_code(result) == Some("event_full"))
        .count();
    let seats = usize::try_from(seats).expect("seat count");
    assert_eq!(admitted, seats);
    assert_eq!(full, attendees - seats);

    let stored = harness.event(&event_id).await;
    assert_eq!(stored.participants().len(), seats);
    assert_eq!(stored.current_participants(), stored.capacity().get());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_webhooks_and_confirmations_admit_the_payer_once() {
    let event = EventBuilder::new().price(2000).capacity(5).build();
    let event_id = event.id();
    let harness = Arc::new(SettlementHarness::with_events([event]));
    let payer = Identity::new(UserId::random(), Role::Attendee);

    let handle = harness
        .intents
        .create_intent(&payer, &event_id)
        .await
        .expect("intent opened");
    let txn = handle.provider_transaction_id;
    assert!(
        harness
            .provider
            .set_status(&txn, ProviderIntentStatus::Succeeded)
    );

    let deliveries = (0..16).map(|n| {
        let harness = Arc::clone(&harness);
        let txn = txn.clone();
        tokio::spawn(async move {
            if n % 2 == 0 {
                let (payload, header) =
                    harness.signed_notification("payment_intent.succeeded", txn.as_str());
                match harness
                    .settlement
                    .handle_webhook(&payload, Some(&header))
                    .await
                    .expect("webhook accepted")
                {
                    WebhookReceipt::Applied(receipt) => receipt.report,
                    other => panic!("expected an applied receipt, got {other:?}"),
                }
            } else {
                harness
                    .settlement
                    .confirm(&payer, &txn)
                    .await
                    .expect("confirmation")
                    .report
            }
        })
    });
    let reports: Vec<SettlementReport> = join_all(deliveries)
        .await
        .into_iter()
        .map(|joined| joined.expect("delivery task"))
        .collect();

    let enrolled = reports
        .iter()
        .filter(|report| **report == SettlementReport::Enrolled)
        .count();
    assert_eq!(enrolled, 1);
    assert!(reports.iter().all(|report| matches!(
        report,
        SettlementReport::Enrolled | SettlementReport::AlreadySettled
    )));

    let stored = harness.event(&event_id).await;
    assert_eq!(stored.participants(), [payer.user_id()]);
    let obligation = harness
        .ledger
        .find_by_transaction(&txn)
        .await
        .expect("ledger read")
        .expect("obligation kept");
    assert_eq!(obligation.status, PaymentStatus::Completed);
    assert!(harness.conflicts().await.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_paid_settlements_never_overfill() {
    let event = EventBuilder::new().price(800).capacity(3).build();
    let event_id = event.id();
    let harness = Arc::new(SettlementHarness::with_events([event]));

    let mut transactions = Vec::new();
    for _ in 0..6 {
        let payer = Identity::new(UserId::random(), Role::Attendee);
        let handle = harness
            .intents
            .create_intent(&payer, &event_id)
            .await
            .expect("intent opened");
        assert!(
            harness
                .provider
                .set_status(&handle.provider_transaction_id, ProviderIntentStatus::Succeeded)
        );
        transactions.push(handle.provider_transaction_id);
    }

    let settlements = transactions.iter().cloned().map(|txn| {
        let harness = Arc::clone(&harness);
        tokio::spawn(async move {
            let (payload, header) =
                harness.signed_notification("payment_intent.succeeded", txn.as_str());
            harness
                .settlement
                .handle_webhook(&payload, Some(&header))
                .await
                .expect("webhook accepted")
        })
    });
    let receipts: Vec<WebhookReceipt> = join_all(settlements)
        .await
        .into_iter()
        .map(|joined| joined.expect("settlement task"))
        .collect();

    let reports: Vec<SettlementReport> = receipts
        .into_iter()
        .map(|receipt| match receipt {
            WebhookReceipt::Applied(receipt) => receipt.report,
            other => panic!("expected an applied receipt, got {other:?}"),
        })
        .collect();
    let enrolled = reports
        .iter()
        .filter(|report| **report == SettlementReport::Enrolled)
        .count();
    let conflicted = reports
        .iter()
        .filter(|report| **report == SettlementReport::Conflict)
        .count();
    assert_eq!(enrolled, 3);
    assert_eq!(conflicted, 3);

    let stored = harness.event(&event_id).await;
    assert_eq!(stored.current_participants(), 3);
    assert_eq!(harness.conflicts().await.len(), 3);
    for txn in &transactions {
        let obligation = harness
            .ledger
            .find_by_transaction(txn)
            .await
            .expect("ledger read")
            .expect("obligation kept");
        assert_eq!(obligation.status, PaymentStatus::Completed);
    }
}
