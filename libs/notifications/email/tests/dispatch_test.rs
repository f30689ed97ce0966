//! The email notifier driven by the notification dispatcher.

use domain_orders::{DispatcherConfig, NotificationDispatcher, Order};
use email::{EmailNotifier, MockEmailProvider, NotifierConfig};
use event_channel::{InMemoryBroker, Publisher, StartOffset};
use std::time::Duration;
use tokio::sync::watch;

async fn publish(broker: &InMemoryBroker, order: &Order) {
    broker
        .publish("orders", None, &order.to_payload().unwrap())
        .await
        .unwrap();
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_email_per_window() {
    let broker = InMemoryBroker::new();
    let outbox = MockEmailProvider::new();
    let notifier = EmailNotifier::new(outbox.clone(), NotifierConfig::default()).unwrap();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(
        NotificationDispatcher::new(
            broker.reader("orders", StartOffset::Earliest),
            notifier,
            DispatcherConfig::default(),
        )
        .run(shutdown_rx),
    );

    publish(&broker, &Order::processed(1)).await;
    publish(&broker, &Order::processed(2)).await;
    settle().await;
    assert_eq!(outbox.sent_count().await, 1);

    // Idle past the window; the same order notifies again
    tokio::time::sleep(Duration::from_secs(11)).await;
    publish(&broker, &Order::processed(1)).await;
    settle().await;

    let sent = outbox.sent_emails().await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0].html_body.contains("<strong>1</strong>"));
    assert!(sent[1].html_body.contains("<strong>1</strong>"));

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}
