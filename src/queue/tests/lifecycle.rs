//! Tests for completion and the unsubscribe protocol

#[cfg(test)]
mod tests {
    use crate::queue::api::{ChannelIdentifier, CompletionError, Payload, QueueError};
    use crate::queue::tests::literal_queue;
    use crate::subscriber::{CommandFlags, SubscriberError};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct ConnectionReset;

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let (subscriber, queue) = literal_queue("twice");
        let signal = queue.completion();

        queue.unsubscribe(None, CommandFlags::FireAndForget).unwrap();
        queue.unsubscribe(None, CommandFlags::None).unwrap();
        queue.unsubscribe_async(None, CommandFlags::None).await.unwrap();

        assert!(queue.is_completed());
        assert!(signal.is_completed());
        assert_eq!(subscriber.subscription_count(), 0);
        // Only the first call reached the subscriber
        assert_eq!(subscriber.last_flags(), Some(CommandFlags::FireAndForget));
    }

    #[tokio::test]
    async fn test_unsubscribe_async_detaches_and_completes() {
        let (subscriber, queue) = literal_queue("async-unsub");

        queue
            .unsubscribe_async(None, CommandFlags::NoRedirect)
            .await
            .unwrap();

        assert!(!subscriber.is_subscribed(&ChannelIdentifier::literal("async-unsub")));
        assert_eq!(subscriber.last_flags(), Some(CommandFlags::NoRedirect));
        assert!(queue.is_completed());
    }

    #[tokio::test]
    async fn test_buffered_messages_drain_before_closed() {
        let (subscriber, queue) = literal_queue("drain");
        let channel = ChannelIdentifier::literal("drain");
        subscriber.publish(&channel, Payload::from("a"));
        subscriber.publish(&channel, Payload::from("b"));

        queue.unsubscribe(None, CommandFlags::None).unwrap();
        // Deliveries after completion are ignored
        queue
            .delivery_callback()
            .deliver(&channel, Some(&channel), Some(&Payload::from("late")));

        let token = CancellationToken::new();
        assert_eq!(queue.read(&token).await.unwrap().payload().to_string(), "a");
        assert_eq!(queue.read(&token).await.unwrap().payload().to_string(), "b");
        assert!(matches!(
            queue.read(&token).await,
            Err(QueueError::Closed { .. })
        ));
        assert_eq!(queue.statistics().ignored_after_completion, 1);
    }

    #[tokio::test]
    async fn test_completion_error_reaches_readers() {
        let (_subscriber, queue) = literal_queue("faulted");
        let error: CompletionError = Arc::new(ConnectionReset);

        queue
            .unsubscribe(Some(error), CommandFlags::None)
            .unwrap();

        match queue.read(&CancellationToken::new()).await {
            Err(QueueError::Closed { source, .. }) => {
                assert_eq!(source.unwrap().to_string(), "connection reset");
            }
            other => panic!("Expected Closed error, got: {:?}", other),
        }
        let waited = queue.completion().wait().await;
        assert_eq!(waited.unwrap().to_string(), "connection reset");
    }

    #[tokio::test]
    async fn test_first_completion_error_wins() {
        let (_subscriber, queue) = literal_queue("first-wins");

        queue.unsubscribe(None, CommandFlags::None).unwrap();
        queue
            .unsubscribe(Some(Arc::new(ConnectionReset)), CommandFlags::None)
            .unwrap();

        assert!(queue.completion().error().is_none());
    }

    #[tokio::test]
    async fn test_sentinel_completes_queue() {
        let (subscriber, queue) = literal_queue("sentinel");
        let channel = ChannelIdentifier::literal("sentinel");
        let waiter = {
            let signal = queue.completion();
            tokio::spawn(async move { signal.wait().await })
        };

        subscriber.publish(&channel, Payload::from("last"));
        subscriber.deliver_raw(&channel, None, None);

        let completed = timeout(Duration::from_secs(1), waiter).await;
        assert!(completed.is_ok());
        assert!(queue.is_completed());
        assert_eq!(queue.try_read().unwrap().unwrap().to_string(), "sentinel:last");
    }

    #[tokio::test]
    async fn test_detach_failure_still_completes_queue() {
        let (subscriber, queue) = literal_queue("orphaned");
        let other = crate::subscriber::SubscriberExt::subscribe_queue(
            &subscriber,
            ChannelIdentifier::literal("other"),
            CommandFlags::None,
        )
        .unwrap();

        subscriber.shutdown();
        let result = queue.unsubscribe(None, CommandFlags::None);

        assert!(matches!(
            result,
            Err(QueueError::Subscriber(SubscriberError::Closed))
        ));
        assert!(queue.is_completed());
        assert!(other.is_completed());
        // Retrying does not try to detach again
        assert!(queue.unsubscribe(None, CommandFlags::None).is_ok());
    }

    #[tokio::test]
    async fn test_handler_loop_exits_after_unsubscribe() {
        let (subscriber, queue) = literal_queue("loop-exit");
        queue.on_message(|_| Ok(())).unwrap();
        subscriber.publish(&ChannelIdentifier::literal("loop-exit"), Payload::from("x"));

        queue.unsubscribe(None, CommandFlags::None).unwrap();

        let joined = timeout(Duration::from_secs(2), queue.join_consumer()).await;
        assert_eq!(joined.ok(), Some(true));
        assert!(!queue.join_consumer().await);
    }

    #[tokio::test]
    async fn test_completion_stays_pending_when_queue_is_dropped_uncompleted() {
        let (subscriber, queue) = literal_queue("abandoned");
        let signal = queue.completion();

        drop(queue);
        drop(subscriber);

        let waited = timeout(Duration::from_millis(200), signal.wait()).await;
        assert!(waited.is_err());
        assert!(!signal.is_completed());
    }
}
