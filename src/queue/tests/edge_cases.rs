//! Tests for cancellation, streams and unusual deliveries

#[cfg(test)]
mod tests {
    use crate::queue::api::{ChannelIdentifier, ConsumerMode, Payload, QueueError};
    use crate::queue::tests::literal_queue;
    use crate::subscriber::CommandFlags;
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_cancelled_read_consumes_nothing() {
        let (subscriber, queue) = literal_queue("cancel");
        subscriber.publish(&ChannelIdentifier::literal("cancel"), Payload::from("kept"));

        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert!(matches!(
            queue.read(&cancelled).await,
            Err(QueueError::Cancelled)
        ));

        assert_eq!(queue.approximate_depth(), 1);
        let message = queue.read(&CancellationToken::new()).await.unwrap();
        assert_eq!(message.payload().to_string(), "kept");
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let (_subscriber, queue) = literal_queue("waiting");
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let result = timeout(Duration::from_secs(1), queue.read(&token)).await;
        assert!(matches!(result, Ok(Err(QueueError::Cancelled))));
    }

    #[tokio::test]
    async fn test_waiting_reader_wakes_on_delivery() {
        let (subscriber, queue) = literal_queue("wake");

        let reader = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.read(&CancellationToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        subscriber.publish(&ChannelIdentifier::literal("wake"), Payload::from("ping"));

        let message = timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(message.to_string(), "wake:ping");
    }

    #[tokio::test]
    async fn test_stream_ends_on_completion() {
        let (subscriber, queue) = literal_queue("stream");
        let channel = ChannelIdentifier::literal("stream");
        for payload in ["a", "b", "c"] {
            subscriber.publish(&channel, Payload::from(payload));
        }
        queue.unsubscribe(None, CommandFlags::None).unwrap();

        let payloads: Vec<String> = queue
            .stream(CancellationToken::new())
            .unwrap()
            .map(|message| message.payload().to_string())
            .collect()
            .await;

        assert_eq!(payloads, vec!["a", "b", "c"]);
        assert_eq!(queue.consumer_mode(), ConsumerMode::Pull);
    }

    #[tokio::test]
    async fn test_stream_ends_on_cancellation() {
        let (subscriber, queue) = literal_queue("stream-cancel");
        subscriber.publish(
            &ChannelIdentifier::literal("stream-cancel"),
            Payload::from("only"),
        );
        let token = CancellationToken::new();
        let stream = queue.stream(token.clone()).unwrap();
        tokio::pin!(stream);

        assert!(stream.next().await.is_some());
        token.cancel();
        let end = timeout(Duration::from_secs(1), stream.next()).await;
        assert!(matches!(end, Ok(None)));
        assert!(!queue.is_completed());
    }

    #[test]
    fn test_missing_payload_becomes_empty() {
        let (subscriber, queue) = literal_queue("partial");
        let channel = ChannelIdentifier::literal("partial");

        subscriber.deliver_raw(&channel, Some(&channel), None);
        subscriber.deliver_raw(&channel, None, Some(&Payload::from("body")));

        assert!(!queue.is_completed());
        let first = queue.try_read().unwrap().unwrap();
        assert!(first.payload().is_empty());
        let second = queue.try_read().unwrap().unwrap();
        assert_eq!(second.channel(), &channel);
        assert_eq!(second.to_string(), "partial:body");
    }

    #[test]
    fn test_depth_does_not_claim_queue() {
        let (_subscriber, queue) = literal_queue("peek");

        assert_eq!(queue.approximate_depth(), 0);
        assert_eq!(queue.consumer_mode(), ConsumerMode::Unclaimed);
    }

    #[test]
    fn test_debug_shows_queue_state() {
        let (_subscriber, queue) = literal_queue("debug");
        let rendered = format!("{:?}", queue);

        assert!(rendered.contains("ChannelMessageQueue"));
        assert!(rendered.contains("completed: false"));
    }
}
