//! Tests for the in-memory subscriber

#[cfg(test)]
mod tests {
    use crate::queue::{ChannelIdentifier, Payload};
    use crate::subscriber::{
        CommandFlags, DeliveryCallback, InMemorySubscriber, Subscriber, SubscriberError,
        SubscriberExt,
    };
    use std::sync::{Arc, Mutex};

    fn recording_callback() -> (DeliveryCallback, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = DeliveryCallback::handler(move |channel, payload| {
            sink.lock()
                .unwrap()
                .push(format!("{}:{}", channel, payload));
        });
        (callback, seen)
    }

    #[test]
    fn test_publish_reaches_literal_and_pattern_subscriptions() {
        let subscriber = InMemorySubscriber::new();
        let (literal, literal_seen) = recording_callback();
        let (pattern, pattern_seen) = recording_callback();

        subscriber
            .subscribe(&ChannelIdentifier::literal("news.tech"), literal, CommandFlags::None)
            .unwrap();
        subscriber
            .subscribe(&ChannelIdentifier::pattern("news.*"), pattern, CommandFlags::None)
            .unwrap();

        let delivered =
            subscriber.publish(&ChannelIdentifier::literal("news.tech"), Payload::from("a"));
        let sports =
            subscriber.publish(&ChannelIdentifier::literal("news.sports"), Payload::from("b"));
        let other = subscriber.publish(&ChannelIdentifier::literal("weather"), Payload::from("c"));

        assert_eq!((delivered, sports, other), (2, 1, 0));
        assert_eq!(*literal_seen.lock().unwrap(), vec!["news.tech:a"]);
        assert_eq!(
            *pattern_seen.lock().unwrap(),
            vec!["news.tech:a", "news.sports:b"]
        );
    }

    #[test]
    fn test_non_utf8_channel_reaches_only_literal_subscriptions() {
        let subscriber = InMemorySubscriber::new();
        let binary = ChannelIdentifier::literal(&b"news.\xff"[..]);
        let (literal, literal_seen) = recording_callback();
        let (pattern, pattern_seen) = recording_callback();

        subscriber.subscribe(&binary, literal, CommandFlags::None).unwrap();
        subscriber
            .subscribe(&ChannelIdentifier::pattern("news.*"), pattern, CommandFlags::None)
            .unwrap();

        let delivered = subscriber.publish(&binary, Payload::from("a"));
        let lookalike = subscriber.publish(
            &ChannelIdentifier::literal(&b"news.\xfe"[..]),
            Payload::from("b"),
        );

        assert_eq!(delivered, 1);
        assert_eq!(lookalike, 0);
        assert_eq!(literal_seen.lock().unwrap().len(), 1);
        assert!(pattern_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_utf8_pattern_is_rejected() {
        let subscriber = InMemorySubscriber::new();
        let (callback, _) = recording_callback();

        let result = subscriber.subscribe(
            &ChannelIdentifier::pattern(&b"news.\xff*"[..]),
            callback,
            CommandFlags::None,
        );

        assert!(matches!(result, Err(SubscriberError::InvalidPattern { .. })));
        assert_eq!(subscriber.subscription_count(), 0);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let subscriber = InMemorySubscriber::new();
        let (callback, _) = recording_callback();

        let result = subscriber.subscribe(
            &ChannelIdentifier::pattern("news.[abc"),
            callback,
            CommandFlags::None,
        );

        assert!(matches!(result, Err(SubscriberError::InvalidPattern { .. })));
        assert_eq!(subscriber.subscription_count(), 0);
    }

    #[test]
    fn test_unsubscribe_removes_only_matching_callback() {
        let subscriber = InMemorySubscriber::new();
        let channel = ChannelIdentifier::literal("news");
        let (first, _) = recording_callback();
        let (second, second_seen) = recording_callback();

        subscriber
            .subscribe(&channel, first.clone(), CommandFlags::None)
            .unwrap();
        subscriber
            .subscribe(&channel, second, CommandFlags::None)
            .unwrap();

        assert!(subscriber
            .unsubscribe(&channel, &first, CommandFlags::FireAndForget)
            .unwrap());
        assert!(!subscriber
            .unsubscribe(&channel, &first, CommandFlags::None)
            .unwrap());
        assert_eq!(subscriber.last_flags(), Some(CommandFlags::None));

        subscriber.publish(&channel, Payload::from("still here"));
        assert_eq!(*second_seen.lock().unwrap(), vec!["news:still here"]);
        assert!(subscriber.is_subscribed(&channel));
    }

    #[test]
    fn test_unsubscribe_all_completes_queue_backed_registrations() {
        let subscriber = Arc::new(InMemorySubscriber::new());
        let (plain, _) = recording_callback();
        subscriber
            .subscribe(&ChannelIdentifier::literal("plain"), plain, CommandFlags::None)
            .unwrap();
        let first = subscriber
            .subscribe_queue(ChannelIdentifier::literal("a"), CommandFlags::None)
            .unwrap();
        let second = subscriber
            .subscribe_queue(ChannelIdentifier::pattern("b*"), CommandFlags::None)
            .unwrap();

        assert_eq!(subscriber.unsubscribe_all(), 2);
        assert_eq!(subscriber.subscription_count(), 0);
        assert!(first.is_completed());
        assert!(second.is_completed());
    }

    #[test]
    fn test_shutdown_sends_sentinel_and_closes() {
        let subscriber = Arc::new(InMemorySubscriber::new());
        let queue = subscriber
            .subscribe_queue(ChannelIdentifier::literal("news"), CommandFlags::None)
            .unwrap();
        subscriber.publish(&ChannelIdentifier::literal("news"), Payload::from("before"));

        subscriber.shutdown();

        assert!(subscriber.is_closed());
        assert!(queue.is_completed());
        assert_eq!(queue.approximate_depth(), 1);
        assert_eq!(
            subscriber.publish(&ChannelIdentifier::literal("news"), Payload::from("after")),
            0
        );

        let (callback, _) = recording_callback();
        assert_eq!(
            subscriber.subscribe(&ChannelIdentifier::literal("x"), callback, CommandFlags::None),
            Err(SubscriberError::Closed)
        );
    }

    #[test]
    fn test_deliver_raw_targets_exact_registration() {
        let subscriber = InMemorySubscriber::new();
        let (callback, seen) = recording_callback();
        subscriber
            .subscribe(&ChannelIdentifier::pattern("news.*"), callback, CommandFlags::None)
            .unwrap();

        let delivered = subscriber.deliver_raw(
            &ChannelIdentifier::pattern("news.*"),
            Some(&ChannelIdentifier::literal("news.tech")),
            None,
        );
        let missed = subscriber.deliver_raw(&ChannelIdentifier::literal("news.*"), None, None);

        assert_eq!((delivered, missed), (1, 0));
        assert_eq!(*seen.lock().unwrap(), vec!["news.tech:"]);
    }
}
