//! ConfirmationRace behaviour around the confirmation watch and deadlines

#[cfg(test)]
mod race_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::broadcast::ConfirmationRace;
    use crate::config::BroadcastConfig;
    use crate::observability::CorrelationId;
    use crate::rpc_manager::{GatewayError, LedgerGateway};
    use crate::structured_logging::StructuredLogger;
    use crate::test_utils::{expiry_window, signed_transaction, ConfirmationScript, MockGateway};
    use crate::types::Outcome;

    fn race(gateway: &Arc<MockGateway>, config: BroadcastConfig) -> ConfirmationRace {
        let gateway: Arc<dyn LedgerGateway> = Arc::clone(gateway) as Arc<dyn LedgerGateway>;
        ConfirmationRace::new(
            gateway,
            config,
            StructuredLogger::new(CorrelationId::from("race-test")),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_after_several_resends() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_confirmation(ConfirmationScript::confirmed_after(Duration::from_millis(5_500), 40)),
        );
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);

        let outcome = race(&gateway, BroadcastConfig::default()).run(&tx, &expiry).await;

        assert!(outcome.is_confirmed());
        // Resends at 2s and 4s; the race itself never sends the initial attempt
        assert_eq!(gateway.broadcast_count(), 2);
        assert_eq!(gateway.subscriptions_opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resend_failures_do_not_end_race() {
        let transport = GatewayError::Transport {
            endpoint: "mock".to_string(),
            message: "broken pipe".to_string(),
        };
        let gateway = Arc::new(
            MockGateway::new()
                .with_broadcast_results(vec![Err(transport.clone()), Err(transport)])
                .with_heights(vec![1, 2, 3, 999]),
        );
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 10);

        let outcome = race(&gateway, BroadcastConfig::default()).run(&tx, &expiry).await;

        assert!(matches!(outcome, Outcome::Expired { .. }));
        assert_eq!(gateway.broadcast_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_at_first_tick_sends_nothing() {
        let gateway = Arc::new(MockGateway::new().with_heights(vec![151]));
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 150);

        let outcome = race(&gateway, BroadcastConfig::default()).run(&tx, &expiry).await;

        assert!(matches!(
            outcome,
            Outcome::Expired {
                last_valid_height: 150,
                ..
            }
        ));
        assert_eq!(gateway.broadcast_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_height_equal_to_last_valid_is_not_expired() {
        let gateway = Arc::new(MockGateway::new().with_heights(vec![150, 151]));
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 150);

        race(&gateway, BroadcastConfig::default()).run(&tx, &expiry).await;

        assert_eq!(gateway.broadcast_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_error_is_unknown_by_default() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_confirmation(ConfirmationScript::errors_after(Duration::from_millis(700), "socket closed"))
                .with_confirmation(ConfirmationScript::confirmed_after(Duration::from_millis(1), 1)),
        );
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);
        let signature = *tx.signature();

        let outcome = race(&gateway, BroadcastConfig::default()).run(&tx, &expiry).await;

        match outcome {
            Outcome::Unknown {
                signature: reported,
                reason,
            } => {
                assert_eq!(reported, signature);
                assert!(reason.contains("socket closed"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(gateway.subscriptions_opened(), 1);
        assert_eq!(gateway.subscriptions_released(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribes_within_budget() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_confirmation(ConfirmationScript::errors_after(Duration::from_millis(1_000), "socket closed"))
                .with_confirmation(ConfirmationScript::confirmed_after(Duration::from_millis(500), 9)),
        );
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);
        let config = BroadcastConfig {
            max_resubscribes: 1,
            ..BroadcastConfig::default()
        };

        let outcome = race(&gateway, config).run(&tx, &expiry).await;

        assert!(matches!(outcome, Outcome::Confirmed { slot: 9, .. }));
        assert_eq!(gateway.subscriptions_opened(), 2);
        assert_eq!(gateway.subscriptions_released(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_budget_exhausted() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_confirmation(ConfirmationScript::errors_after(Duration::from_millis(100), "first drop"))
                .with_confirmation(ConfirmationScript::errors_after(Duration::from_millis(100), "second drop")),
        );
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);
        let config = BroadcastConfig {
            max_resubscribes: 1,
            ..BroadcastConfig::default()
        };

        let outcome = race(&gateway, config).run(&tx, &expiry).await;

        match outcome {
            Outcome::Unknown { reason, .. } => assert!(reason.contains("second drop")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(gateway.subscriptions_opened(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubscribe_checks_expiry_first() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_heights(vec![2_000])
                .with_confirmation(ConfirmationScript::errors_after(Duration::from_millis(100), "dropped")),
        );
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);
        let config = BroadcastConfig {
            max_resubscribes: 3,
            ..BroadcastConfig::default()
        };

        let outcome = race(&gateway, config).run(&tx, &expiry).await;

        assert!(matches!(outcome, Outcome::Expired { .. }));
        assert_eq!(gateway.subscriptions_opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_failure_is_unknown() {
        let gateway = Arc::new(MockGateway::new().with_confirmation(
            ConfirmationScript::SubscribeFails(GatewayError::Subscription("refused".to_string())),
        ));
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);

        let outcome = race(&gateway, BroadcastConfig::default()).run(&tx, &expiry).await;

        assert!(matches!(outcome, Outcome::Unknown { .. }));
        assert_eq!(gateway.broadcast_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_budget_tears_down_subscription() {
        let gateway = Arc::new(MockGateway::new());
        let tx = signed_transaction();
        let expiry = expiry_window(&tx, 1_000);
        let config = BroadcastConfig {
            max_wall_clock_secs: Some(5),
            ..BroadcastConfig::default()
        };

        let started = tokio::time::Instant::now();
        let outcome = race(&gateway, config).run(&tx, &expiry).await;

        assert!(matches!(outcome, Outcome::Expired { .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
        // Resends at 2s and 4s
        assert_eq!(gateway.broadcast_count(), 2);
        assert_eq!(gateway.subscriptions_released(), 1);
    }
}
