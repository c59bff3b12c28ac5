//! # Integration Tests
//!
//! End-to-end tests across crates.
//!
//! Covers:
//! - configuration contract snapshot
//! - producer → receiver over loopback TCP
//! - reconnect after the receiver restarts
//! - concurrent producers sharing one receiver
//! - raw wire sessions drained by the worker pool

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::StorageKind;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = ConfigLoader::load_from_str(
            r#"
            [producer]
            receiver_addr = "127.0.0.1:6000"
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.producer.receiver_addr, "127.0.0.1:6000");
        assert_eq!(config.producer.sensor_type, "Temperature");
        assert_eq!(config.producer.outbound_capacity, 100);
        assert_eq!(config.receiver.worker_count, 10);
        assert_eq!(config.receiver.inbound_capacity, 1000);
        assert_eq!(config.receiver.storage.kind, StorageKind::JsonLines);
        assert_eq!(config.shutdown.timeout_ms, 5000);
    }

    #[test]
    fn test_config_survives_toml_export() {
        let config = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        let exported = ConfigLoader::to_toml(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&exported, ConfigFormat::Toml).unwrap();

        assert_eq!(reloaded.producer.receiver_addr, config.producer.receiver_addr);
        assert_eq!(reloaded.receiver.listen_addr, config.receiver.listen_addr);
        assert_eq!(reloaded.producer.control_addr, config.producer.control_addr);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        NoopObserver, ProducerConfig, ReceiverConfig, RecordingObserver, SensorLabels,
        SharedObserver,
    };
    use persistence::MemoryRepository;
    use pipeline::{ProducerPipeline, ReceiverPipeline, ShutdownCoordinator, ShutdownOutcome};
    use tokio::sync::watch;
    use transport::{ClientExit, ClientState};

    fn observer() -> SharedObserver {
        Arc::new(NoopObserver)
    }

    fn receiver_config(listen_addr: &str) -> ReceiverConfig {
        ReceiverConfig {
            listen_addr: listen_addr.to_string(),
            worker_count: 4,
            ..ReceiverConfig::default()
        }
    }

    fn producer_config(receiver_addr: String, id1: &str, interval_ms: u64) -> ProducerConfig {
        ProducerConfig {
            receiver_addr,
            sensor_type: "Temperature".to_string(),
            id1: id1.to_string(),
            id2: "1".to_string(),
            interval_ms,
            connect_retry_delay_ms: 50,
            control_addr: None,
            ..ProducerConfig::default()
        }
    }

    async fn wait_for_state(
        state: &mut watch::Receiver<ClientState>,
        wanted: impl FnMut(&ClientState) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), state.wait_for(wanted))
            .await
            .expect("client state timeout")
            .expect("client state channel closed");
    }

    /// Generator at 50 ms for 500 ms: at least five correctly tagged readings
    /// reach the repository
    #[tokio::test]
    async fn test_e2e_readings_reach_repository() {
        let repo = Arc::new(MemoryRepository::new());
        let receiver =
            ReceiverPipeline::start(&receiver_config("127.0.0.1:0"), repo.clone(), observer())
                .await
                .unwrap();

        let config = producer_config(receiver.local_addr().to_string(), "A", 50);
        let producer = ProducerPipeline::start(&config, observer()).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;

        let outcome = ShutdownCoordinator::new(Duration::from_secs(5))
            .with_producer(&producer)
            .with_receiver(&receiver)
            .shutdown()
            .await;
        assert_eq!(outcome, ShutdownOutcome::Graceful);

        let readings = repo.readings();
        assert!(readings.len() >= 5, "only {} readings persisted", readings.len());

        let labels = SensorLabels::new("Temperature", "A", "1");
        assert!(readings.iter().all(|r| r.has_labels(&labels)));

        let stats = receiver.stats();
        assert_eq!(stats.ingress.sessions_ended, 1);
        assert_eq!(stats.pool.saved, readings.len() as u64);
    }

    /// The receiver goes away and comes back on the same port; the producer
    /// reconnects on its own and streaming resumes
    #[tokio::test]
    async fn test_producer_reconnects_after_receiver_restart() {
        let first_repo = Arc::new(MemoryRepository::new());
        let first = ReceiverPipeline::start(
            &receiver_config("127.0.0.1:0"),
            first_repo.clone(),
            observer(),
        )
        .await
        .unwrap();
        let addr = first.local_addr();

        let recorder = Arc::new(RecordingObserver::new());
        let producer =
            ProducerPipeline::start(&producer_config(addr.to_string(), "A", 20), recorder.clone())
                .unwrap();
        let mut state = producer.client_state();
        wait_for_state(&mut state, |s| *s == ClientState::Streaming).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // kill the receiver
        first.stop_ingress().await;
        first.stop_pool().await;
        assert!(!first_repo.is_empty());

        wait_for_state(&mut state, |s| *s != ClientState::Streaming).await;

        // restore it on the same port
        let second_repo = Arc::new(MemoryRepository::new());
        let second = ReceiverPipeline::start(
            &receiver_config(&addr.to_string()),
            second_repo.clone(),
            observer(),
        )
        .await
        .unwrap();

        wait_for_state(&mut state, |s| *s == ClientState::Streaming).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let outcome = ShutdownCoordinator::new(Duration::from_secs(5))
            .with_producer(&producer)
            .with_receiver(&second)
            .shutdown()
            .await;
        assert!(outcome.is_graceful());

        assert!(!second_repo.is_empty());
        assert!(producer.stats().client.connects >= 2);
        assert!(recorder.count("send_failed") + recorder.count("dial_failed") > 0);
    }

    /// Several producers with distinct identifiers share one receiver
    #[tokio::test]
    async fn test_concurrent_producers() {
        let repo = Arc::new(MemoryRepository::new());
        let receiver =
            ReceiverPipeline::start(&receiver_config("127.0.0.1:0"), repo.clone(), observer())
                .await
                .unwrap();
        let addr = receiver.local_addr().to_string();

        let ids = ["A", "B", "C"];
        let producers: Vec<_> = ids
            .iter()
            .map(|id| ProducerPipeline::start(&producer_config(addr.clone(), id, 20), observer()))
            .collect::<Result<_, _>>()
            .unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;

        for producer in &producers {
            let outcome = ShutdownCoordinator::new(Duration::from_secs(5))
                .with_producer(producer)
                .shutdown()
                .await;
            assert!(outcome.is_graceful());
            assert!(matches!(
                producer.client_exit().await,
                Some(ClientExit::Finished(ack)) if ack.ok
            ));
        }
        let outcome = ShutdownCoordinator::new(Duration::from_secs(5))
            .with_receiver(&receiver)
            .shutdown()
            .await;
        assert!(outcome.is_graceful());

        let readings = repo.readings();
        for id in ids {
            let labels = SensorLabels::new("Temperature", id, "1");
            assert!(
                readings.iter().any(|r| r.has_labels(&labels)),
                "no readings from producer {id}"
            );
        }

        let sent: u64 = producers.iter().map(|p| p.stats().client.sent).sum();
        assert_eq!(readings.len() as u64, sent);
        assert_eq!(receiver.stats().ingress.sessions_ended, ids.len() as u64);
    }

    /// A frequency change reaches the running generator
    #[tokio::test]
    async fn test_frequency_change_speeds_up_generation() {
        let repo = Arc::new(MemoryRepository::new());
        let receiver =
            ReceiverPipeline::start(&receiver_config("127.0.0.1:0"), repo.clone(), observer())
                .await
                .unwrap();
        let producer = ProducerPipeline::start(
            &producer_config(receiver.local_addr().to_string(), "A", 60_000),
            observer(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(producer.stats().generator.produced, 0);

        producer
            .rate_controller()
            .update_frequency(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(400)).await;

        ShutdownCoordinator::new(Duration::from_secs(5))
            .with_producer(&producer)
            .with_receiver(&receiver)
            .shutdown()
            .await;

        let stats = producer.stats();
        assert!(stats.generator.produced >= 5);
        assert_eq!(stats.generator.frequency_changes, 1);
    }
}

#[cfg(test)]
mod wire_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{NoopObserver, Reading, ReceiverConfig, SensorLabels};
    use futures_util::{SinkExt, StreamExt};
    use persistence::MemoryRepository;
    use pipeline::ReceiverPipeline;
    use tokio::net::TcpStream;
    use tokio_util::codec::Framed;
    use transport::codec::ClientCodec;
    use transport::{ClientMessage, ServerMessage};

    /// Readings streamed over a raw session are all persisted once the pool
    /// is stopped
    #[tokio::test]
    async fn test_pool_stop_drains_everything_received() {
        let repo = Arc::new(MemoryRepository::new());
        let config = ReceiverConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            worker_count: 3,
            inbound_capacity: 1000,
            ..ReceiverConfig::default()
        };
        let receiver = ReceiverPipeline::start(&config, repo.clone(), Arc::new(NoopObserver))
            .await
            .unwrap();

        let stream = TcpStream::connect(receiver.local_addr()).await.unwrap();
        let mut framed = Framed::new(stream, ClientCodec::new());

        framed.send(ClientMessage::open()).await.unwrap();
        assert_eq!(framed.next().await.unwrap().unwrap(), ServerMessage::Ready);

        let labels = SensorLabels::new("Pressure", "B", "7");
        for i in 0..300 {
            framed
                .send(ClientMessage::Reading(Reading::now(i as f64, &labels)))
                .await
                .unwrap();
        }
        framed.send(ClientMessage::End).await.unwrap();

        let reply = tokio::time::timeout(Duration::from_secs(5), framed.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(matches!(reply, ServerMessage::Ack(ack) if ack.ok));

        receiver.stop_ingress().await;
        receiver.stop_pool().await;

        assert_eq!(repo.len(), 300);
        assert!(receiver.inbound().is_empty());
        assert_eq!(receiver.stats().pool.in_flight, 0);

        let mut values: Vec<f64> = repo.readings().iter().map(|r| r.value).collect();
        values.sort_by(f64::total_cmp);
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&299.0));
    }

    #[tokio::test]
    async fn test_unknown_method_is_rejected() {
        let receiver = ReceiverPipeline::start(
            &ReceiverConfig {
                listen_addr: "127.0.0.1:0".to_string(),
                ..ReceiverConfig::default()
            },
            Arc::new(MemoryRepository::new()),
            Arc::new(NoopObserver),
        )
        .await
        .unwrap();

        let stream = TcpStream::connect(receiver.local_addr()).await.unwrap();
        let mut framed = Framed::new(stream, ClientCodec::new());
        framed
            .send(ClientMessage::Open {
                method: "GetSensorData".to_string(),
            })
            .await
            .unwrap();

        let reply = framed.next().await.unwrap().unwrap();
        assert!(matches!(reply, ServerMessage::Rejected { .. }));

        receiver.stop_ingress().await;
        receiver.stop_pool().await;
    }
}
