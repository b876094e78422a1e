mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{eventually, linked_hub, next, set, FlakyTransport};
use serde_json::json;
use trigger_hub::{
    pubsub::codec::{encode, Envelope},
    Hub, HubError, HubSettings, MemoryBackend, Payload, TransportError, TransportOp, ANY_TRIGGER,
};
use trigger_hub_error::{ErrorExt, StatusCode};

/// Тест проверяет доставку между двумя хабами через общий бэкенд.
#[tokio::test]
async fn test_cross_hub_delivery() {
    let backend = MemoryBackend::default();
    let listener = linked_hub(&backend);
    let publisher = linked_hub(&backend);

    let mut ints = listener.subscribe::<i64>("initial").await.unwrap();
    let mut docs = listener.subscribe::<serde_json::Value>("initial").await.unwrap();

    publisher.publish("initial", "invalid").await.unwrap();
    publisher.publish("initial", 0_i64).await.unwrap();
    let report = publisher
        .publish("initial", json!({"state": "ready"}))
        .await
        .unwrap();
    assert_eq!(report.delivered, 0);
    assert_eq!(report.remote_receivers, Some(1));

    assert_eq!(next(&mut ints).await, Some(0));
    assert_eq!(next(&mut docs).await, Some(json!({"state": "ready"})));

    eventually(|| listener.stats().inbound == 3).await;
    let stats = listener.stats();
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.filtered, 4);
    assert_eq!(stats.echo_suppressed, 0);
    assert!(ints.is_empty());
}

/// Тест проверяет, что подписчик хаба, который сам публикует, получает
/// значение ровно один раз, хотя хаб подписан и на транспорте.
#[tokio::test]
async fn test_echo_suppressed_exactly_once() {
    let backend = MemoryBackend::default();
    let hub = linked_hub(&backend);
    let mut s = hub.subscribe::<i64>("self").await.unwrap();

    for i in 0..3_i64 {
        hub.publish("self", i).await.unwrap();
    }
    eventually(|| hub.stats().echo_suppressed == 3).await;

    for i in 0..3_i64 {
        assert_eq!(next(&mut s).await, Some(i));
    }
    assert!(s.is_empty());
}

/// Тест проверяет, что чужие байты, опубликованные прямо в бэкенд,
/// доставляются подписчикам `Bytes` и учитываются как ошибки разбора.
#[tokio::test]
async fn test_foreign_bytes_delivered_raw() {
    let backend = MemoryBackend::default();
    let hub = linked_hub(&backend);
    let mut raw = hub.subscribe::<Bytes>("raw").await.unwrap();
    let mut ints = hub.subscribe::<i64>("raw").await.unwrap();

    assert_eq!(backend.publish("raw", Bytes::from_static(b"PING")), 1);
    let envelope = Envelope::new(None, Payload::Int(9));
    backend.publish("raw", encode(&envelope).unwrap());

    assert_eq!(next(&mut raw).await, Some(Bytes::from_static(b"PING")));
    assert_eq!(next(&mut ints).await, Some(9));
    assert_eq!(hub.stats().decode_errors, 1);
}

/// Тест проверяет снятие подписки со стороны сервера: локальные потоки
/// завершаются, триггер закрывается.
#[tokio::test]
async fn test_remote_unsubscribe_all_closes_trigger() {
    let backend = MemoryBackend::default();
    let a = linked_hub(&backend);
    let b = linked_hub(&backend);
    let mut sa = a.subscribe::<bool>("shared").await.unwrap();
    let mut sb = b.subscribe::<bool>("shared").await.unwrap();

    assert_eq!(backend.unsubscribe_all("shared"), 2);

    assert_eq!(next(&mut sa).await, None);
    assert_eq!(next(&mut sb).await, None);
    assert!(!a.is_active("shared"));
    assert!(!b.is_active("shared"));
    assert!(a.linked_triggers().await.is_empty());

    // Новая подписка открывает связь заново.
    let mut again = a.subscribe::<bool>("shared").await.unwrap();
    b.publish("shared", true).await.unwrap();
    assert_eq!(next(&mut again).await, Some(true));
}

/// Тест проверяет, что при ошибке подписки на транспорте подписчик
/// снимается, а ошибка несёт триггер и операцию.
#[tokio::test]
async fn test_subscribe_failure_unregisters() {
    let backend = MemoryBackend::default();
    let flaky = FlakyTransport::new(&backend);
    let hub = Hub::with_transport(&HubSettings::default(), flaky.clone());

    set(&flaky.fail_subscribe, true);
    let err = hub.subscribe::<i64>("initial").await.unwrap_err();
    match &err {
        HubError::Transport {
            trigger,
            operation,
            source,
        } => {
            assert_eq!(trigger, "initial");
            assert_eq!(*operation, TransportOp::Subscribe);
            assert!(matches!(source, TransportError::Subscribe { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status_code(), StatusCode::SubscribeFailed);
    assert!(err.is_retryable());
    assert!(!hub.is_active("initial"));
    assert!(backend.active_triggers().is_empty());

    set(&flaky.fail_subscribe, false);
    let _s = hub.subscribe::<i64>("initial").await.unwrap();
    assert_eq!(hub.linked_triggers().await, vec!["initial".to_string()]);
}

/// Тест проверяет, что ошибка транспорта при публикации возвращается уже
/// после локальной доставки.
#[tokio::test]
async fn test_publish_failure_after_local_fan_out() {
    let backend = MemoryBackend::default();
    let flaky = FlakyTransport::new(&backend);
    let hub = Hub::with_transport(&HubSettings::default(), flaky.clone());
    let mut s = hub.subscribe::<i64>("t").await.unwrap();

    set(&flaky.fail_publish, true);
    let err = hub.publish("t", 11_i64).await.unwrap_err();
    assert_eq!(err.trigger(), Some("t"));
    assert_eq!(err.status_code(), StatusCode::PublishFailed);
    assert_eq!(err.to_string(), "transport publish failed for trigger 't'");

    assert_eq!(next(&mut s).await, Some(11));
    assert_eq!(hub.stats().delivered, 1);
}

/// Тест проверяет, что ошибка отписки на транспорте при `close` не мешает
/// локальному закрытию.
#[tokio::test]
async fn test_close_with_failing_unsubscribe() {
    let backend = MemoryBackend::default();
    let flaky = FlakyTransport::new(&backend);
    let hub = Hub::with_transport(&HubSettings::default(), flaky.clone());
    let mut s = hub.subscribe::<String>("t").await.unwrap();

    set(&flaky.fail_unsubscribe, true);
    let err = hub.close("t").await.unwrap_err();
    assert!(matches!(
        err,
        HubError::Transport {
            operation: TransportOp::Unsubscribe,
            ..
        }
    ));

    assert_eq!(next(&mut s).await, None);
    assert!(!hub.is_active("t"));
    assert!(hub.linked_triggers().await.is_empty());
    assert_eq!(hub.close("t").await.unwrap(), 0);
}

#[tokio::test]
async fn test_remote_active_triggers_sorted() {
    let backend = MemoryBackend::default();
    let hub = Hub::with_transport(&HubSettings::default(), Arc::new(backend.connect()));
    let _b = hub.subscribe::<bool>("beta").await.unwrap();
    let _a = hub.subscribe::<bool>("alpha").await.unwrap();

    assert_eq!(
        hub.remote_active_triggers().await.unwrap(),
        vec!["alpha".to_string(), "beta".to_string()]
    );
    assert_eq!(hub.active_triggers(), hub.remote_active_triggers().await.unwrap());
}

/// Тест проверяет, что сбой служебного запроса к транспорту сообщается с
/// триггером-заглушкой и не затрагивает локальное состояние.
#[tokio::test]
async fn test_remote_query_failure() {
    let backend = MemoryBackend::default();
    let flaky = FlakyTransport::new(&backend);
    let hub = Hub::with_transport(&HubSettings::default(), flaky.clone());
    let _s = hub.subscribe::<i64>("q").await.unwrap();

    set(&flaky.fail_query, true);
    let err = hub.remote_active_triggers().await.unwrap_err();
    assert_eq!(err.trigger(), Some(ANY_TRIGGER));
    assert_eq!(err.status_code(), StatusCode::ProtocolError);
    assert!(!err.is_retryable());
    assert!(matches!(
        err,
        HubError::Transport {
            operation: TransportOp::Query,
            source: TransportError::Query { .. },
            ..
        }
    ));
    assert_eq!(hub.active_triggers(), vec!["q".to_string()]);

    set(&flaky.fail_query, false);
    assert_eq!(hub.remote_active_triggers().await.unwrap(), vec!["q".to_string()]);
}
