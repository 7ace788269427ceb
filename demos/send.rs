use application_insights_channel::{
    FileSessionStorage, Sender, SenderConfig, TelemetryItem, DEFAULT_MAX_BATCH_INTERVAL,
};
use serde_json::json;
use std::{error::Error, sync::Arc, time::Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SenderConfig::from_env()?.with_max_batch_interval(DEFAULT_MAX_BATCH_INTERVAL);
    let storage = FileSessionStorage::new(std::env::temp_dir().join("application-insights-demo"))?;
    let mut sender = Sender::builder()
        .with_http_client(reqwest::Client::new())
        .with_session_storage(Arc::new(storage))
        .initialize(config);

    sender
        .process_telemetry(
            &TelemetryItem::new("EventData")
                .with_base_data(json!({ "name": "demo started" }))
                .with_data(json!({ "fruit": "apple", "price": 2.99 })),
        )
        .await;
    sender
        .process_telemetry(&TelemetryItem::new("MessageData").with_base_data(json!({
            "message": "hello from the demo",
            "severityLevel": 1,
        })))
        .await;
    sender
        .process_telemetry(&TelemetryItem::new("MetricData").with_base_data(json!({
            "name": "queue length",
            "average": 4.5,
            "sampleCount": 2,
            "min": 3,
            "max": 6,
        })))
        .await;
    sender
        .process_telemetry(&TelemetryItem::new("RemoteDependencyData").with_base_data(json!({
            "id": "|4bf92f3577b34da6a3ce929d0e0e4736.1",
            "target": "https://example.com/api/items?page=2",
            "responseCode": 200,
            "duration": 42,
            "properties": { "http.method": "POST" },
        })))
        .await;

    // Drive the batch timer the way a host event loop would.
    while let Some(deadline) = sender.timer_deadline() {
        tokio::time::sleep(deadline.saturating_duration_since(Instant::now())).await;
        sender.on_timer().await;
        if sender.buffer_count() == 0 {
            break;
        }
    }

    println!(
        "sent, state {:?}, app id {:?}",
        sender.state(),
        sender.app_id()
    );
    for message in sender.logger().take_queue() {
        println!("{}", message.message);
    }

    sender.teardown().await;
    Ok(())
}
