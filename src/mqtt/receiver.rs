/// MQTT subscription loop feeding the shared state
use log::{debug, error, info, warn};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeFilter,
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Duration};

use crate::config::{BrokerConfig, Topics};
use crate::mqtt::decode::{decode_output, decode_prediction, decode_sensor, payload_str};
use crate::state::SharedState;

const REQUEST_CHANNEL_CAPACITY: usize = 32;
const DISCONNECT_TIMEOUT_SECS: u64 = 2;

/// Route one delivery to its decoder and apply the result to the shared state
///
/// Nothing here is fatal: undecodable payloads are logged and dropped, and
/// the previous values stay in place.
pub fn dispatch(
    state: &SharedState,
    topics: &Topics,
    topic: &str,
    payload: &[u8],
    received_at: OffsetDateTime,
) {
    state.count_message();

    let text = match payload_str(payload) {
        Ok(text) => text,
        Err(e) => {
            warn!("Dropping message on {}: {}", topic, e);
            state.count_decode_failure();
            return;
        }
    };

    if topic == topics.sensor {
        match decode_sensor(text, received_at) {
            Ok(reading) => {
                debug!(
                    "Sensor: temp={:?}, hum={:?}, soil={:?}",
                    reading.temperature, reading.humidity, reading.soil_moisture
                );
                state.record_sensor(reading);
            }
            Err(e) => {
                warn!("Failed to read sensor data: {}", e);
                state.count_decode_failure();
            }
        }
    } else if topic == topics.prediction {
        match decode_prediction(text) {
            Some(prediction) => {
                debug!("Prediction: {}", prediction.raw());
                state.set_prediction(prediction);
            }
            None => debug!("Ignoring prediction without prefix: {:?}", text),
        }
    } else if topic == topics.output {
        match decode_output(text) {
            Ok(output) => {
                debug!("Output: led={}, buzzer={}", output.led_color, output.buzzer_on);
                state.set_output(output);
            }
            Err(e) => {
                warn!("Failed to read output data: {}", e);
                state.count_decode_failure();
            }
        }
    } else {
        debug!("Ignoring message on unexpected topic {}", topic);
    }
}

pub struct MessageReceiver {
    options: MqttOptions,
    broker: BrokerConfig,
    topics: Topics,
    state: SharedState,
}

impl MessageReceiver {
    pub fn new(broker: BrokerConfig, topics: Topics, state: SharedState) -> Self {
        let client_id = format!("smartpot-monitor-{}", std::process::id());
        let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
        options.set_keep_alive(broker.keepalive);
        options.set_clean_session(true);

        MessageReceiver {
            options,
            broker,
            topics,
            state,
        }
    }

    fn subscriptions(&self) -> Vec<SubscribeFilter> {
        [&self.topics.sensor, &self.topics.prediction, &self.topics.output]
            .into_iter()
            .map(|topic| SubscribeFilter::new(topic.clone(), QoS::AtMostOnce))
            .collect()
    }

    /// Receive until `shutdown` turns true, then disconnect from the broker
    ///
    /// Connection errors are retried after the configured delay. Topics are
    /// subscribed again on every ConnAck since the session is clean.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CHANNEL_CAPACITY);
        info!(
            "Connecting to MQTT broker {}:{}",
            self.broker.host, self.broker.port
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender dropped, nobody can stop us any more
                        break;
                    }
                }
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            info!("MQTT connected");
                            self.state.set_connected(true);
                            match client.try_subscribe_many(self.subscriptions()) {
                                Ok(()) => info!(
                                    "Subscribed to {}, {}, {}",
                                    self.topics.sensor, self.topics.prediction, self.topics.output
                                ),
                                Err(e) => error!("Failed to subscribe: {}", e),
                            }
                        } else {
                            warn!("MQTT connection refused: {:?}", ack.code);
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        dispatch(
                            &self.state,
                            &self.topics,
                            &publish.topic,
                            &publish.payload,
                            OffsetDateTime::now_utc(),
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.state.set_connected(false);
                        warn!(
                            "MQTT connection error: {}. Retrying in {:?}",
                            e, self.broker.reconnect_delay
                        );
                        tokio::select! {
                            _ = sleep(self.broker.reconnect_delay) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                },
            }
        }

        disconnect(&client, &mut eventloop).await;
        self.state.set_connected(false);
        info!("MQTT receiver stopped");
    }
}

/// Send DISCONNECT and drive the event loop until it goes out.
async fn disconnect(client: &AsyncClient, eventloop: &mut EventLoop) {
    if let Err(e) = client.try_disconnect() {
        debug!("Disconnect request not queued: {}", e);
        return;
    }

    let flushed = timeout(Duration::from_secs(DISCONNECT_TIMEOUT_SECS), async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;

    if flushed.is_err() {
        debug!("Timed out waiting for MQTT disconnect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_TOPIC_OUTPUT, DEFAULT_TOPIC_PREDICTION, DEFAULT_TOPIC_SENSOR};
    use crate::models::ActuatorOutput;

    fn topics() -> Topics {
        Topics {
            sensor: DEFAULT_TOPIC_SENSOR.to_string(),
            prediction: DEFAULT_TOPIC_PREDICTION.to_string(),
            output: DEFAULT_TOPIC_OUTPUT.to_string(),
        }
    }

    fn deliver(state: &SharedState, topic: &str, payload: &str) {
        dispatch(state, &topics(), topic, payload.as_bytes(), OffsetDateTime::now_utc());
    }

    #[test]
    fn sensor_prediction_sensor_orders_log_predictions() {
        let state = SharedState::new();
        deliver(&state, DEFAULT_TOPIC_SENSOR, r#"{"temp":25.0,"hum":70,"soil":45}"#);
        deliver(&state, DEFAULT_TOPIC_PREDICTION, "ai:[INFO]kondisi_optimal");
        deliver(&state, DEFAULT_TOPIC_SENSOR, r#"{"temp":26.0,"hum":68,"soil":44}"#);

        let drained = state.drain();
        let predictions: Vec<&str> = drained.entries.iter().map(|e| e.prediction.raw()).collect();
        assert_eq!(predictions, vec!["-", "[INFO]kondisi_optimal"]);
        assert_eq!(drained.entries[0].reading.temperature, Some(25.0));
        assert_eq!(drained.entries[1].reading.temperature, Some(26.0));
    }

    #[test]
    fn malformed_sensor_leaves_snapshot_and_queue_unchanged() {
        let state = SharedState::new();
        deliver(&state, DEFAULT_TOPIC_SENSOR, r#"{"temp":25.0,"hum":70,"soil":45}"#);
        let before = state.snapshot();

        deliver(&state, DEFAULT_TOPIC_SENSOR, r#"{"temp":"n/a","hum":70,"soil":45}"#);

        let after = state.snapshot();
        assert_eq!(after.sensor, before.sensor);
        assert_eq!(state.pending_len(), 1);
        assert_eq!(after.link.decode_failures, 1);
        assert_eq!(after.link.messages_received, 2);
    }

    #[test]
    fn malformed_prediction_keeps_previous() {
        let state = SharedState::new();
        deliver(&state, DEFAULT_TOPIC_PREDICTION, "ai:[HIGH]bahaya_akar");
        deliver(&state, DEFAULT_TOPIC_PREDICTION, "garbage-without-separator");
        assert_eq!(state.snapshot().prediction.raw(), "[HIGH]bahaya_akar");
    }

    #[test]
    fn output_defaults_apply_per_message_not_from_previous() {
        let state = SharedState::new();
        deliver(&state, DEFAULT_TOPIC_OUTPUT, r#"{"led_color":"RED","buzzer_on":true}"#);
        assert_eq!(
            state.snapshot().output,
            ActuatorOutput {
                led_color: "RED".to_string(),
                buzzer_on: true
            }
        );

        deliver(&state, DEFAULT_TOPIC_OUTPUT, r#"{"led_color":"GREEN"}"#);
        let output = state.snapshot().output;
        assert_eq!(output.led_color, "GREEN");
        assert!(!output.buzzer_on);
    }

    #[test]
    fn malformed_output_keeps_previous() {
        let state = SharedState::new();
        deliver(&state, DEFAULT_TOPIC_OUTPUT, r#"{"led_color":"RED","buzzer_on":true}"#);
        deliver(&state, DEFAULT_TOPIC_OUTPUT, "{broken");
        assert_eq!(state.snapshot().output.led_color, "RED");
        assert!(state.snapshot().output.buzzer_on);
    }

    #[test]
    fn unknown_topic_and_bad_utf8_are_dropped() {
        let state = SharedState::new();
        deliver(&state, "some/other/topic", r#"{"temp":1}"#);
        dispatch(
            &state,
            &topics(),
            DEFAULT_TOPIC_SENSOR,
            &[0xc3, 0x28],
            OffsetDateTime::now_utc(),
        );
        assert_eq!(state.pending_len(), 0);
        assert!(state.snapshot().sensor.is_none());
    }

    #[test]
    fn subscribes_to_all_three_topics() {
        let receiver = MessageReceiver::new(
            BrokerConfig {
                host: "localhost".to_string(),
                port: 1883,
                keepalive: Duration::from_secs(60),
                reconnect_delay: Duration::from_secs(1),
            },
            topics(),
            SharedState::new(),
        );
        let paths: Vec<String> = receiver.subscriptions().into_iter().map(|f| f.path).collect();
        assert_eq!(
            paths,
            vec![DEFAULT_TOPIC_SENSOR, DEFAULT_TOPIC_PREDICTION, DEFAULT_TOPIC_OUTPUT]
        );
    }

    #[tokio::test]
    async fn shutdown_stops_receiver_without_broker() {
        let receiver = MessageReceiver::new(
            BrokerConfig {
                host: "127.0.0.1".to_string(),
                port: 1,
                keepalive: Duration::from_secs(30),
                reconnect_delay: Duration::from_millis(50),
            },
            topics(),
            SharedState::new(),
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(receiver.run(rx));

        sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let finished = timeout(Duration::from_secs(5), handle).await;
        assert!(finished.is_ok());
    }
}
