use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::Context;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::UdpSocket,
};
use tracing::{debug, info, warn};

use examtimer_common::{
    RemoteClient, Side, StatusReport, TimerId, TOPIC_CLIENT_STATUS, TOPIC_RADIO_REQUEST,
};

const REPLY_TIMEOUT_MS: u64 = 500;
const POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Reset,
    Wait(bool),
    Select(TimerId, Side),
}

struct Link {
    socket: UdpSocket,
    mqtt: Option<AsyncClient>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server = std::env::var("EXAMTIMER_SERVER").unwrap_or_else(|_| "192.168.4.1:404".to_string());
    let timer = TimerId::from_wire(&std::env::var("CLIENT_TIMER").unwrap_or_else(|_| "0".into()));
    let side = Side::from_wire(&std::env::var("CLIENT_SIDE").unwrap_or_else(|_| "0".into()));
    let ping_interval_ms = std::env::var("CLIENT_PING_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(2_000);

    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("failed to bind client socket")?;
    socket
        .connect(&server)
        .await
        .with_context(|| format!("failed to resolve timer server {server}"))?;

    let mqtt = match std::env::var("MQTT_HOST") {
        Ok(host) => Some(connect_radio_relay(host).await?),
        Err(_) => None,
    };

    let link = Link { socket, mqtt };
    let mut client = RemoteClient::new(timer, side, ping_interval_ms);
    info!("client {} talking to {server}", client.endpoint());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut interval = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(ping) = client.poll_ping(monotonic_ms()) {
                    link.exchange(&ping).await;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match parse_command(&line) {
                        Some(command) => apply_command(&mut client, &link, command).await,
                        None => warn!("unknown command {line:?} (start | reset | wait on|off | select <timer> <side>)"),
                    },
                    Ok(None) => stdin_open = false,
                    Err(err) => {
                        warn!("stdin read error: {err}");
                        stdin_open = false;
                    }
                }
            }
        }
    }
}

async fn connect_radio_relay(host: String) -> anyhow::Result<AsyncClient> {
    let port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(1883);

    let mut mqtt_options = MqttOptions::new("examtimer-client", host, port);
    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);
    mqtt.publish(TOPIC_CLIENT_STATUS, QoS::AtLeastOnce, true, "online")
        .await
        .context("failed to publish client online status")?;

    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("client mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    Ok(mqtt)
}

async fn apply_command(client: &mut RemoteClient, link: &Link, command: Command) {
    match command {
        Command::Start => link.exchange(&client.start_message()).await,
        Command::Reset => link.exchange(&client.reset_message()).await,
        Command::Wait(waiting) => {
            client.set_waiting(waiting);
            link.exchange(&client.ping_message()).await;
        }
        Command::Select(timer, side) => {
            client.set_selection(timer, side);
            info!("client now {}", client.endpoint());
            link.exchange(&client.ping_message()).await;
        }
    }
}

impl Link {
    /// Sends one message over every link. Only the UDP path carries a reply.
    async fn exchange(&self, message: &str) {
        if let Some(mqtt) = &self.mqtt {
            if let Err(err) = mqtt
                .publish(TOPIC_RADIO_REQUEST, QoS::AtMostOnce, false, message.to_string())
                .await
            {
                warn!("radio publish failed: {err}");
            }
        }

        let stale = self.drain_stale_replies();
        if stale > 0 {
            debug!("discarded {stale} late replies");
        }

        if let Err(err) = self.socket.send(message.as_bytes()).await {
            warn!("udp send failed: {err}");
            return;
        }

        let mut buf = [0u8; 512];
        let received = tokio::time::timeout(
            Duration::from_millis(REPLY_TIMEOUT_MS),
            self.socket.recv(&mut buf),
        )
        .await;

        match received {
            Ok(Ok(len)) => {
                let text = String::from_utf8_lossy(&buf[..len]);
                match StatusReport::from_wire(&text) {
                    Ok(report) => log_report(message, &report),
                    Err(err) => warn!("unreadable status reply {text:?}: {err}"),
                }
            }
            Ok(Err(err)) => warn!("udp receive failed: {err}"),
            Err(_) => warn!("no reply to {message:?} within {REPLY_TIMEOUT_MS} ms"),
        }
    }

    /// Empties replies that arrived after their exchange timed out.
    fn drain_stale_replies(&self) -> usize {
        let mut buf = [0u8; 512];
        let mut drained = 0;
        while self.socket.try_recv(&mut buf).is_ok() {
            drained += 1;
        }
        drained
    }
}

fn log_report(message: &str, report: &StatusReport) {
    let [first, second] = &report.timers;
    debug!("sent {message:?}");
    info!(
        brightness = report.brightness,
        "T0 {} ms{} | T1 {} ms{}",
        first.elapsed_ms,
        if first.running { " running" } else { "" },
        second.elapsed_ms,
        if second.running { " running" } else { "" },
    );
}

fn parse_command(line: &str) -> Option<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["start"] => Some(Command::Start),
        ["reset"] => Some(Command::Reset),
        ["wait", "on"] => Some(Command::Wait(true)),
        ["wait", "off"] => Some(Command::Wait(false)),
        ["select", timer, side] => Some(Command::Select(
            TimerId::from_wire(timer),
            Side::from_wire(side),
        )),
        _ => None,
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
