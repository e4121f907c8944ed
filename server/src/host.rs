use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{
    net::{TcpListener, UdpSocket},
    sync::Mutex,
    time::MissedTickBehavior,
};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use examtimer_common::{
    codec, Button, DisplayLayout, EngineEvent, ExamTimerEngine, InputSource, PresenceEvent,
    RuntimeConfig, TimerEvent, TOPIC_RADIO_REQUEST, TOPIC_RADIO_STATUS,
};

const MAX_MESSAGE_BYTES: usize = 512;
const CONTROL_LOOP_INTERVAL_MS: u64 = 10;

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<ExamTimerEngine>>,
    buttons: ButtonPanel,
    mqtt: Option<AsyncClient>,
}

/// Simulated front panel. Presses are latched until the control loop reads
/// them, which gives each press exactly one edge.
#[derive(Clone, Default)]
struct ButtonPanel {
    pressed: Arc<[AtomicBool; 4]>,
    compact_layout: Arc<AtomicBool>,
}

#[derive(Clone)]
struct ConfigStore {
    config_path: Arc<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct ButtonAck {
    button: String,
    layout: DisplayLayout,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = ConfigStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    apply_env_overrides(&mut runtime);
    runtime.sanitize();

    let network = runtime.network.clone();
    let engine = ExamTimerEngine::new(runtime);

    let (mqtt, eventloop) = if network.radio_relay_enabled {
        let mut mqtt_options =
            MqttOptions::new("examtimer-server", network.mqtt_host.clone(), network.mqtt_port);
        if !network.mqtt_user.is_empty() {
            mqtt_options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
        }
        let (client, eventloop) = AsyncClient::new(mqtt_options, 64);
        (Some(client), Some(eventloop))
    } else {
        (None, None)
    };

    let app_state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        buttons: ButtonPanel::default(),
        mqtt,
    };

    if let (Some(client), Some(eventloop)) = (app_state.mqtt.clone(), eventloop) {
        client
            .subscribe(TOPIC_RADIO_REQUEST, QoS::AtMostOnce)
            .await
            .context("failed to subscribe to radio relay topic")?;
        spawn_mqtt_loop(app_state.clone(), eventloop);
    }
    spawn_udp_listener(app_state.clone(), network.udp_port);
    spawn_control_loop(app_state.clone());

    let web_root = format!("{}/web", env!("CARGO_MANIFEST_DIR"));
    let app = router(app_state).fallback_service(ServeDir::new(web_root));

    let addr = SocketAddr::from(([0, 0, 0, 0], network.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind timer server at {addr}"))?;

    info!("timer server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/v1/timer", get(handle_timer_request))
        .route("/api/status", get(handle_get_status))
        .route("/api/display", get(handle_get_display))
        .route("/api/buttons/{name}", post(handle_press_button))
        .with_state(app_state)
}

fn apply_env_overrides(runtime: &mut RuntimeConfig) {
    let network = &mut runtime.network;
    if let Some(port) = env_parse::<u16>("EXAMTIMER_HTTP_PORT") {
        network.http_port = port;
    }
    if let Some(port) = env_parse::<u16>("EXAMTIMER_UDP_PORT") {
        network.udp_port = port;
    }
    if let Ok(host) = std::env::var("MQTT_HOST") {
        network.mqtt_host = host;
        network.radio_relay_enabled = true;
    }
    if let Some(port) = env_parse::<u16>("MQTT_PORT") {
        network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        network.mqtt_user = user;
        network.mqtt_pass = std::env::var("MQTT_PASS").unwrap_or_default();
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn spawn_control_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(CONTROL_LOOP_INTERVAL_MS));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_refresh_ms: Option<u64> = None;

        loop {
            interval.tick().await;
            let now_ms = monotonic_ms();

            let (events, frame) = {
                let mut engine = app_state.engine.lock().await;
                let events = engine.tick(now_ms, &app_state.buttons);

                let refresh_ms = engine.config.display.refresh_ms;
                let due = last_refresh_ms
                    .map(|last| now_ms.saturating_sub(last) >= refresh_ms)
                    .unwrap_or(true);
                let frame = due.then(|| engine.display_frame(app_state.buttons.layout(), now_ms));
                (events, frame)
            };

            log_engine_events(&events);

            if let Some(frame) = frame {
                last_refresh_ms = Some(now_ms);
                let [first, second] = &frame.faces;
                debug!(
                    layout = ?frame.layout,
                    indicators = ?frame.indicators,
                    "display {} {:?} | {} {:?}",
                    first.text,
                    first.color,
                    second.text,
                    second.color
                );
            }
        }
    });
}

fn spawn_udp_listener(app_state: AppState, port: u16) {
    tokio::spawn(async move {
        let socket = match UdpSocket::bind(("0.0.0.0", port)).await {
            Ok(socket) => socket,
            Err(err) => {
                warn!("udp transport disabled, bind on port {port} failed: {err}");
                return;
            }
        };
        info!("udp transport listening on port {port}");
        serve_udp(app_state, socket).await;
    });
}

async fn serve_udp(app_state: AppState, socket: UdpSocket) {
    // One spare byte to detect datagrams over the limit.
    let mut buf = [0u8; MAX_MESSAGE_BYTES + 1];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(err) => {
                warn!("udp receive error: {err}");
                continue;
            }
        };
        if len > MAX_MESSAGE_BYTES {
            warn!("dropping oversized udp message from {peer}");
            continue;
        }

        let message = String::from_utf8_lossy(&buf[..len]).into_owned();
        let mut payload = handle_wire_message(&app_state, &message, "udp")
            .await
            .into_bytes();
        payload.push(0);

        if let Err(err) = socket.send_to(&payload, peer).await {
            warn!("udp reply to {peer} failed: {err}");
        }
    }
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if message.topic != TOPIC_RADIO_REQUEST {
                        continue;
                    }
                    if message.payload.len() > MAX_MESSAGE_BYTES {
                        warn!(
                            "dropping oversized radio message ({} bytes)",
                            message.payload.len()
                        );
                        continue;
                    }
                    let text = String::from_utf8_lossy(&message.payload).into_owned();
                    let reply = handle_wire_message(&app_state, &text, "radio").await;

                    if let Some(mqtt) = &app_state.mqtt {
                        if let Err(err) = mqtt
                            .publish(TOPIC_RADIO_STATUS, QoS::AtMostOnce, false, reply)
                            .await
                        {
                            warn!("radio status publish failed: {err}");
                        }
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("radio relay connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("radio relay poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

/// Runs one protocol message against the engine. Every transport funnels
/// through here, so requests are applied one at a time.
async fn handle_wire_message(app_state: &AppState, message: &str, transport: &str) -> String {
    let exchange = {
        let mut engine = app_state.engine.lock().await;
        engine.handle_message(message, monotonic_ms())
    };

    debug!(transport, request = ?exchange.request, "handled message {message:?}");
    log_engine_events(&exchange.events);
    exchange.reply
}

fn log_engine_events(events: &[EngineEvent]) {
    for event in events {
        match event {
            EngineEvent::Presence(PresenceEvent::Connected(endpoint)) => {
                info!("[CLIENT]{endpoint} Connected");
            }
            EngineEvent::Presence(PresenceEvent::Disconnected(endpoint)) => {
                info!("[CLIENT]{endpoint} Disconnected");
            }
            EngineEvent::Timer(TimerEvent::Stopped { timer, result_ms }) => {
                info!("[TIMER][{timer}] stopped at {result_ms} ms");
            }
            EngineEvent::Timer(TimerEvent::StopTooEarly { timer, elapsed_ms }) => {
                debug!("[TIMER][{timer}] stop ignored after {elapsed_ms} ms");
            }
            EngineEvent::Timer(TimerEvent::IdleReset(timer)) => {
                info!("[TIMER][{timer}] idle reset");
            }
            other => debug!("engine event: {other:?}"),
        }
    }
}

async fn handle_timer_request(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let reply = handle_wire_message(&state, &codec::encode(pairs), "http").await;
    (
        [
            (header::CONNECTION, "keep-alive"),
            (header::SERVER, "ExamTimer"),
            (header::CONTENT_TYPE, "text/plain"),
        ],
        reply,
    )
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = {
        let engine = state.engine.lock().await;
        engine.status(monotonic_ms())
    };
    Json(status)
}

async fn handle_get_display(State(state): State<AppState>) -> impl IntoResponse {
    let frame = {
        let engine = state.engine.lock().await;
        engine.display_frame(state.buttons.layout(), monotonic_ms())
    };
    Json(frame)
}

async fn handle_press_button(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    if name == "layout" {
        state.buttons.flip_layout();
    } else {
        let Some(button) = Button::from_name(&name) else {
            return error_response(StatusCode::NOT_FOUND, "Unknown button");
        };
        state.buttons.press(button);
    }

    (
        StatusCode::ACCEPTED,
        Json(ButtonAck {
            button: name,
            layout: state.buttons.layout(),
        }),
    )
        .into_response()
}

impl ButtonPanel {
    fn press(&self, button: Button) {
        self.pressed[slot(button)].store(true, Ordering::Relaxed);
    }

    fn flip_layout(&self) {
        self.compact_layout.fetch_xor(true, Ordering::Relaxed);
    }

    fn layout(&self) -> DisplayLayout {
        if self.compact_layout.load(Ordering::Relaxed) {
            DisplayLayout::Compact
        } else {
            DisplayLayout::Full
        }
    }
}

impl InputSource for ButtonPanel {
    fn is_pressed(&self, button: Button) -> bool {
        self.pressed[slot(button)].swap(false, Ordering::Relaxed)
    }
}

fn slot(button: Button) -> usize {
    Button::ALL
        .iter()
        .position(|candidate| *candidate == button)
        .unwrap_or_default()
}

impl ConfigStore {
    fn new() -> Self {
        let data_dir = std::env::var("EXAMTIMER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.examtimer"));
        Self::at(data_dir)
    }

    fn at(data_dir: PathBuf) -> Self {
        Self {
            config_path: Arc::new(data_dir.join("config.json")),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(self.config_path.as_ref()).await {
            Ok(raw) => RuntimeConfig::from_json(&raw).with_context(|| {
                format!("invalid config file {}", self.config_path.display())
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
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
