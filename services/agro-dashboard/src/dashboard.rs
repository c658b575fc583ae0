//! Web dashboard with JSON API endpoints
//!
//! The live page renders the card view models for the latest snapshot.
//! Actions posted by the browser are checked against the same view models
//! before anything is sent to the backend.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::cards::{
    CardAction, ControlButton, DashboardView, RequestStates, CONNECTING_PLACEHOLDER,
};
use crate::dispatcher::{CommandDispatcher, PumpModeRequest, SensorTopic, SwitchState};
use crate::io::HttpClient;
use crate::snapshot::SensorSnapshot;
use crate::state::StateHandle;

/// One dispatcher per card with controls
#[derive(Debug, Clone)]
pub struct Dispatchers {
    pub soil: Arc<CommandDispatcher>,
    pub climate: Arc<CommandDispatcher>,
    pub pump: Arc<CommandDispatcher>,
}

impl Dispatchers {
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>) -> Self {
        Self {
            soil: Arc::new(CommandDispatcher::new(base_url, Arc::clone(&http))),
            climate: Arc::new(CommandDispatcher::new(base_url, Arc::clone(&http))),
            pump: Arc::new(CommandDispatcher::new(base_url, http)),
        }
    }

    pub async fn request_states(&self) -> RequestStates {
        RequestStates {
            soil: self.soil.request_state().await,
            climate: self.climate.request_state().await,
            pump: self.pump.request_state().await,
        }
    }

    /// The dispatcher serving the card that owns `action`
    pub fn for_action(&self, action: CardAction) -> &CommandDispatcher {
        match action {
            CardAction::SoilOn | CardAction::SoilOff => self.soil.as_ref(),
            CardAction::ClimateOn | CardAction::ClimateOff => self.climate.as_ref(),
            CardAction::PumpOn
            | CardAction::PumpOff
            | CardAction::ModeAuto
            | CardAction::ModeManual => self.pump.as_ref(),
        }
    }

    /// Issue the command bound to `action`, without gating
    pub async fn dispatch(&self, action: CardAction) {
        let dispatcher = self.for_action(action);
        match action {
            CardAction::SoilOn => {
                dispatcher
                    .control_sensor(SensorTopic::HumiditySoil, SwitchState::On)
                    .await
            }
            CardAction::SoilOff => {
                dispatcher
                    .control_sensor(SensorTopic::HumiditySoil, SwitchState::Off)
                    .await
            }
            CardAction::ClimateOn => {
                dispatcher
                    .control_sensor(SensorTopic::HumidityTemperature, SwitchState::On)
                    .await
            }
            CardAction::ClimateOff => {
                dispatcher
                    .control_sensor(SensorTopic::HumidityTemperature, SwitchState::Off)
                    .await
            }
            CardAction::PumpOn => {
                dispatcher
                    .control_sensor(SensorTopic::WaterPump, SwitchState::On)
                    .await
            }
            CardAction::PumpOff => {
                dispatcher
                    .control_sensor(SensorTopic::WaterPump, SwitchState::Off)
                    .await
            }
            CardAction::ModeAuto => dispatcher.set_pump_mode(PumpModeRequest::Auto).await,
            CardAction::ModeManual => dispatcher.set_pump_mode(PumpModeRequest::Manual).await,
        }
    }
}

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub snapshots: watch::Receiver<Option<SensorSnapshot>>,
    pub state: StateHandle,
    pub dispatchers: Dispatchers,
}

impl DashboardState {
    fn latest(&self) -> Option<SensorSnapshot> {
        self.snapshots.borrow().clone()
    }

    async fn view(&self) -> Option<DashboardView> {
        let snapshot = self.latest()?;
        let requests = self.dispatchers.request_states().await;
        Some(DashboardView::build(&snapshot, &requests))
    }
}

/// Build the dashboard axum router
pub fn build_router(dashboard: DashboardState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/demo", get(demo_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/cards", get(cards_handler))
        .route("/api/history", get(history_handler))
        .route("/api/actions/{action}", post(action_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(dashboard)
}

const PAGE_STYLE: &str = "font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; color: #14532d;";
const CARD_STYLE: &str = "border: 1px solid #dcfce7; border-radius: 0.5rem; padding: 1rem; margin-bottom: 1rem;";

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_buttons(controls: &[ControlButton]) -> String {
    controls
        .iter()
        .map(|c| {
            format!(
                r#"<button onclick="act('{}')" style="margin-right: 0.5rem; font-weight: {};"{}>{}</button>"#,
                c.action,
                if c.active { 700 } else { 400 },
                if c.enabled { "" } else { " disabled" },
                c.label
            )
        })
        .collect()
}

fn render_error(error: &Option<String>) -> String {
    match error {
        Some(message) => format!(
            r#"<p style="color: #ef4444;">Error: {}</p>"#,
            escape_html(message)
        ),
        None => String::new(),
    }
}

fn render_cards(view: &DashboardView) -> String {
    let soil = &view.soil;
    let soil_body = match (&soil.percentage, soil.unavailable) {
        (Some(percentage), _) => format!(
            "<p><strong>{}</strong> (Raw)</p><p>{}% de humedad</p>",
            soil.reading, percentage
        ),
        (None, Some(unavailable)) => format!(
            r#"<p style="color: #f87171;">{}</p><p><strong>{}</strong></p>"#,
            unavailable, soil.reading
        ),
        (None, None) => String::new(),
    };

    let climate = &view.climate;
    let water = &view.water;
    let pump = &view.pump_control;
    let status = &view.pump_status;

    format!(
        r#"<section style="{card}">
        <h2>Humedad del Suelo</h2>
        {soil_body}
        <div>{soil_buttons}</div>
        {soil_error}
    </section>
    <section style="{card}">
        <h2>Sensor DHT11</h2>
        <p>Humedad del Aire: <strong>{humidity}</strong></p>
        <p>Temperatura: <strong>{temperature}</strong></p>
        <div>{climate_buttons}</div>
        {climate_error}
    </section>
    <section style="{card}">
        <h2>Nivel de Agua</h2>
        <p><strong>{water_level}</strong></p>
        <p>{water_message}</p>
    </section>
    <section style="{card}">
        <h2>Control de Bomba</h2>
        <h3>Modo de Operación</h3>
        <div>{mode_buttons}</div>
        <h3>Control Manual</h3>
        <div>{pump_buttons}</div>
        {pump_error}
        <p>{pump_message}</p>
    </section>
    <section style="{card}">
        <h2>Estado de la Bomba</h2>
        <p><strong>{pump_label}</strong></p>
        <p>{mode_line}</p>
        <p>{notice}</p>
    </section>"#,
        card = CARD_STYLE,
        soil_body = soil_body,
        soil_buttons = render_buttons(&soil.controls),
        soil_error = render_error(&soil.error),
        humidity = climate.humidity,
        temperature = climate.temperature,
        climate_buttons = render_buttons(&climate.controls),
        climate_error = render_error(&climate.error),
        water_level = water.level,
        water_message = water.message,
        mode_buttons = render_buttons(&pump.mode_controls),
        pump_buttons = render_buttons(&pump.pump_controls),
        pump_error = render_error(&pump.error),
        pump_message = pump
            .advisory
            .map(str::to_string)
            .or_else(|| pump.status_line.clone())
            .unwrap_or_default(),
        pump_label = status.label,
        mode_line = status.mode_line,
        notice = status.notice.unwrap_or_default(),
    )
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let content = match dashboard.view().await {
        Some(view) => render_cards(&view),
        None => format!(r#"<p style="{}">{}</p>"#, CARD_STYLE, CONNECTING_PLACEHOLDER),
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Panel de Sensores</title>
    <script>
        function act(action) {{
            fetch('/api/actions/' + action, {{ method: 'POST' }})
                .finally(() => window.location.reload());
        }}
        setInterval(() => window.location.reload(), 3000);
    </script>
</head>
<body style="{style}">
    <h1>Panel de Sensores</h1>
    {content}
    <p><a href="/demo">Vista de demostración</a></p>
</body>
</html>"#,
        style = PAGE_STYLE,
        content = content,
    );

    Html(html)
}

async fn demo_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;

    let current = match state.current() {
        Some(point) => format!(
            r#"<section style="{}">
        <p>Humedad del Suelo: <strong>{:.1}%</strong></p>
        <p>Humedad del Aire: <strong>{:.1}%</strong></p>
        <p>Temperatura: <strong>{:.1}°C</strong></p>
    </section>"#,
            CARD_STYLE, point.soil_moisture, point.air_humidity, point.temperature
        ),
        None => format!(r#"<p style="{}">Sin datos todavía</p>"#, CARD_STYLE),
    };

    let history_rows: String = state
        .history
        .iter()
        .map(|p| {
            format!(
                r#"<tr style="border-bottom: 1px solid #dcfce7;">
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{:.1}</td>
                    <td style="padding: 0.5rem;">{:.1}</td>
                    <td style="padding: 0.5rem;">{:.1}</td>
                </tr>"#,
                p.time, p.soil_moisture, p.air_humidity, p.temperature
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="2">
    <title>Demostración</title>
</head>
<body style="{style}">
    <h1>Demostración</h1>
    {current}
    <p>Lecturas generadas: {ticks}</p>
    <table style="width: 100%; border-collapse: collapse;">
        <thead>
            <tr style="border-bottom: 2px solid #dcfce7;">
                <th style="padding: 0.5rem; text-align: left;">Hora</th>
                <th style="padding: 0.5rem; text-align: left;">Humedad del Suelo</th>
                <th style="padding: 0.5rem; text-align: left;">Humedad del Aire</th>
                <th style="padding: 0.5rem; text-align: left;">Temperatura</th>
            </tr>
        </thead>
        <tbody>{history_rows}</tbody>
    </table>
</body>
</html>"#,
        style = PAGE_STYLE,
        current = current,
        ticks = state.ticks,
        history_rows = history_rows,
    );

    Html(html)
}

async fn snapshot_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    Json(dashboard.latest())
}

async fn cards_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    Json(dashboard.view().await)
}

async fn history_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    Json(state.history.to_vec())
}

async fn action_handler(
    State(dashboard): State<DashboardState>,
    Path(name): Path<String>,
) -> Response {
    let action = match name.parse::<CardAction>() {
        Ok(action) => action,
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    let Some(view) = dashboard.view().await else {
        return (StatusCode::SERVICE_UNAVAILABLE, CONNECTING_PLACEHOLDER).into_response();
    };

    if !view.action_enabled(action) {
        tracing::debug!("Rejected disabled action {}", action);
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "action": action,
                "error": "control disabled",
            })),
        )
            .into_response();
    }

    tracing::info!("Dispatching action {}", action);
    dashboard.dispatchers.dispatch(action).await;
    let request = dashboard.dispatchers.for_action(action).request_state().await;

    Json(serde_json::json!({
        "action": action,
        "request": request,
    }))
    .into_response()
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
