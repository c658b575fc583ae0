//! BDD step definitions for card gating

use cucumber::{given, then, when};
use serde_json::json;

use agro_dashboard::cards::{CardAction, ControlButton, DashboardView};
use agro_dashboard::SensorSnapshot;

use crate::doubles::sensor_payload;
use crate::world::AgroWorld;

fn snapshot_with(overrides: &[(&str, serde_json::Value)]) -> SensorSnapshot {
    SensorSnapshot::from_value(sensor_payload(overrides)).expect("scenario payload must decode")
}

fn parse_action(name: &str) -> CardAction {
    name.parse()
        .unwrap_or_else(|_| panic!("Unknown action: {}", name))
}

fn view(world: &AgroWorld) -> &DashboardView {
    world.view.as_ref().expect("cards not rendered")
}

fn optional(text: &str) -> Option<&str> {
    if text == "none" {
        None
    } else {
        Some(text)
    }
}

#[given(expr = "a snapshot with soil moisture {int}")]
fn snapshot_with_soil_value(world: &mut AgroWorld, raw: i64) {
    world.snapshot = Some(snapshot_with(&[("humedadSuelo", json!(raw))]));
}

#[given(expr = "a snapshot with soil moisture {string}")]
fn snapshot_with_soil_label(world: &mut AgroWorld, label: String) {
    world.snapshot = Some(snapshot_with(&[("humedadSuelo", json!(label))]));
}

#[given(expr = "a snapshot with air humidity {int} and temperature {string}")]
fn snapshot_with_climate(world: &mut AgroWorld, humidity: i64, temperature: String) {
    world.snapshot = Some(snapshot_with(&[
        ("humedad", json!(humidity)),
        ("temperatura", json!(temperature)),
    ]));
}

#[given(expr = "a snapshot with pump mode {string}, water level {string} and pump {string}")]
fn snapshot_with_pump(world: &mut AgroWorld, mode: String, water: String, pump: String) {
    world.snapshot = Some(snapshot_with(&[
        ("modoBomba", json!(mode)),
        ("nivelAgua", json!(water)),
        ("Bomba", json!(pump)),
    ]));
}

#[given(expr = "the {word} dispatcher is loading")]
fn dispatcher_is_loading(world: &mut AgroWorld, card: String) {
    let state = match card.as_str() {
        "soil" => &mut world.requests.soil,
        "climate" => &mut world.requests.climate,
        "pump" => &mut world.requests.pump,
        other => panic!("Unknown card: {}", other),
    };
    state.loading = true;
}

#[when("the cards are rendered")]
fn cards_are_rendered(world: &mut AgroWorld) {
    let snapshot = world.snapshot.as_ref().expect("snapshot not set");
    world.view = Some(DashboardView::build(snapshot, &world.requests));
}

#[then(expr = "the soil moisture percentage should be {string}")]
fn soil_percentage(world: &mut AgroWorld, expected: String) {
    assert_eq!(view(world).soil.percentage.as_deref(), Some(expected.as_str()));
}

#[then(expr = "the soil moisture card should read {string}")]
fn soil_card_reads(world: &mut AgroWorld, expected: String) {
    assert_eq!(view(world).soil.unavailable, Some(expected.as_str()));
}

#[then(expr = "the climate card should show temperature {string}")]
fn climate_temperature(world: &mut AgroWorld, expected: String) {
    assert_eq!(view(world).climate.temperature, expected);
}

#[then(expr = "action {string} should be {word}")]
fn action_should_be(world: &mut AgroWorld, action: String, expected: String) {
    let enabled = view(world).action_enabled(parse_action(&action));
    match expected.as_str() {
        "enabled" => assert!(enabled, "expected {} to be enabled", action),
        "disabled" => assert!(!enabled, "expected {} to be disabled", action),
        other => panic!("Unknown expectation: {}", other),
    }
}

#[then(expr = "the pump advisory should be {string}")]
fn pump_advisory(world: &mut AgroWorld, expected: String) {
    assert_eq!(view(world).pump_control.advisory, optional(&expected));
}

#[then(expr = "the pump status line should be {string}")]
fn pump_status_line(world: &mut AgroWorld, expected: String) {
    assert_eq!(
        view(world).pump_control.status_line.as_deref(),
        optional(&expected)
    );
}

#[then(expr = "every control of the {word} card should be disabled")]
fn every_control_disabled(world: &mut AgroWorld, card: String) {
    let view = view(world);
    let controls: Vec<&ControlButton> = match card.as_str() {
        "soil" => view.soil.controls.iter().collect(),
        "climate" => view.climate.controls.iter().collect(),
        "pump" => view
            .pump_control
            .mode_controls
            .iter()
            .chain(view.pump_control.pump_controls.iter())
            .collect(),
        other => panic!("Unknown card: {}", other),
    };
    assert!(!controls.is_empty());
    assert!(
        controls.iter().all(|c| !c.enabled),
        "expected every {} control to be disabled: {:?}",
        card,
        controls
    );
}

#[then(expr = "the pump status should read {string}")]
fn pump_status_label(world: &mut AgroWorld, expected: String) {
    assert_eq!(view(world).pump_status.label, expected);
}

#[then(expr = "the pump status notice should be {string}")]
fn pump_status_notice(world: &mut AgroWorld, expected: String) {
    assert_eq!(view(world).pump_status.notice, optional(&expected));
}
