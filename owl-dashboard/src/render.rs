//! Renderer: materialises telemetry and UI state into the document
//!
//! Every operation is a function of its inputs only. Collection views are fully
//! replaced on each call, so repeated renders of the same state produce the
//! same tree. A missing anchor skips the step without error.

use crate::color::{color_for, SeverityColor, CPU_MAX, TEMP_MAX_CELSIUS};
use crate::dom::{actions, anchors, Document, Element, ATTR_ACTION, ATTR_UNIT};
use crate::models::{Overview, TelemetrySnapshot, UnitId};
use crate::store::{StoreEntry, TelemetryStore};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderer {
    cpu_max: f64,
    temp_max: f64,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            cpu_max: CPU_MAX,
            temp_max: TEMP_MAX_CELSIUS,
        }
    }
}

impl Renderer {
    pub fn new(cpu_max: f64, temp_max: f64) -> Self {
        Self { cpu_max, temp_max }
    }

    pub fn cpu_color(&self, cpu_percent: f64) -> SeverityColor {
        color_for(cpu_percent, self.cpu_max)
    }

    pub fn temp_color(&self, cpu_temp: f64) -> SeverityColor {
        color_for(cpu_temp, self.temp_max)
    }

    pub fn render_overview(&self, doc: &mut dyn Document, overview: &Overview) {
        let Some(container) = doc.element_mut(anchors::OVERVIEW) else {
            debug!("overview anchor missing, skipping render");
            return;
        };

        let markers = overview
            .iter()
            .enumerate()
            .map(|(index, (id, telemetry))| overview_marker(index, id, telemetry))
            .collect();
        container.replace_children(markers);
    }

    pub fn render_grid(&self, doc: &mut dyn Document, fleet: &TelemetryStore) {
        let Some(grid) = doc.element_mut(anchors::GRID) else {
            debug!("grid anchor missing, skipping render");
            return;
        };

        let cards = fleet.entries().map(|entry| self.unit_card(entry)).collect();
        grid.replace_children(cards);
    }

    /// Re-renders only the card of `id`. A unit not yet on the grid is inserted
    /// at its store position, so the result matches a full `render_grid`.
    pub fn render_unit_card(&self, doc: &mut dyn Document, fleet: &TelemetryStore, id: &UnitId) {
        let Some(entry) = fleet.entry(id) else {
            return;
        };
        let Some(grid) = doc.element_mut(anchors::GRID) else {
            debug!("grid anchor missing, skipping render");
            return;
        };

        let card = self.unit_card(entry);
        if let Err(card) = grid.replace_child(&card_id(id), card) {
            grid.insert_child(fleet.position(id).unwrap_or(usize::MAX), card);
        }
    }

    pub fn render_detection_toggle_button(&self, doc: &mut dyn Document, active: bool) {
        let label = if active { "Detection Active" } else { "Detection Off" };
        render_toggle(doc, anchors::DETECTION_BUTTON, "⊕", label, active);
    }

    pub fn render_recording_toggle_button(&self, doc: &mut dyn Document, active: bool) {
        let label = if active { "Recording" } else { "Record" };
        render_toggle(doc, anchors::RECORD_BUTTON, "⏺", label, active);
    }

    pub fn render_video_panel(&self, doc: &mut dyn Document, selected: Option<&UnitId>) {
        let Some(panel) = doc.element_mut(anchors::VIDEO_PANEL) else {
            debug!("video panel anchor missing, skipping render");
            return;
        };

        match selected {
            Some(id) => {
                panel.remove_class("hidden");
                panel.set_attr(ATTR_UNIT, id.as_str());
            }
            None => {
                panel.add_class("hidden");
                panel.remove_attr(ATTR_UNIT);
                return;
            }
        }

        if let (Some(id), Some(title)) = (selected, doc.element_mut(anchors::VIDEO_TITLE)) {
            title.set_text(format!("{} Video Feed", id.label()));
        }
    }

    fn unit_card(&self, entry: StoreEntry<'_>) -> Element {
        let StoreEntry { id, snapshot: telemetry, .. } = entry;
        let mut header = Element::new("div")
            .with_class("owl-card-header")
            .with_child(Element::new("h3").with_text(id.label()));
        if telemetry.error {
            header.append_child(Element::new("span").with_class("error-indicator").with_text("⚠️"));
        }
        header.append_child(
            Element::new("span")
                .with_class("status-indicator")
                .with_class(telemetry.status.as_str()),
        );

        let temp = Element::new("div")
            .with_id(format!("{id}-temp"))
            .with_text(format!("Temperature: {}°C", telemetry.cpu_temp))
            .with_style("color", self.temp_color(telemetry.cpu_temp).to_string());
        let cpu = Element::new("div")
            .with_id(format!("{id}-cpu"))
            .with_text(format!("CPU: {}%", telemetry.cpu_percent))
            .with_style("color", self.cpu_color(telemetry.cpu_percent).to_string());

        let mut card = Element::new("div")
            .with_id(card_id(id))
            .with_class("owl-card")
            .with_attr(ATTR_ACTION, actions::SELECT_UNIT)
            .with_attr(ATTR_UNIT, id.as_str())
            .with_child(header)
            .with_child(
                Element::new("div")
                    .with_class("owl-card-stats")
                    .with_child(temp)
                    .with_child(cpu),
            );
        // showing last known values, this cycle's fetch failed
        card.set_class("fetch-failed", entry.last_fetch_failed);
        card
    }
}

pub fn card_id(id: &UnitId) -> String {
    format!("owl-{id}")
}

fn overview_marker(index: usize, id: &UnitId, telemetry: &TelemetrySnapshot) -> Element {
    let number = id
        .display_number()
        .map(|n| n.to_string())
        .unwrap_or_else(|| (index + 1).to_string());

    let mut marker = Element::new("div")
        .with_class("owl-marker")
        .with_attr(ATTR_UNIT, id.as_str())
        .with_text(number);
    marker.set_class("detecting", telemetry.detecting);
    marker.set_class("error", telemetry.error);
    marker
}

fn render_toggle(doc: &mut dyn Document, anchor: &str, icon: &str, label: &str, active: bool) {
    let Some(button) = doc.element_mut(anchor) else {
        debug!("{anchor} anchor missing, skipping render");
        return;
    };
    button.set_class("active", active);
    button.replace_children(vec![
        Element::new("span").with_class("icon").with_text(icon),
        Element::new("span").with_class("label").with_text(label),
    ]);
}
