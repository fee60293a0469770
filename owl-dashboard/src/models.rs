/**
 * MODÈLES TÉLÉMÉTRIE OWL - Schéma canonique partagé par tous les endpoints
 *
 * RÔLE : Types de données échangés avec le backend (overview, listing flotte,
 * statut par unité) et conservés dans le store.
 *
 * SCHÉMA CANONIQUE : `cpu_percent` / `cpu_temp` / `detecting` / `error` / `status`.
 * L'overview historique envoie `cpu` / `temp`, le statut par unité du backend
 * Flask envoie `cpu_usage` : acceptés comme alias au décodage.
 *
 * ORDRE : les objets `UnitId -> T` sont des IndexMap, l'ordre des clés du
 * document est conservé (serde_json `preserve_order`).
 */

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifiant stable d'une unité OWL (clé d'objet JSON côté backend)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numéro affiché : id numérique + 1 (les unités sont indexées à partir de 0)
    pub fn display_number(&self) -> Option<i64> {
        self.0.trim().parse::<i64>().ok().map(|n| n.saturating_add(1))
    }

    /// Libellé humain, ex: "0" -> "OWL 1", "barn" -> "OWL barn"
    pub fn label(&self) -> String {
        match self.display_number() {
            Some(n) => format!("OWL {n}"),
            None => format!("OWL {}", self.0),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for UnitId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

/// Jeton de statut opaque (nominal, warning, error, offline...), transmis tel quel
/// comme classe DOM. Aucune validation d'appartenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitStatus(String);

impl UnitStatus {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UnitStatus {
    fn default() -> Self {
        Self("unknown".to_string())
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dernière télémétrie connue d'une unité
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(alias = "cpu", alias = "cpu_usage")]
    pub cpu_percent: f64,
    #[serde(alias = "temp")]
    pub cpu_temp: f64,
    #[serde(default)]
    pub detecting: bool,
    #[serde(default, deserialize_with = "deserialize_error_flag")]
    pub error: bool,
    #[serde(default)]
    pub status: UnitStatus,
}

/// Descripteur minimal d'une unité dans le listing flotte (`GET /owls`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitDescriptor {
    pub ip: Option<String>,
    pub last_seen: Option<String>,
    pub status: Option<UnitStatus>,
}

/// Résumé léger de toute la flotte (`GET /system_stats`)
pub type Overview = IndexMap<UnitId, TelemetrySnapshot>;

/// Unités connues du backend (`GET /owls`)
pub type FleetListing = IndexMap<UnitId, UnitDescriptor>;

// Le backend envoie `error` en booléen, en null ou en message d'erreur texte
fn deserialize_error_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(flag)) => flag,
        Some(serde_json::Value::String(message)) => !message.is_empty(),
        Some(_) => true,
    })
}
