/*!
Payloads télémétrie tels que servis par un backend OWL

Deux formes coexistent côté backend:
- overview (`/system_stats`) : clés courtes `cpu` / `temp`, `error` booléen
- statut unité (`/owl/{id}/status`) : `cpu_percent` / `cpu_temp`, `error` message ou null
*/

use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct UnitPayload {
    pub cpu: f64,
    pub temp: f64,
    pub detecting: bool,
    pub error: bool,
    pub status: String,
    pub ip: String,
}

impl UnitPayload {
    pub fn new(cpu: f64, temp: f64) -> Self {
        Self {
            cpu,
            temp,
            detecting: false,
            error: false,
            status: "nominal".to_string(),
            ip: "127.0.0.1".to_string(),
        }
    }

    pub fn status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn detecting(mut self, detecting: bool) -> Self {
        self.detecting = detecting;
        self
    }

    pub fn error(mut self, error: bool) -> Self {
        self.error = error;
        self
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.ip = ip.to_string();
        self
    }

    /// Forme renvoyée par `/owl/{id}/status`
    pub fn canonical_json(&self) -> Value {
        let error = if self.error { Value::from("sensor fault") } else { Value::Null };
        json!({
            "cpu_percent": self.cpu,
            "cpu_temp": self.temp,
            "detecting": self.detecting,
            "error": error,
            "status": self.status,
        })
    }

    /// Entrée de l'objet renvoyé par `/system_stats`
    pub fn overview_json(&self) -> Value {
        json!({
            "cpu": self.cpu,
            "temp": self.temp,
            "detecting": self.detecting,
            "error": self.error,
        })
    }

    /// Entrée de l'objet renvoyé par `/owls`
    pub fn descriptor_json(&self) -> Value {
        json!({
            "ip": self.ip,
            "status": self.status,
        })
    }
}
