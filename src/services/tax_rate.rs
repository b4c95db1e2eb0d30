//! Configurable tax rate store.
//!
//! The rate is held behind an in-process lock and optionally persisted to a
//! small JSON file so it survives restarts. Sale orchestrations read the
//! rate exactly once per call and never cache it beyond that call; a rate
//! change mid-flight does not affect sales that already captured their rate.

use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, Deserialize)]
struct TaxConfigFile {
    tax_rate: Decimal,
}

/// Shared tax-rate service. The rate is a decimal fraction (0.08 = 8%),
/// clamped to `[0, 1]`.
#[derive(Clone)]
pub struct TaxRateService {
    current: Arc<RwLock<Decimal>>,
    config_path: Option<PathBuf>,
    event_sender: EventSender,
}

impl TaxRateService {
    /// Creates the service, preferring a previously persisted rate over the
    /// configured default.
    pub fn new(
        default_rate: Decimal,
        config_path: Option<PathBuf>,
        event_sender: EventSender,
    ) -> Self {
        let initial = config_path
            .as_deref()
            .and_then(read_rate_file)
            .unwrap_or(default_rate);
        Self {
            current: Arc::new(RwLock::new(sanitize(initial))),
            config_path,
            event_sender,
        }
    }

    /// Returns the current tax rate.
    pub async fn get_tax_rate(&self) -> Decimal {
        *self.current.read().await
    }

    /// Replaces the tax rate, persisting it when a config path is set.
    /// Returns the sanitized rate actually stored.
    pub async fn update_tax_rate(&self, new_rate: Decimal) -> Decimal {
        let sanitized = sanitize(new_rate);
        let old_rate = {
            let mut guard = self.current.write().await;
            std::mem::replace(&mut *guard, sanitized)
        };

        if let Some(path) = &self.config_path {
            let file = TaxConfigFile {
                tax_rate: sanitized,
            };
            let result = serde_json::to_string_pretty(&file)
                .map_err(|e| e.to_string())
                .and_then(|json| {
                    if let Some(dir) = path.parent() {
                        std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
                    }
                    std::fs::write(path, json).map_err(|e| e.to_string())
                });
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "Failed to persist tax rate");
            }
        }

        info!(old_rate = %old_rate, new_rate = %sanitized, "Tax rate changed");
        self.event_sender
            .send(Event::TaxRateUpdated {
                old_rate,
                new_rate: sanitized,
            })
            .await;
        sanitized
    }
}

fn read_rate_file(path: &std::path::Path) -> Option<Decimal> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<TaxConfigFile>(&contents) {
        Ok(file) => Some(file.tax_rate),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable tax config file");
            None
        }
    }
}

/// Clamps a rate into `[0, 1]` and normalizes trailing zeros.
fn sanitize(rate: Decimal) -> Decimal {
    if rate < Decimal::ZERO {
        return Decimal::ZERO;
    }
    if rate > Decimal::ONE {
        return Decimal::ONE;
    }
    rate.normalize()
}
