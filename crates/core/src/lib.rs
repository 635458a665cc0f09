//! labcast-core – Gemeinsame Typen und Nutzlast-Kodierung
//!
//! Dieses Crate stellt die Bausteine bereit, die Broadcast-Endpunkt,
//! Publisher, Reconnecting-Client und Zustandsspeicher gemeinsam nutzen.

pub mod event;
pub mod steuerung;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use event::{Nutzlast, NutzlastFormat, TapEvent};
pub use steuerung::Steuerbefehl;
pub use types::{DeviceId, SubscriberId, VenueId};
