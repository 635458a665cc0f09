//! labcast-broadcast – Broadcast-Kanal zwischen Leser und Anzeigen
//!
//! ## Architektur
//!
//! ```text
//! IdentitySource (Kartenleser, stdin, ...)
//!     |  abfragen() -> Option<UID>
//!     v
//! EventPublisher (Polling-Loop, festes Intervall)
//!     |
//!     v
//! EventBroadcaster (DashMap: SubscriberId -> Send-Queue)
//!     |
//!     +-- AbonnentVerbindung (pro WebSocket ein lokaler Task)
//!     +-- AbonnentVerbindung
//!     +-- ...
//!
//! BroadcastServer – TCP/TLS-Listener, nimmt Abonnenten an
//! ```
//!
//! Zustellung ist fire-and-forget: keine Bestaetigung, kein Replay. Wer sich
//! spaeter verbindet, sieht fruehere Events nicht.

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod publisher;
pub mod server;
pub mod tls;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::AbonnentVerbindung;
pub use error::{BroadcastError, BroadcastResult};
pub use publisher::{EventPublisher, IdentitySource, KanalQuelle, NullQuelle, PublisherOptionen};
pub use server::{BroadcastServer, EndpunktOptionen};
pub use tls::tls_acceptor_laden;
