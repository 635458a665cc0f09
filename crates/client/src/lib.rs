//! labcast-client – Selbst-wiederverbindender Abonnent
//!
//! Haelt eine logische Verbindung zu einem Broadcast-Endpunkt aufrecht,
//! auch wenn der Transport wiederholt abbricht. Netzwerk-I/O laeuft auf
//! einem eigenen OS-Thread mit eigener current-thread Runtime; der Host
//! bekommt Nachrichten und Zustandswechsel ueber eine thread-sichere Queue.
//!
//! ```text
//!            starten()
//! Getrennt ------------> Verbindend --Handshake ok--> Verbunden
//!    ^                       ^                            |
//!    |                       +--- Wartezeit (fest) <------+ Fehler / Close
//!    +------------------------- stoppen() ----------------+
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod tls;
pub mod types;

pub use config::ClientKonfig;
pub use connection::ReconnectingClient;
pub use error::{ClientError, ClientResult};
pub use types::{ClientEreignis, ClientZustand};
