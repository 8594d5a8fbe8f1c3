//! Client-side synchronization of a todo list whose authoritative copy lives in
//! a remote logic.
//!
//! [`gateway::RemoteListGateway`] wraps the three remote operations;
//! [`controller::ListSyncController`] owns the session snapshot and the busy
//! flags the presentation layer renders from.

pub mod config;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod transport;

pub use config::{load_settings, ClientSettings};
pub use controller::{Item, ListSyncController, SyncEvent, SyncPhase, SyncState};
pub use error::{Operation, RemoteError, SyncError};
pub use gateway::{Ack, AckPolicy, LogicGateway, MissingListGateway, PendingWrite, RemoteListGateway};
pub use shared::domain::{FuelParams, ItemId, TodoRecord};
pub use transport::{HttpLogicTransport, LogicTransport};
