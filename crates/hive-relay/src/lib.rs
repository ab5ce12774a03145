//! The sector event relay.
//!
//! Game servers ("sectors") connect one socket each and stream faction and
//! lifecycle events. This crate turns those events into store writes and
//! decides who hears about them:
//!
//! - [`dispatch`]: decode an envelope, run the faction state engine,
//!   persist the touched rows, produce a [`RoutingPlan`].
//! - [`translate`]: rewrite faction ids into each destination's aliases.
//! - [`hub`]: the single task that owns every live connection and delivers
//!   routing plans to their outbound queues.
//! - [`presence`]: the ordered writer that records sector lifecycle states.

pub mod dispatch;
pub mod error;
pub mod hub;
pub mod presence;
pub mod routing;
pub mod translate;

pub use dispatch::Dispatcher;
pub use error::{DispatchError, HubClosed};
pub use hub::{ConnectionId, Hub, HubCommand, HubConfig, HubHandle, Registration};
pub use presence::{
    PresenceChange, PresenceReceiver, PresenceSender, presence_channel, run_presence_writer,
    spawn_presence_writer,
};
pub use routing::{Affinity, RoutingPlan};
