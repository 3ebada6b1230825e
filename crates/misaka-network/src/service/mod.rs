//! Service Layer
//!
//! `MisakaNetwork` owns the broker connection and implements the telepath
//! API. Each subscription runs its own `DeliveryDispatcher` task.

pub mod dispatcher;
pub mod network;
pub mod subscription;

pub use dispatcher::{DeliveryDispatcher, DispatchOutcome};
pub use network::MisakaNetwork;
pub use subscription::{DeliveryStats, DeliveryStatsSnapshot, SubscriptionHandle};
