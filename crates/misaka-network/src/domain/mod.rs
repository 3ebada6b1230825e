//! Domain Layer - Pure telepath rules
//!
//! This layer contains:
//! - Telepath naming and the stream provisioning policy
//! - Telepath retention configuration
//! - Subject routing by authority level
//! - Acknowledgment policy and the ack decision
//! - Durable consumer specification and lifecycle
//!
//! RULES:
//! - No I/O operations
//! - No async code

pub mod ack;
pub mod config;
pub mod consumer;
pub mod routing;
pub mod stream;
pub mod telepath;

pub use ack::{ack_action, AckAction, AckPolicy, HandlingOutcome};
pub use config::{TelepathConfig, TelepathConfigBuilder};
pub use consumer::{ConsumerSpec, ConsumerState, SubscribeOptions};
pub use routing::{
    parse_authority, resolve_publish_subject, resolve_subscribe_pattern, subject_matches,
    subjects_overlap,
};
pub use stream::{DiscardPolicy, RetentionPolicy, StorageClass, StreamSpec};
pub use telepath::TelepathName;
