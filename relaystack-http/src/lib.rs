//! Gateway HTTP bridge for RelayStack
//!
//! Translates API Gateway proxy events (payload format 1.0 and 2.0) into
//! `http::Request`s for a long-lived [`Application`], and the application's
//! response back into the gateway's response document.

pub mod application;
pub mod bridge;
pub mod encoding;
pub mod gateway;

pub use application::{Application, ApplicationFactory, ApplicationRegistry, ServiceApplication};
pub use bridge::{bridge, BridgeError, GatewayRequestContext};
pub use encoding::EncodingError;
pub use gateway::{GatewayEvent, GatewayEventError, PayloadFormat};
