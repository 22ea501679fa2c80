//! WhatsApp HTTP gateway integration.
//!
//! The dispatch loop only depends on the [`MessageSender`] trait:
//!
//! - `GatewayClient`: production sender (reqwest, Basic auth, JSON body)
//! - `MockSender`: scriptable sender for tests and dry runs

mod client;
pub mod mock;
mod types;

pub use client::{GatewayClient, MessageSender};
pub use mock::{MockReply, MockSender};
pub use types::{
    format_phone_number, GatewayApiResponse, GatewayConfig, GatewayError, GatewayResult,
    MessagePayload, ResponseCode, SendResponse, WHATSAPP_SUFFIX,
};
