// Device API protocol: framing, commands, replies, login, and the client that ties them together.

pub mod auth;
pub mod codec;
pub mod command;
mod client;
mod reply;

pub use client::DeviceClient;
pub use command::Command;
pub use reply::{Progress, Record, ReplyParser};
