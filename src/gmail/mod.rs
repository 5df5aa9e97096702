pub mod client;
pub mod decoders;
pub mod message;

pub use client::{GmailClient, MailApi};
pub use message::{Message, MessagePart, MessageRef};

#[cfg(test)]
pub(crate) mod fake;
