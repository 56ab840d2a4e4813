//! Domain models for push-notification processing

mod cursor;
mod email;
mod message;
mod notification;

pub use cursor::{CursorRecord, HistoryId};
pub use email::ExtractedEmail;
pub use message::{Header, Message, MessageId, MessagePart};
pub use notification::Notification;
