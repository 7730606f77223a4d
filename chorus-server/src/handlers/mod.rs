mod call;
mod chat;
mod command_error;
mod dispatch;
mod history;
mod members;
mod promote;

pub use command_error::CommandError;
pub use dispatch::{Session, dispatch};
pub use history::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT, clamp_limit};
