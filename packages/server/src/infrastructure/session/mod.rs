//! Session and presence bookkeeping.

mod presence;
mod table;

pub use presence::PresenceTable;
pub use table::{Recipient, SessionTable};
