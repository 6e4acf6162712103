//! Long-running and one-shot services for maillink.
//!
//! - [`forward`] -- one forward cycle: select, extract, deliver, mark read
//! - [`lookup`] -- on-demand "latest link from today" used by the bot
//! - [`bot`] -- the command loop answering `/link` and `/start`
//! - [`scheduler`] -- repeats the forward cycle at a fixed interval
//! - [`state_store`] -- durable `{"last_uid": N}` record

pub mod bot;
pub mod error;
pub mod forward;
pub mod lookup;
pub mod scheduler;
pub mod state_store;

pub use bot::{BotCommand, BotLoop};
pub use error::{Result, ServiceError};
pub use forward::{ForwardCycle, ForwardReport};
pub use lookup::{LinkFinder, LinkLookup};
pub use scheduler::Scheduler;
pub use state_store::StateStore;

/// Local calendar date, used as the "today" bound of every search.
pub fn local_today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
