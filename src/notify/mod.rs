// Outbound notification channel
pub mod discord;
pub mod plan;

pub use discord::DiscordNotifier;
pub use plan::{PlanParams, TradePlan};
