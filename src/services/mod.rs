pub mod delivery;
pub mod telegram;

pub use delivery::{ConsoleDelivery, Delivery, DeliveryError};
pub use telegram::TelegramClient;
