pub mod assistant_llm;
pub mod db;
pub mod email;
pub mod sms;

pub use assistant_llm::{OpenAiAssistantAdapter, UnconfiguredAssistant};
pub use db::DbAdapter;
pub use email::EmailRelayAdapter;
pub use sms::TwilioSmsAdapter;
