pub mod db;
pub mod gemini_llm;
pub mod google_identity;

pub use db::DbAdapter;
pub use gemini_llm::GeminiAdapter;
pub use google_identity::GoogleTokenInfoAdapter;
