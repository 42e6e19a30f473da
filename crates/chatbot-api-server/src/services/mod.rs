pub mod content;
pub mod faq;
pub mod pipeline;
pub mod provider;
pub mod scheduler;
pub mod session;

pub use content::{ContentRetriever, StaticContentSource};
pub use faq::FaqMatcher;
pub use pipeline::MessagePipeline;
pub use provider::ProviderGateway;
pub use scheduler::BackgroundJobs;
pub use session::SessionStore;
