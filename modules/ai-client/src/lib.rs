pub mod error;
pub mod message;
pub mod openai;
pub mod perplexity;
pub mod util;

pub use error::{AiError, Result};
pub use message::{Completion, Message, MessageRole};
pub use openai::{OpenAi, DEFAULT_TIMEOUT};
pub use perplexity::Perplexity;
pub use util::image_data_url;
