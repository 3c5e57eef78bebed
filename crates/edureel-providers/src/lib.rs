//! Clients for the hosted services EduReel depends on.
//!
//! Each service sits behind a small async trait so the orchestrator can be
//! exercised with in-process stand-ins:
//!
//! - [`ChatModel`] drafts scene code, narration and quiz questions
//! - [`ImageGenerator`] produces still images for slideshow lessons
//! - [`SpeechSynthesizer`] turns narration text into mp3 audio
//! - [`MediaHost`] publishes finished videos and returns a public URL
//!
//! The concrete implementations talk to OpenAI and Cloudinary.

pub mod cdn;
pub mod chat;
pub mod credentials;
pub mod error;
mod http;
pub mod image;
pub mod speech;

pub use cdn::{CloudinaryClient, MediaHost, ResourceKind};
pub use chat::{ChatMessage, ChatModel, MessageRole, OpenAiChat};
pub use credentials::Credentials;
pub use error::{ProviderError, ProviderErrorKind, Result};
pub use image::{ImageGenerator, OpenAiImages};
pub use speech::{OpenAiSpeech, SpeechSynthesizer};
