//! AI-backed support features: journal emotion analysis and chat replies.
//!
//! Both entry points are infallible. Model failures are logged and counted,
//! then replaced by fixed fallback content so a student always gets a
//! supportive answer.

pub mod chat;
pub mod emotion;

use std::sync::Arc;

use crate::openai::CompletionModel;

pub use chat::FALLBACK_REPLIES;

#[derive(Clone)]
pub struct Assistant {
    model: Arc<dyn CompletionModel>,
}

impl Assistant {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }
}
