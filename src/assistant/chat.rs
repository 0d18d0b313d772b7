use rand::seq::SliceRandom;
use std::time::Instant;
use tracing::{info, warn};

use super::Assistant;
use crate::crisis::{find_crisis_keyword, CRISIS_RESOURCES};
use crate::openai::{CompletionRequest, PromptMessage};

const PERSONA_PROMPT: &str = "You are MindEase AI, a compassionate mental health support assistant for college students. Your role is to:

1. Respond with empathy and support, focusing on academic stress and college life
2. Offer practical coping strategies for exam anxiety, study stress and academic pressure
3. Suggest evidence-based techniques such as breathing exercises, time management and study strategies
4. Encourage healthy habits and self-care
5. Recognize when a student should be referred to professional help
6. Keep a warm, understanding tone that validates their feelings

Guidelines:
- Validate the student's feelings first
- Give specific, actionable advice that fits college life
- Include breathing exercises, study techniques or mindfulness practices when they help
- If you notice crisis language, gently encourage professional help while staying supportive
- Keep replies conversational and relatable
- Focus on academic stress, exam anxiety, social pressure and time management

Do not:
- Provide medical diagnoses or act as a replacement for professional therapy
- Give advice outside mental health support
- Ignore a potential crisis
- Sound clinical or robotic";

const CHAT_TEMPERATURE: f32 = 0.7;
const CHAT_MAX_TOKENS: u32 = 500;

/// Replies used when the model is unavailable; one is picked at random.
pub const FALLBACK_REPLIES: [&str; 3] = [
    "I'm here to listen and support you. While I'm having a technical issue right now, please know that what you're feeling is valid. If you're in crisis, please contact your campus counseling center or call 988.",
    "Thank you for sharing with me. Although I'm experiencing some technical difficulties, I want you to know that seeking support shows strength. Consider reaching out to a counselor or trusted friend.",
    "I appreciate you reaching out. While I'm having trouble responding fully right now, please remember that you're not alone in this. Your campus likely has counseling resources available 24/7.",
];

impl Assistant {
    /// Produces the bot's reply to `message`. Never fails.
    ///
    /// `user_id` is only used for logging. When the message contains crisis
    /// language the hotline block is appended, whether or not the model
    /// answered.
    pub async fn generate_chat_response(&self, message: &str, user_id: i32) -> String {
        let request = CompletionRequest {
            messages: vec![PromptMessage::system(PERSONA_PROMPT), PromptMessage::user(message)],
            temperature: CHAT_TEMPERATURE,
            max_tokens: Some(CHAT_MAX_TOKENS),
            json_output: false,
        };

        let started = Instant::now();
        let outcome = self.model.complete(&request).await;
        crate::metrics::record_model_latency("chat", started.elapsed().as_secs_f64());

        let mut reply = match outcome {
            Ok(text) => text,
            Err(e) => {
                warn!("Chat completion failed for user_id={}, using fallback: {}", user_id, e);
                crate::metrics::increment_ai_fallbacks("chat");
                fallback_reply().to_string()
            }
        };

        if let Some(keyword) = find_crisis_keyword(message) {
            info!(
                "Crisis keyword '{}' in chat message from user_id={}; appending resources",
                keyword, user_id
            );
            reply.push_str(CRISIS_RESOURCES);
        }

        reply
    }
}

fn fallback_reply() -> &'static str {
    FALLBACK_REPLIES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_REPLIES[0])
}
