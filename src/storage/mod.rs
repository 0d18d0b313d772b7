//! Record store for users, check-ins, chat history, exams and alerts.

pub mod database;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{
    Alert, ChatMessage, CheckIn, EmotionAnalysis, Exam, ExamUpdate, NewAlert, NewChatMessage,
    NewCheckIn, NewExam, NewUser, User,
};

pub use database::DbStorage;
pub use memory::MemStorage;

/// The account every request falls back to when no session cookie is present.
pub const DEMO_USER_ID: i32 = 1;

pub fn demo_user() -> NewUser {
    NewUser {
        name: "Alex".to_string(),
        email: "alex@example.com".to_string(),
        password_hash: None,
    }
}

pub const DEFAULT_CHAT_LIMIT: u64 = 50;
pub const UPCOMING_EXAMS_LIMIT: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("email {0} is already registered")]
    DuplicateEmail(String),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("malformed stored record: {0}")]
    Malformed(String),
}

pub type SharedStorage = Arc<dyn Storage>;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn count_users(&self) -> Result<u64, StorageError>;
    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn get_check_in(&self, id: i32) -> Result<Option<CheckIn>, StorageError>;
    /// Newest first, at most `limit`.
    async fn get_check_ins_by_user(&self, user_id: i32, limit: u64)
        -> Result<Vec<CheckIn>, StorageError>;
    /// Stores the check-in without analysis; attach it later with
    /// [`Storage::update_check_in_analysis`].
    async fn create_check_in(&self, check_in: NewCheckIn) -> Result<CheckIn, StorageError>;
    async fn update_check_in_analysis(
        &self,
        id: i32,
        analysis: EmotionAnalysis,
    ) -> Result<CheckIn, StorageError>;

    /// The most recent `limit` messages, oldest first.
    async fn get_chat_messages(&self, user_id: i32, limit: u64)
        -> Result<Vec<ChatMessage>, StorageError>;
    async fn create_chat_message(&self, message: NewChatMessage)
        -> Result<ChatMessage, StorageError>;

    async fn get_exams_by_user(&self, user_id: i32) -> Result<Vec<Exam>, StorageError>;
    /// Future, not yet completed exams, soonest first, at most five.
    async fn get_upcoming_exams(&self, user_id: i32) -> Result<Vec<Exam>, StorageError>;
    async fn create_exam(&self, exam: NewExam) -> Result<Exam, StorageError>;
    async fn update_exam(&self, id: i32, update: ExamUpdate) -> Result<Exam, StorageError>;

    /// Newest first.
    async fn get_alerts_by_user(&self, user_id: i32) -> Result<Vec<Alert>, StorageError>;
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StorageError>;
    async fn resolve_alert(&self, id: i32) -> Result<Alert, StorageError>;
}

/// Blank journal text is stored as no journal at all.
pub(crate) fn normalize_journal(entry: Option<String>) -> Option<String> {
    entry.filter(|text| !text.trim().is_empty())
}
