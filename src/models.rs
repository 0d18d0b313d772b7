use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// argon2 PHC string; `None` for accounts that cannot log in.
    #[serde(skip)]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: i32,
    pub user_id: i32,
    pub mood: i32,
    pub stress_level: i32,
    pub journal_entry: Option<String>,
    pub emotion_analysis: Option<EmotionAnalysis>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCheckIn {
    pub user_id: i32,
    pub mood: i32,
    pub stress_level: i32,
    pub journal_entry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i32,
    pub user_id: i32,
    pub message: String,
    pub is_bot: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub user_id: i32,
    pub message: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub subject: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct NewExam {
    pub user_id: i32,
    pub name: String,
    pub subject: String,
    pub date: DateTime<Utc>,
}

/// Partial update applied by `Storage::update_exam`; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExamUpdate {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
}

impl ExamUpdate {
    pub fn apply(self, exam: &mut Exam) {
        if let Some(name) = self.name {
            exam.name = name;
        }
        if let Some(subject) = self.subject {
            exam.subject = subject;
        }
        if let Some(date) = self.date {
            exam.date = date;
        }
        if let Some(completed) = self.completed {
            exam.completed = completed;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Crisis,
    Warning,
    Info,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Crisis => "crisis",
            AlertKind::Warning => "warning",
            AlertKind::Info => "info",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crisis" => Ok(AlertKind::Crisis),
            "warning" => Ok(AlertKind::Warning),
            "info" => Ok(AlertKind::Info),
            other => Err(format!("unknown alert type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub resolved: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub user_id: i32,
    pub kind: AlertKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Lenient parse of a model-supplied label; anything unrecognised is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedPhrase {
    pub text: String,
    pub emotion: String,
    pub intensity: f64,
}

/// Emotional scoring of a single journal entry.
///
/// Scores and `confidence` always lie in `[0, 1]` and `recommendations` is
/// never empty. `crisis_indicators` is true whenever the local keyword scan
/// fired, whatever the model claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub anxiety: f64,
    pub stress: f64,
    pub depression: f64,
    pub determination: f64,
    pub overall_sentiment: Sentiment,
    pub confidence: f64,
    pub highlighted_phrases: Vec<HighlightedPhrase>,
    pub crisis_indicators: bool,
    pub recommendations: Vec<String>,
}
