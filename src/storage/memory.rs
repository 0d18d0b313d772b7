use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{
    demo_user, normalize_journal, Storage, StorageError, UPCOMING_EXAMS_LIMIT,
};
use crate::models::{
    Alert, ChatMessage, CheckIn, EmotionAnalysis, Exam, ExamUpdate, NewAlert, NewChatMessage,
    NewCheckIn, NewExam, NewUser, User,
};

/// One collection: records by id plus the next id to hand out.
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), next_id: 1 }
    }
}

impl<T> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i32) -> T) -> &T {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.entry(id).or_insert_with(|| build(id))
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    check_ins: Table<CheckIn>,
    chat_messages: Table<ChatMessage>,
    exams: Table<Exam>,
    alerts: Table<Alert>,
}

/// Process-local store. All collections share one lock so id counters and
/// maps change together.
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    /// Empty store seeded with the demo user.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        let NewUser { name, email, password_hash } = demo_user();
        tables.users.insert_with(|id| User {
            id,
            name,
            email,
            created_at: Utc::now(),
            password_hash,
        });
        Self { tables: RwLock::new(tables) }
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn take(limit: u64) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

#[async_trait]
impl Storage for MemStorage {
    async fn count_users(&self) -> Result<u64, StorageError> {
        Ok(self.tables.read().await.users.rows.len() as u64)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError> {
        Ok(self.tables.read().await.users.rows.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.rows.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.rows.values().any(|u| u.email == user.email) {
            return Err(StorageError::DuplicateEmail(user.email));
        }
        let NewUser { name, email, password_hash } = user;
        Ok(tables
            .users
            .insert_with(|id| User { id, name, email, created_at: Utc::now(), password_hash })
            .clone())
    }

    async fn get_check_in(&self, id: i32) -> Result<Option<CheckIn>, StorageError> {
        Ok(self.tables.read().await.check_ins.rows.get(&id).cloned())
    }

    async fn get_check_ins_by_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<CheckIn>, StorageError> {
        let tables = self.tables.read().await;
        let mut check_ins: Vec<CheckIn> = tables
            .check_ins
            .rows
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        check_ins.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        check_ins.truncate(take(limit));
        Ok(check_ins)
    }

    async fn create_check_in(&self, check_in: NewCheckIn) -> Result<CheckIn, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .check_ins
            .insert_with(|id| CheckIn {
                id,
                user_id: check_in.user_id,
                mood: check_in.mood,
                stress_level: check_in.stress_level,
                journal_entry: normalize_journal(check_in.journal_entry),
                emotion_analysis: None,
                timestamp: Utc::now(),
            })
            .clone())
    }

    async fn update_check_in_analysis(
        &self,
        id: i32,
        analysis: EmotionAnalysis,
    ) -> Result<CheckIn, StorageError> {
        let mut tables = self.tables.write().await;
        let check_in = tables
            .check_ins
            .rows
            .get_mut(&id)
            .ok_or(StorageError::NotFound("Check-in"))?;
        check_in.emotion_analysis = Some(analysis);
        Ok(check_in.clone())
    }

    async fn get_chat_messages(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let tables = self.tables.read().await;
        let mut messages: Vec<ChatMessage> = tables
            .chat_messages
            .rows
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        let skip = messages.len().saturating_sub(take(limit));
        Ok(messages.split_off(skip))
    }

    async fn create_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .chat_messages
            .insert_with(|id| ChatMessage {
                id,
                user_id: message.user_id,
                message: message.message,
                is_bot: message.is_bot,
                timestamp: Utc::now(),
            })
            .clone())
    }

    async fn get_exams_by_user(&self, user_id: i32) -> Result<Vec<Exam>, StorageError> {
        let tables = self.tables.read().await;
        let mut exams: Vec<Exam> = tables
            .exams
            .rows
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        exams.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(exams)
    }

    async fn get_upcoming_exams(&self, user_id: i32) -> Result<Vec<Exam>, StorageError> {
        let now = Utc::now();
        let mut exams = self.get_exams_by_user(user_id).await?;
        exams.retain(|e| e.date > now && !e.completed);
        exams.truncate(take(UPCOMING_EXAMS_LIMIT));
        Ok(exams)
    }

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .exams
            .insert_with(|id| Exam {
                id,
                user_id: exam.user_id,
                name: exam.name,
                subject: exam.subject,
                date: exam.date,
                completed: false,
            })
            .clone())
    }

    async fn update_exam(&self, id: i32, update: ExamUpdate) -> Result<Exam, StorageError> {
        let mut tables = self.tables.write().await;
        let exam = tables
            .exams
            .rows
            .get_mut(&id)
            .ok_or(StorageError::NotFound("Exam"))?;
        update.apply(exam);
        Ok(exam.clone())
    }

    async fn get_alerts_by_user(&self, user_id: i32) -> Result<Vec<Alert>, StorageError> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<Alert> = tables
            .alerts
            .rows
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(alerts)
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .alerts
            .insert_with(|id| Alert {
                id,
                user_id: alert.user_id,
                kind: alert.kind,
                message: alert.message,
                resolved: false,
                timestamp: Utc::now(),
            })
            .clone())
    }

    async fn resolve_alert(&self, id: i32) -> Result<Alert, StorageError> {
        let mut tables = self.tables.write().await;
        let alert = tables
            .alerts
            .rows
            .get_mut(&id)
            .ok_or(StorageError::NotFound("Alert"))?;
        alert.resolved = true;
        Ok(alert.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::emotion::fallback_analysis;
    use crate::models::AlertKind;
    use crate::storage::DEMO_USER_ID;
    use chrono::Duration;

    fn check_in(user_id: i32, mood: i32) -> NewCheckIn {
        NewCheckIn { user_id, mood, stress_level: 5, journal_entry: None }
    }

    fn exam(name: &str, days_from_now: i64) -> NewExam {
        NewExam {
            user_id: DEMO_USER_ID,
            name: name.to_string(),
            subject: "Biology".to_string(),
            date: Utc::now() + Duration::days(days_from_now),
        }
    }

    #[tokio::test]
    async fn test_demo_user_is_seeded() {
        let storage = MemStorage::new();
        let user = storage.get_user(DEMO_USER_ID).await.unwrap().unwrap();
        assert_eq!(user.name, "Alex");
        assert_eq!(storage.count_users().await.unwrap(), 1);
        assert_eq!(
            storage.get_user_by_email("alex@example.com").await.unwrap().map(|u| u.id),
            Some(DEMO_USER_ID)
        );
    }

    #[tokio::test]
    async fn test_create_user_assigns_ids_and_rejects_duplicates() {
        let storage = MemStorage::new();
        let sam = storage
            .create_user(NewUser {
                name: "Sam".to_string(),
                email: "sam@uni.edu".to_string(),
                password_hash: None,
            })
            .await
            .unwrap();
        assert_eq!(sam.id, 2);

        let err = storage
            .create_user(NewUser {
                name: "Other".to_string(),
                email: "sam@uni.edu".to_string(),
                password_hash: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_check_in_round_trip_and_analysis_attach() {
        let storage = MemStorage::new();
        let created = storage
            .create_check_in(NewCheckIn {
                user_id: DEMO_USER_ID,
                mood: 2,
                stress_level: 8,
                journal_entry: Some("so tired".to_string()),
            })
            .await
            .unwrap();

        let listed = storage.get_check_ins_by_user(DEMO_USER_ID, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].mood, 2);
        assert_eq!(listed[0].stress_level, 8);
        assert!(listed[0].emotion_analysis.is_none());

        let analysis = fallback_analysis(false);
        let updated = storage
            .update_check_in_analysis(created.id, analysis.clone())
            .await
            .unwrap();
        assert_eq!(updated.emotion_analysis.as_ref(), Some(&analysis));
        let fetched = storage.get_check_in(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.emotion_analysis, Some(analysis));
    }

    #[tokio::test]
    async fn test_blank_journal_is_stored_as_none() {
        let storage = MemStorage::new();
        let created = storage
            .create_check_in(NewCheckIn {
                journal_entry: Some("   ".to_string()),
                ..check_in(DEMO_USER_ID, 3)
            })
            .await
            .unwrap();
        assert!(created.journal_entry.is_none());
    }

    #[tokio::test]
    async fn test_check_ins_newest_first_and_limited() {
        let storage = MemStorage::new();
        for mood in 1..=5 {
            storage.create_check_in(check_in(DEMO_USER_ID, mood)).await.unwrap();
        }
        storage.create_check_in(check_in(99, 1)).await.unwrap();

        let recent = storage.get_check_ins_by_user(DEMO_USER_ID, 3).await.unwrap();
        let moods: Vec<i32> = recent.iter().map(|c| c.mood).collect();
        assert_eq!(moods, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_update_missing_check_in_is_not_found() {
        let storage = MemStorage::new();
        let err = storage
            .update_check_in_analysis(42, fallback_analysis(false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound("Check-in")));
    }

    #[tokio::test]
    async fn test_chat_messages_keep_last_n_in_order() {
        let storage = MemStorage::new();
        for i in 0..5 {
            storage
                .create_chat_message(NewChatMessage {
                    user_id: DEMO_USER_ID,
                    message: format!("message {}", i),
                    is_bot: i % 2 == 1,
                })
                .await
                .unwrap();
        }
        let messages = storage.get_chat_messages(DEMO_USER_ID, 3).await.unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["message 2", "message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_upcoming_exams_skip_past_and_completed() {
        let storage = MemStorage::new();
        storage.create_exam(exam("Past quiz", -2)).await.unwrap();
        let done = storage.create_exam(exam("Done lab", 3)).await.unwrap();
        for day in [9, 1, 4, 7, 2, 6] {
            storage.create_exam(exam(&format!("Exam in {}", day), day)).await.unwrap();
        }
        storage
            .update_exam(done.id, ExamUpdate { completed: Some(true), ..Default::default() })
            .await
            .unwrap();

        let upcoming = storage.get_upcoming_exams(DEMO_USER_ID).await.unwrap();
        let names: Vec<&str> = upcoming.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Exam in 1", "Exam in 2", "Exam in 4", "Exam in 6", "Exam in 7"]);

        let all = storage.get_exams_by_user(DEMO_USER_ID).await.unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all[0].name, "Past quiz");
    }

    #[tokio::test]
    async fn test_update_missing_exam_is_not_found() {
        let storage = MemStorage::new();
        let err = storage.update_exam(7, ExamUpdate::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound("Exam")));
    }

    #[tokio::test]
    async fn test_alerts_newest_first_and_resolve() {
        let storage = MemStorage::new();
        let first = storage
            .create_alert(NewAlert {
                user_id: DEMO_USER_ID,
                kind: AlertKind::Info,
                message: "first".to_string(),
            })
            .await
            .unwrap();
        storage
            .create_alert(NewAlert {
                user_id: DEMO_USER_ID,
                kind: AlertKind::Crisis,
                message: "second".to_string(),
            })
            .await
            .unwrap();

        let alerts = storage.get_alerts_by_user(DEMO_USER_ID).await.unwrap();
        assert_eq!(alerts[0].message, "second");
        assert!(alerts.iter().all(|a| !a.resolved));

        let resolved = storage.resolve_alert(first.id).await.unwrap();
        assert!(resolved.resolved);
        assert!(matches!(
            storage.resolve_alert(999).await.unwrap_err(),
            StorageError::NotFound("Alert")
        ));
    }
}
