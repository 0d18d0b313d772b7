use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use tracing::info;

use super::{demo_user, normalize_journal, Storage, StorageError, UPCOMING_EXAMS_LIMIT};
use crate::entities::{alert, chat_message, check_in, exam, user, Alerts, ChatMessages, CheckIns, Exams, Users};
use crate::models::{
    Alert, ChatMessage, CheckIn, EmotionAnalysis, Exam, ExamUpdate, NewAlert, NewChatMessage,
    NewCheckIn, NewExam, NewUser, User,
};

/// Postgres-backed store. Expects the schema from `crate::migrator` to be applied.
pub struct DbStorage {
    db: DatabaseConnection,
}

impl DbStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Makes sure the demo account exists and returns it.
    pub async fn seed_demo_user(&self) -> Result<User, StorageError> {
        let demo = demo_user();
        if let Some(existing) = self.get_user_by_email(&demo.email).await? {
            return Ok(existing);
        }
        let created = self.create_user(demo).await?;
        info!("Seeded demo user {} (id={})", created.email, created.id);
        Ok(created)
    }
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            created_at: model.created_at,
            password_hash: model.password_hash,
        }
    }
}

/// Postgres reports a taken email as a unique-constraint violation (23505).
fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || e.to_string().contains("duplicate key value violates unique constraint")
}

impl TryFrom<check_in::Model> for CheckIn {
    type Error = StorageError;

    fn try_from(model: check_in::Model) -> Result<Self, Self::Error> {
        let emotion_analysis = model
            .emotion_analysis
            .map(serde_json::from_value::<EmotionAnalysis>)
            .transpose()
            .map_err(|e| StorageError::Malformed(format!("check-in {}: {}", model.id, e)))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            mood: model.mood,
            stress_level: model.stress_level,
            journal_entry: model.journal_entry,
            emotion_analysis,
            timestamp: model.created_at,
        })
    }
}

impl From<chat_message::Model> for ChatMessage {
    fn from(model: chat_message::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            message: model.message,
            is_bot: model.is_bot,
            timestamp: model.created_at,
        }
    }
}

impl From<exam::Model> for Exam {
    fn from(model: exam::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            subject: model.subject,
            date: model.date,
            completed: model.completed,
        }
    }
}

impl TryFrom<alert::Model> for Alert {
    type Error = StorageError;

    fn try_from(model: alert::Model) -> Result<Self, Self::Error> {
        let kind = model
            .alert_type
            .parse()
            .map_err(|e| StorageError::Malformed(format!("alert {}: {}", model.id, e)))?;
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind,
            message: model.message,
            resolved: model.resolved,
            timestamp: model.created_at,
        })
    }
}

fn convert_all<M, T>(models: Vec<M>) -> Result<Vec<T>, StorageError>
where
    T: TryFrom<M, Error = StorageError>,
{
    models.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl Storage for DbStorage {
    async fn count_users(&self) -> Result<u64, StorageError> {
        Ok(Users::find().count(&self.db).await?)
    }

    async fn get_user(&self, id: i32) -> Result<Option<User>, StorageError> {
        Ok(Users::find_by_id(id).one(&self.db).await?.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(Users::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(User::from))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StorageError> {
        if self.get_user_by_email(&new_user.email).await?.is_some() {
            return Err(StorageError::DuplicateEmail(new_user.email));
        }
        let email = new_user.email.clone();
        let model = user::ActiveModel {
            name: Set(new_user.name),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        // A concurrent registration can still win the race past the lookup above.
        match model.insert(&self.db).await {
            Ok(created) => Ok(created.into()),
            Err(e) if is_unique_violation(&e) => Err(StorageError::DuplicateEmail(email)),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_check_in(&self, id: i32) -> Result<Option<CheckIn>, StorageError> {
        CheckIns::find_by_id(id)
            .one(&self.db)
            .await?
            .map(CheckIn::try_from)
            .transpose()
    }

    async fn get_check_ins_by_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<CheckIn>, StorageError> {
        let models = CheckIns::find()
            .filter(check_in::Column::UserId.eq(user_id))
            .order_by_desc(check_in::Column::CreatedAt)
            .order_by_desc(check_in::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        convert_all(models)
    }

    async fn create_check_in(&self, new_check_in: NewCheckIn) -> Result<CheckIn, StorageError> {
        let model = check_in::ActiveModel {
            user_id: Set(new_check_in.user_id),
            mood: Set(new_check_in.mood),
            stress_level: Set(new_check_in.stress_level),
            journal_entry: Set(normalize_journal(new_check_in.journal_entry)),
            emotion_analysis: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        model.insert(&self.db).await?.try_into()
    }

    async fn update_check_in_analysis(
        &self,
        id: i32,
        analysis: EmotionAnalysis,
    ) -> Result<CheckIn, StorageError> {
        let existing = CheckIns::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound("Check-in"))?;
        let json = serde_json::to_value(&analysis)
            .map_err(|e| StorageError::Malformed(e.to_string()))?;

        let mut active = existing.into_active_model();
        active.emotion_analysis = Set(Some(json));
        active.update(&self.db).await?.try_into()
    }

    async fn get_chat_messages(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        // Newest `limit` rows, flipped back into conversation order.
        let mut messages: Vec<ChatMessage> = ChatMessages::find()
            .filter(chat_message::Column::UserId.eq(user_id))
            .order_by_desc(chat_message::Column::CreatedAt)
            .order_by_desc(chat_message::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ChatMessage::from)
            .collect();
        messages.reverse();
        Ok(messages)
    }

    async fn create_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StorageError> {
        let model = chat_message::ActiveModel {
            user_id: Set(message.user_id),
            message: Set(message.message),
            is_bot: Set(message.is_bot),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn get_exams_by_user(&self, user_id: i32) -> Result<Vec<Exam>, StorageError> {
        Ok(Exams::find()
            .filter(exam::Column::UserId.eq(user_id))
            .order_by_asc(exam::Column::Date)
            .order_by_asc(exam::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Exam::from)
            .collect())
    }

    async fn get_upcoming_exams(&self, user_id: i32) -> Result<Vec<Exam>, StorageError> {
        Ok(Exams::find()
            .filter(exam::Column::UserId.eq(user_id))
            .filter(exam::Column::Date.gt(Utc::now()))
            .filter(exam::Column::Completed.eq(false))
            .order_by_asc(exam::Column::Date)
            .order_by_asc(exam::Column::Id)
            .limit(UPCOMING_EXAMS_LIMIT)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Exam::from)
            .collect())
    }

    async fn create_exam(&self, new_exam: NewExam) -> Result<Exam, StorageError> {
        let model = exam::ActiveModel {
            user_id: Set(new_exam.user_id),
            name: Set(new_exam.name),
            subject: Set(new_exam.subject),
            date: Set(new_exam.date),
            completed: Set(false),
            ..Default::default()
        };
        Ok(model.insert(&self.db).await?.into())
    }

    async fn update_exam(&self, id: i32, update: ExamUpdate) -> Result<Exam, StorageError> {
        let existing = Exams::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound("Exam"))?;

        let mut active = existing.into_active_model();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(subject) = update.subject {
            active.subject = Set(subject);
        }
        if let Some(date) = update.date {
            active.date = Set(date);
        }
        if let Some(completed) = update.completed {
            active.completed = Set(completed);
        }
        Ok(active.update(&self.db).await?.into())
    }

    async fn get_alerts_by_user(&self, user_id: i32) -> Result<Vec<Alert>, StorageError> {
        let models = Alerts::find()
            .filter(alert::Column::UserId.eq(user_id))
            .order_by_desc(alert::Column::CreatedAt)
            .order_by_desc(alert::Column::Id)
            .all(&self.db)
            .await?;
        convert_all(models)
    }

    async fn create_alert(&self, new_alert: NewAlert) -> Result<Alert, StorageError> {
        let model = alert::ActiveModel {
            user_id: Set(new_alert.user_id),
            alert_type: Set(new_alert.kind.to_string()),
            message: Set(new_alert.message),
            resolved: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        model.insert(&self.db).await?.try_into()
    }

    async fn resolve_alert(&self, id: i32) -> Result<Alert, StorageError> {
        let existing = Alerts::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StorageError::NotFound("Alert"))?;

        let mut active = existing.into_active_model();
        active.resolved = Set(true);
        active.update(&self.db).await?.try_into()
    }
}
