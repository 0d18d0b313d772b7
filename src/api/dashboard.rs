use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::storage_error_response;
use crate::models::{CheckIn, Exam};
use crate::storage::{SharedStorage, Storage, StorageError};

const RECENT_CHECK_INS: u64 = 7;
const DASHBOARD_EXAMS: usize = 3;
/// Reported when the user has never checked in.
const NEUTRAL_MOOD: i32 = 3;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub current_mood: i32,
    pub check_in_streak: usize,
    pub upcoming_exams_count: usize,
    /// Recent check-ins that carry an emotion analysis.
    pub insights: usize,
    pub unresolved_alerts: usize,
    pub recent_check_ins: Vec<CheckIn>,
    pub upcoming_exams: Vec<Exam>,
}

pub async fn build_stats(storage: &dyn Storage, user_id: i32) -> Result<DashboardStats, StorageError> {
    let recent_check_ins = storage.get_check_ins_by_user(user_id, RECENT_CHECK_INS).await?;
    let mut upcoming_exams = storage.get_upcoming_exams(user_id).await?;
    let alerts = storage.get_alerts_by_user(user_id).await?;

    let upcoming_exams_count = upcoming_exams.len();
    upcoming_exams.truncate(DASHBOARD_EXAMS);

    Ok(DashboardStats {
        current_mood: recent_check_ins.first().map(|c| c.mood).unwrap_or(NEUTRAL_MOOD),
        check_in_streak: recent_check_ins.len(),
        upcoming_exams_count,
        insights: recent_check_ins
            .iter()
            .filter(|c| c.emotion_analysis.is_some())
            .count(),
        unresolved_alerts: alerts.iter().filter(|a| !a.resolved).count(),
        recent_check_ins,
        upcoming_exams,
    })
}

pub async fn get_stats(
    Extension(storage): Extension<SharedStorage>,
    Extension(user_id): Extension<i32>,
) -> Response {
    match build_stats(storage.as_ref(), user_id).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => storage_error_response("dashboard_stats", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlertKind, NewAlert, NewCheckIn, NewExam};
    use crate::storage::{MemStorage, DEMO_USER_ID};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_empty_dashboard_defaults() {
        let storage = MemStorage::new();
        let stats = build_stats(&storage, DEMO_USER_ID).await.unwrap();
        assert_eq!(stats.current_mood, NEUTRAL_MOOD);
        assert_eq!(stats.check_in_streak, 0);
        assert_eq!(stats.upcoming_exams_count, 0);
        assert_eq!(stats.unresolved_alerts, 0);
    }

    #[tokio::test]
    async fn test_dashboard_aggregates() {
        let storage = MemStorage::new();
        for mood in [2, 4] {
            storage
                .create_check_in(NewCheckIn {
                    user_id: DEMO_USER_ID,
                    mood,
                    stress_level: 6,
                    journal_entry: None,
                })
                .await
                .unwrap();
        }
        for day in 1..=4 {
            storage
                .create_exam(NewExam {
                    user_id: DEMO_USER_ID,
                    name: format!("Exam {}", day),
                    subject: "History".to_string(),
                    date: Utc::now() + Duration::days(day),
                })
                .await
                .unwrap();
        }
        let alert = storage
            .create_alert(NewAlert {
                user_id: DEMO_USER_ID,
                kind: AlertKind::Warning,
                message: "check in with a counselor".to_string(),
            })
            .await
            .unwrap();
        storage
            .create_alert(NewAlert {
                user_id: DEMO_USER_ID,
                kind: AlertKind::Info,
                message: "streak".to_string(),
            })
            .await
            .unwrap();
        storage.resolve_alert(alert.id).await.unwrap();

        let stats = build_stats(&storage, DEMO_USER_ID).await.unwrap();
        assert_eq!(stats.current_mood, 4);
        assert_eq!(stats.check_in_streak, 2);
        assert_eq!(stats.upcoming_exams_count, 4);
        assert_eq!(stats.upcoming_exams.len(), DASHBOARD_EXAMS);
        assert_eq!(stats.unresolved_alerts, 1);
        assert_eq!(stats.insights, 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["currentMood"], 4);
        assert!(json["recentCheckIns"].is_array());
    }
}
