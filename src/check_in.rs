use std::ops::RangeInclusive;
use tracing::{info, warn};

use crate::assistant::Assistant;
use crate::models::{AlertKind, CheckIn, NewAlert, NewCheckIn};
use crate::storage::{Storage, StorageError};

pub const MOOD_RANGE: RangeInclusive<i32> = 1..=5;
pub const STRESS_RANGE: RangeInclusive<i32> = 1..=10;

pub const CRISIS_ALERT_MESSAGE: &str =
    "Crisis indicators detected in journal entry. Immediate support recommended.";

pub fn validate_check_in(mood: i32, stress_level: i32) -> Result<(), String> {
    if !MOOD_RANGE.contains(&mood) {
        return Err(format!("mood must be between 1 and 5, got {}", mood));
    }
    if !STRESS_RANGE.contains(&stress_level) {
        return Err(format!("stressLevel must be between 1 and 10, got {}", stress_level));
    }
    Ok(())
}

/// Records a check-in, then analyzes its journal entry.
///
/// The row is written before the model is consulted, so an interrupted
/// analysis leaves a check-in without `emotion_analysis` rather than losing
/// the mood and stress values. A crisis verdict raises exactly one alert.
pub async fn submit_check_in(
    storage: &dyn Storage,
    assistant: &Assistant,
    new_check_in: NewCheckIn,
) -> Result<CheckIn, StorageError> {
    let check_in = storage.create_check_in(new_check_in).await?;
    info!("Check-in {} stored for user_id={}", check_in.id, check_in.user_id);

    let Some(journal) = check_in.journal_entry.as_deref() else {
        crate::metrics::increment_check_ins(false);
        return Ok(check_in);
    };

    let analysis = assistant.analyze_emotion(journal).await;
    let crisis = analysis.crisis_indicators;
    let check_in = storage.update_check_in_analysis(check_in.id, analysis).await?;
    crate::metrics::increment_check_ins(true);

    if crisis {
        let alert = storage
            .create_alert(NewAlert {
                user_id: check_in.user_id,
                kind: AlertKind::Crisis,
                message: CRISIS_ALERT_MESSAGE.to_string(),
            })
            .await?;
        crate::metrics::increment_crisis_alerts();
        warn!(
            "Crisis alert {} raised for user_id={} from check-in {}",
            alert.id, check_in.user_id, check_in.id
        );
    }

    Ok(check_in)
}
