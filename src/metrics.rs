use crate::storage::Storage;

/// Seeds gauges that are otherwise only incremented, so restarts don't read as zero users.
pub async fn init_metrics(storage: &dyn Storage) {
    match storage.count_users().await {
        Ok(user_count) => {
            metrics::gauge!("mindease_users_total").set(user_count as f64);
            tracing::info!("Initialized metrics: Users={}", user_count);
        }
        Err(e) => tracing::error!("Failed to count users for metrics: {}", e),
    }
}

pub fn increment_users() {
    metrics::counter!("mindease_users_registered_total").increment(1);
    metrics::gauge!("mindease_users_total").increment(1.0);
}

pub fn increment_check_ins(analyzed: bool) {
    metrics::counter!("mindease_check_ins_total", "analyzed" => analyzed.to_string()).increment(1);
}

pub fn increment_crisis_alerts() {
    metrics::counter!("mindease_crisis_alerts_total").increment(1);
}

pub fn increment_chat_turns() {
    metrics::counter!("mindease_chat_turns_total").increment(1);
}

pub fn increment_ai_fallbacks(adapter: &str) {
    metrics::counter!("mindease_ai_fallbacks_total", "adapter" => adapter.to_string()).increment(1);
}

pub fn record_model_latency(adapter: &str, seconds: f64) {
    metrics::histogram!("mindease_model_request_duration_seconds", "adapter" => adapter.to_string())
        .record(seconds);
}
