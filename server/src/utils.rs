use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Limit a player supplied name to printable ASCII for the scoreboard
pub fn clean_name(name: Option<&str>, max_len: usize) -> String {
    match name {
        Some(name) => name
            .chars()
            .take(max_len)
            .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_punctuation() || *c == ' ')
            .collect(),
        None => "NONE".to_string(),
    }
}
