// Crisis keyword detector

/// Phrases that suggest self-harm or suicidal ideation.
pub const CRISIS_KEYWORDS: &[&str] = &[
    "kill myself",
    "suicide",
    "end it all",
    "no point living",
    "worthless",
    "hopeless",
    "self-harm",
    "hurt myself",
    "give up",
    "can't go on",
    "want to die",
    "better off dead",
    "no way out",
    "everyone would be better without me",
];

/// Appended to chat replies whenever the user's message trips the detector.
pub const CRISIS_RESOURCES: &str = "\n\n🆘 I'm concerned about you. Please reach out for immediate support:\n\
• Crisis Text Line: Text HOME to 741741\n\
• National Suicide Prevention Lifeline: 988\n\
• Campus Counseling Center: Available 24/7\n\n\
You matter, and help is available. Please don't hesitate to reach out.";

/// Returns the first crisis keyword contained in `text`, ignoring case.
///
/// Matching is plain substring search, so a keyword embedded in a longer
/// word still counts ("hopelessly" matches "hopeless").
pub fn find_crisis_keyword(text: &str) -> Option<&'static str> {
    let text_lower = text.to_lowercase();
    CRISIS_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| text_lower.contains(&keyword.to_lowercase()))
}

/// Detect if text contains any crisis keyword.
pub fn detect_crisis(text: &str) -> bool {
    find_crisis_keyword(text).is_some()
}
