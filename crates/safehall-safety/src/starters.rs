//! Positive message openers offered to students.

const STARTERS: [&str; 10] = [
    "Can you please explain...",
    "I have a question about...",
    "Could you help me understand...",
    "I'm having trouble with...",
    "Thank you for your help with...",
    "I would like to know more about...",
    "Can we schedule time to discuss...",
    "I appreciate your feedback on...",
    "Could you clarify...",
    "I'm excited to learn about...",
];

/// Suggested openers for a new message.
pub fn conversation_starters() -> &'static [&'static str] {
    &STARTERS
}
