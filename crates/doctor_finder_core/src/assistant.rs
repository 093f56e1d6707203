//! crates/doctor_finder_core/src/assistant.rs
//!
//! Conversation helpers for the symptom assistant: how much history goes to
//! the model, the canned replies, and mapping a reply to a specialty.

use crate::domain::ChatMessage;

/// Number of earlier messages forwarded to the model with each question.
pub const CONTEXT_WINDOW: usize = 10;

pub const NOT_CONFIGURED_REPLY: &str = "AI service not configured. Please contact the administrator. Meanwhile, I recommend consulting a doctor directly for your health concerns.";

pub const FAILURE_REPLY: &str = "I apologize, but I'm having trouble processing your request right now. Please try again or consult a doctor directly for your health concerns.";

pub const EMPTY_REPLY: &str = "I couldn't generate a response. Please try again.";

pub const SPECIALTIES: [&str; 12] = [
    "General Physician",
    "Cardiologist",
    "Dermatologist",
    "Pediatrician",
    "Orthopedic",
    "Neurologist",
    "Gynecologist",
    "ENT Specialist",
    "Ophthalmologist",
    "Psychiatrist",
    "Dentist",
    "Urologist",
];

/// The trailing slice of `history` that is sent along as context.
pub fn context_window(history: &[ChatMessage]) -> &[ChatMessage] {
    let start = history.len().saturating_sub(CONTEXT_WINDOW);
    &history[start..]
}

/// The known specialty mentioned earliest in `reply`, if any.
pub fn suggest_specialty(reply: &str) -> Option<&'static str> {
    let haystack = reply.to_lowercase();
    SPECIALTIES
        .iter()
        .filter_map(|s| haystack.find(&s.to_lowercase()).map(|pos| (pos, *s)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, s)| s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatRole;

    fn turns(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| ChatMessage {
                role: if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant },
                content: format!("message {i}"),
            })
            .collect()
    }

    #[test]
    fn short_history_is_sent_whole() {
        assert_eq!(context_window(&turns(3)).len(), 3);
        assert!(context_window(&[]).is_empty());
    }

    #[test]
    fn long_history_keeps_the_last_ten() {
        let history = turns(14);
        let window = context_window(&history);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "message 4");
        assert_eq!(window[9].content, "message 13");
    }

    #[test]
    fn specialty_is_picked_from_reply() {
        assert_eq!(
            suggest_specialty("Chest tightness can be serious. Please see a cardiologist soon."),
            Some("Cardiologist")
        );
        assert_eq!(
            suggest_specialty("See an ENT specialist, or a General Physician first."),
            Some("ENT Specialist")
        );
        assert_eq!(suggest_specialty("I can only assist with medical questions."), None);
    }
}
