use crate::models::EventCategory;

const WORK_KEYWORDS: [&str; 9] = [
    "meeting",
    "project",
    "client",
    "work",
    "office",
    "business",
    "deadline",
    "presentation",
    "conference",
];

const PERSONAL_KEYWORDS: [&str; 9] = [
    "birthday",
    "family",
    "friend",
    "party",
    "dinner",
    "movie",
    "vacation",
    "holiday",
    "celebration",
];

/// categorize
///
/// Labels an event from its title and notes. The text is lower-cased and scanned for
/// work keywords first, then personal keywords; a plain substring hit is enough
/// ("workshop" counts as work). No hit means `Other`.
pub fn categorize(title: &str, notes: &str) -> EventCategory {
    let text = format!("{title} {notes}").to_lowercase();

    if WORK_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        EventCategory::Work
    } else if PERSONAL_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        EventCategory::Personal
    } else {
        EventCategory::Other
    }
}
