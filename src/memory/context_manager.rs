use crate::types::Message;

/// Keep the first message plus the most recent `keep_last` messages.
///
/// The first message carries the standing instructions, so it survives no
/// matter how long the history grows. Histories that already fit are
/// returned whole. Order is preserved.
pub fn sliding_window(messages: &[Message], keep_last: usize) -> Vec<Message> {
    if messages.len() <= keep_last + 1 {
        return messages.to_vec();
    }

    let mut window = Vec::with_capacity(keep_last + 1);
    window.push(messages[0].clone());
    window.extend_from_slice(&messages[messages.len() - keep_last..]);
    window
}

/// Last `count` messages after the first, never repeating the first
pub fn recent_after_first(messages: &[Message], count: usize) -> &[Message] {
    let rest = messages.get(1..).unwrap_or(&[]);
    &rest[rest.len().saturating_sub(count)..]
}
