//! Canonical message shaping shared by every provider
//!
//! Only `user` messages may carry image parts; [`normalize_roles`] enforces
//! that before any provider-specific conversion runs.

use crate::protocol::{ContentPart, ImageAttachment, Message, MessageContent, MessageRole};

/// Strip image parts from system and assistant messages
///
/// User messages are returned unchanged. Plain-text content passes through
/// for every role.
pub fn normalize_roles(messages: &[Message]) -> Vec<Message> {
    messages.iter().map(normalize_message).collect()
}

fn normalize_message(message: &Message) -> Message {
    match (&message.role, &message.content) {
        (MessageRole::User, _) | (_, MessageContent::Text(_)) => message.clone(),
        (role, MessageContent::Parts(parts)) => Message::with_parts(
            *role,
            parts.iter().filter(|part| !part.is_image()).cloned().collect(),
        ),
    }
}

/// Move system text into the first user turn for targets without a system role
///
/// System messages are dropped and their text, joined by blank lines, is
/// prepended to the first user message. With no user message a new one is
/// placed at the front.
pub fn fold_system_messages(messages: &[Message]) -> Vec<Message> {
    let system: Vec<String> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.text())
        .filter(|text| !text.is_empty())
        .collect();

    let mut folded: Vec<Message> = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .cloned()
        .collect();

    if system.is_empty() {
        return folded;
    }
    let preamble = system.join("\n\n");

    match folded.iter_mut().find(|m| m.role == MessageRole::User) {
        Some(first_user) => {
            first_user.content = match &first_user.content {
                MessageContent::Text(text) => {
                    MessageContent::Text(format!("{}\n\n{}", preamble, text))
                }
                MessageContent::Parts(parts) => {
                    let mut parts = parts.clone();
                    parts.insert(0, ContentPart::text(preamble));
                    MessageContent::Parts(parts)
                }
            };
        }
        None => folded.insert(0, Message::user(preamble)),
    }

    folded
}

/// Trailing user message carrying an attached image
///
/// The image part comes first, followed by the description when present.
pub fn image_message(image: &ImageAttachment) -> Message {
    let mut parts = vec![ContentPart::image_url(image.to_data_uri())];
    if let Some(description) = image.description.as_deref() {
        parts.push(ContentPart::text(description));
    }
    Message::with_parts(MessageRole::User, parts)
}

/// Collapse content to a plain string for text-only targets
pub fn flatten_to_text(content: &MessageContent) -> String {
    content.text()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_parts() -> Vec<ContentPart> {
        vec![
            ContentPart::text("look"),
            ContentPart::image_url("https://example.com/a.png"),
        ]
    }

    #[test]
    fn test_images_only_survive_on_user_messages() {
        let messages = vec![
            Message::with_parts(MessageRole::System, mixed_parts()),
            Message::with_parts(MessageRole::User, mixed_parts()),
            Message::with_parts(MessageRole::Assistant, mixed_parts()),
            Message::assistant("plain"),
        ];

        let normalized = normalize_roles(&messages);

        assert_eq!(normalized.len(), 4);
        assert!(!normalized[0].content.has_images());
        assert_eq!(normalized[0].content.text(), "look");
        assert_eq!(normalized[1], messages[1]);
        assert!(!normalized[2].content.has_images());
        assert_eq!(normalized[3], messages[3]);
    }

    #[test]
    fn test_system_text_folds_into_first_user_turn() {
        let messages = vec![
            Message::system("You are a calculator"),
            Message::user("What is 2+2?"),
            Message::assistant("4"),
            Message::system("Answer tersely"),
            Message::user("And 3+3?"),
        ];

        let folded = fold_system_messages(&messages);

        assert_eq!(folded.len(), 3);
        assert!(folded.iter().all(|m| m.role != MessageRole::System));
        assert_eq!(
            folded[0].content.text(),
            "You are a calculator\n\nAnswer tersely\n\nWhat is 2+2?"
        );
        assert_eq!(folded[2], messages[4]);
    }

    #[test]
    fn test_fold_keeps_user_image_parts() {
        let messages = vec![
            Message::system("Describe the picture"),
            Message::with_parts(MessageRole::User, mixed_parts()),
        ];

        let folded = fold_system_messages(&messages);

        assert_eq!(folded.len(), 1);
        match &folded[0].content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts[0], ContentPart::text("Describe the picture"));
                assert_eq!(parts.len(), 3);
                assert!(parts[2].is_image());
            }
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_fold_without_user_turn_or_system() {
        let only_system = fold_system_messages(&[Message::system("rules")]);
        assert_eq!(only_system, vec![Message::user("rules")]);

        let plain = vec![Message::user("hi"), Message::assistant("hello")];
        assert_eq!(fold_system_messages(&plain), plain);
    }

    #[test]
    fn test_image_message_layout() {
        let image = ImageAttachment::new(vec![0xFF, 0xD8, 0xFF, 0xE0]).with_description("a cat");
        let message = image_message(&image);

        assert_eq!(message.role, MessageRole::User);
        match &message.content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(parts[0].is_image());
                assert_eq!(parts[1], ContentPart::text("a cat"));
            }
            other => panic!("expected parts, got {other:?}"),
        }
        assert!(message.content.images()[0].starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_image_message_without_description() {
        let message = image_message(&ImageAttachment::new(vec![1, 2, 3]));
        assert_eq!(message.content.images().len(), 1);
        assert_eq!(flatten_to_text(&message.content), "");
    }
}
