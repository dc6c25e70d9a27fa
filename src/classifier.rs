//! Message classification: decides which handler an incoming message belongs to.
//!
//! Everything here is pure. The teloxide adapter lives in
//! `bot::message_handler`, which converts a `Message` into the arguments of
//! [`classify`].

/// Greeting words, matched case-insensitively as a prefix of the message
pub const GREETINGS: [&str; 3] = ["hi", "hello", "hey"];

/// Commands the bot answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Image,
    /// `/generate_code <prompt>`
    GenerateCode(String),
}

impl Command {
    /// All command names with their catalog description keys
    pub const MENU: [(&'static str, &'static str); 4] = [
        ("start", "command-start"),
        ("help", "command-help"),
        ("image", "command-image"),
        ("generate_code", "command-generate-code"),
    ];

    fn from_parts(name: &str, args: &str) -> Option<Self> {
        match name {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "image" => Some(Command::Image),
            "generate_code" => Some(Command::GenerateCode(args.to_string())),
            _ => None,
        }
    }
}

/// One resolution variant of a photo attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoVariant {
    /// Telegram file id used for downloading
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    /// File size in bytes as reported by Telegram
    pub file_size: u32,
}

impl PhotoVariant {
    fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Result of classifying an incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Command(Command),
    /// A slash command the bot does not know
    UnknownCommand(String),
    Greeting(String),
    FreeText(String),
    /// Photo attachment, reduced to its highest-resolution variant
    Photo(PhotoVariant),
}

/// Classify a message from its text and photo variants.
///
/// Photos take precedence over text, so a captioned photo is a photo.
/// Messages with neither are `FreeText("")`.
pub fn classify(text: Option<&str>, photos: &[PhotoVariant]) -> MessageKind {
    if let Some(photo) = select_largest_photo(photos) {
        return MessageKind::Photo(photo.clone());
    }

    match text {
        Some(text) => classify_text(text),
        None => MessageKind::FreeText(String::new()),
    }
}

/// Classify a text-only message
pub fn classify_text(text: &str) -> MessageKind {
    if let Some((name, args)) = split_command(text) {
        return match Command::from_parts(&name, &args) {
            Some(command) => MessageKind::Command(command),
            None => MessageKind::UnknownCommand(name),
        };
    }

    if is_greeting(text) {
        MessageKind::Greeting(text.to_string())
    } else {
        MessageKind::FreeText(text.to_string())
    }
}

/// Case-insensitive prefix match against [`GREETINGS`]
pub fn is_greeting(text: &str) -> bool {
    let lowered = text.to_lowercase();
    GREETINGS.iter().any(|greeting| lowered.starts_with(greeting))
}

/// Pick the variant with the most pixels, ties broken by file size
pub fn select_largest_photo(photos: &[PhotoVariant]) -> Option<&PhotoVariant> {
    photos
        .iter()
        .max_by_key(|photo| (photo.pixel_count(), photo.file_size))
}

/// Split `/name[@bot] args` into a lowercase name and trimmed args
fn split_command(text: &str) -> Option<(String, String)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(index) => (&rest[..index], rest[index..].trim()),
        None => (rest, ""),
    };
    // Commands addressed to a bot in group chats carry an @botname suffix
    let name = head.split('@').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }

    Some((name.to_lowercase(), args.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, width: u32, height: u32, size: u32) -> PhotoVariant {
        PhotoVariant {
            file_id: id.to_string(),
            width,
            height,
            file_size: size,
        }
    }

    #[test]
    fn test_greetings_are_prefix_and_case_insensitive() {
        assert!(is_greeting("Hello there"));
        assert!(is_greeting("HI!"));
        assert!(is_greeting("heyyy"));
        assert!(!is_greeting("Whatsup"));
        assert!(!is_greeting(""));
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(classify_text("/start"), MessageKind::Command(Command::Start));
        assert_eq!(
            classify_text("/help@example_bot"),
            MessageKind::Command(Command::Help)
        );
        assert_eq!(
            classify_text("/generate_code   Write python code for calculator "),
            MessageKind::Command(Command::GenerateCode(
                "Write python code for calculator".to_string()
            ))
        );
        assert_eq!(
            classify_text("/generate_code"),
            MessageKind::Command(Command::GenerateCode(String::new()))
        );
        assert_eq!(
            classify_text("/weather today"),
            MessageKind::UnknownCommand("weather".to_string())
        );
    }

    #[test]
    fn test_prefixes_must_start_the_message() {
        assert!(!is_greeting("  hey"));
        assert_eq!(
            classify_text("  /start"),
            MessageKind::FreeText("  /start".to_string())
        );
        assert_eq!(
            classify_text(" hello"),
            MessageKind::FreeText(" hello".to_string())
        );
    }

    #[test]
    fn test_lone_slash_is_free_text() {
        assert_eq!(classify_text("/"), MessageKind::FreeText("/".to_string()));
    }

    #[test]
    fn test_largest_photo_selected() {
        let photos = vec![
            variant("small", 90, 67, 1_000),
            variant("large", 1280, 960, 90_000),
            variant("medium", 320, 240, 9_000),
        ];
        match classify(Some("caption"), &photos) {
            MessageKind::Photo(photo) => assert_eq!(photo.file_id, "large"),
            other => panic!("expected photo, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_content_is_empty_free_text() {
        assert_eq!(classify(None, &[]), MessageKind::FreeText(String::new()));
    }
}
