use crate::{AssistantMessage, ImagePart, Message, ModelResponse, Part, TextPart, UserMessage};

impl From<&str> for TextPart {
    fn from(value: &str) -> Self {
        Self {
            text: value.to_string(),
        }
    }
}

impl From<String> for TextPart {
    fn from(value: String) -> Self {
        Self { text: value }
    }
}

impl From<TextPart> for Part {
    fn from(value: TextPart) -> Self {
        Self::Text(value)
    }
}

impl From<ImagePart> for Part {
    fn from(value: ImagePart) -> Self {
        Self::Image(value)
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart { text: text.into() })
    }

    pub fn image(image_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image(ImagePart {
            mime_type: mime_type.into(),
            image_data: image_data.into(),
        })
    }

    /// Flatten the part to plain text. Images are described by their MIME
    /// type so text-only providers still see that something was attached.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        match self {
            Self::Text(part) => part.text.clone(),
            Self::Image(part) => format!("[image: {}]", part.mime_type),
        }
    }
}

impl ImagePart {
    /// Render the image as a `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.image_data)
    }
}

impl UserMessage {
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self {
            content: parts.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<UserMessage> for Message {
    fn from(value: UserMessage) -> Self {
        Self::User(value)
    }
}

impl AssistantMessage {
    pub fn new<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self {
            content: parts.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<AssistantMessage> for Message {
    fn from(value: AssistantMessage) -> Self {
        Self::Assistant(value)
    }
}

impl Message {
    pub fn user<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self::User(UserMessage::new(parts))
    }

    pub fn assistant<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self::Assistant(AssistantMessage::new(parts))
    }

    #[must_use]
    pub fn content(&self) -> &[Part] {
        match self {
            Self::User(message) => &message.content,
            Self::Assistant(message) => &message.content,
        }
    }
}

impl ModelResponse {
    /// Construct a response made of a single text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Part::text(text)],
            usage: None,
        }
    }

    /// Concatenate all text parts of the response. Returns `None` when the
    /// response carries no text at all.
    #[must_use]
    pub fn output_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|part| match part {
                Part::Text(part) => Some(part.text.as_str()),
                Part::Image(_) => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_text_joins_text_parts_and_skips_images() {
        let response = ModelResponse {
            content: vec![
                Part::text("Hello, "),
                Part::image("AAAA", "image/png"),
                Part::text("world"),
            ],
            usage: None,
        };

        assert_eq!(response.output_text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn output_text_is_none_without_text() {
        let response = ModelResponse::default();
        assert_eq!(response.output_text(), None);
    }

    #[test]
    fn image_part_renders_data_url() {
        let image = ImagePart {
            mime_type: "image/jpeg".to_string(),
            image_data: "QUJD".to_string(),
        };
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,QUJD");
    }
}
