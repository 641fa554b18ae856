use serde::Serialize;

/// A single part of a multimodal prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineImage,
    },
}

/// Base64 image bytes plus their MIME type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        ContentPart::Image {
            inline_data: InlineImage {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::Image { .. })
    }
}

/// Ordered prompt content: one text part, optionally followed by one image part.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    prompt: String,
    image: Option<InlineImage>,
}

impl PromptPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    /// Attach an image part. Text parts are ignored; the prompt text is fixed at construction.
    pub fn with_image(mut self, part: ContentPart) -> Self {
        if let ContentPart::Image { inline_data } = part {
            self.image = Some(inline_data);
        }
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn parts(&self) -> Vec<ContentPart> {
        let mut parts = vec![ContentPart::text(self.prompt.clone())];
        if let Some(ref image) = self.image {
            parts.push(ContentPart::Image {
                inline_data: image.clone(),
            });
        }
        parts
    }
}
