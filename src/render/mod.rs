use async_trait::async_trait;

/// Turns question text into a PNG for image decks
#[async_trait]
pub trait QuestionRenderer: Send + Sync {
    /// Empty bytes mean rendering failed and the question goes out as text.
    async fn render_text(&self, text: &str) -> Vec<u8>;
}

/// Renderer used when no image service is configured
pub struct TextOnly;

#[async_trait]
impl QuestionRenderer for TextOnly {
    async fn render_text(&self, _text: &str) -> Vec<u8> {
        Vec::new()
    }
}
