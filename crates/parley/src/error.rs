use thiserror::Error;

/// Failures that abort a `generate` call.
///
/// Tool failures never show up here; they are recorded in the conversation
/// for the model to read.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Completion gateway error: {0:#}")]
    Gateway(#[source] anyhow::Error),

    #[error("Conversation store error: {0:#}")]
    Store(#[source] anyhow::Error),

    #[error("Invalid message: {0:#}")]
    Message(#[source] anyhow::Error),
}

impl CoreError {
    #[must_use]
    pub const fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}
