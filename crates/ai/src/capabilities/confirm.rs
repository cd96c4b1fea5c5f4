use anyhow::Result;

/// Asks the operator a yes/no question before a capability acts on the host.
///
/// Implementations block on operator input and are never cancelled.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Answers every question with the same fixed reply
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl Confirm for Always {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}

impl<F> Confirm for F
where
    F: Fn(&str) -> Result<bool> + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> Result<bool> {
        self(prompt)
    }
}
