//! Clipboard adapter using arboard
//!
//! Used to hand the share link to the desktop after an upload. On X11 the
//! selection is owned by this process, so the link stays available only
//! while a clipboard manager picks it up before exit.

use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::{Clipboard, ClipboardError};

/// Cross-platform clipboard adapter using arboard
pub struct ArboardClipboard;

impl ArboardClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArboardClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clipboard for ArboardClipboard {
    async fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        // Never replace the user's clipboard with nothing
        let text = text.trim().to_owned();
        if text.is_empty() {
            return Err(ClipboardError::CopyFailed("nothing to copy".into()));
        }

        // arboard blocks on the platform clipboard
        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| ClipboardError::ClipboardUnavailable(e.to_string()))?;

            clipboard
                .set_text(&text)
                .map_err(|e| ClipboardError::CopyFailed(e.to_string()))?;
            debug!(chars = text.len(), "copied to clipboard");
            Ok(())
        })
        .await
        .map_err(|e| ClipboardError::CopyFailed(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let clipboard = ArboardClipboard::new();
        assert!(matches!(
            clipboard.copy("  ").await,
            Err(ClipboardError::CopyFailed(_))
        ));
    }

    #[tokio::test]
    #[ignore = "Requires a desktop clipboard"]
    async fn copies_share_link() {
        let clipboard = ArboardClipboard::new();
        assert!(clipboard.copy("http://localhost:5173/#abc123").await.is_ok());
    }
}
