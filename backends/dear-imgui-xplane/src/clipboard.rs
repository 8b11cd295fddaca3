//! System clipboard backed by `arboard`

use dear_imgui_rs::ClipboardBackend;

/// Clipboard backend that opens the system clipboard on first use.
///
/// Plugins are loaded before the simulator finishes bringing up its own
/// windows, so the clipboard is not touched until a widget asks for it.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn clipboard(&mut self) -> Option<&mut arboard::Clipboard> {
        if self.inner.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.inner = Some(clipboard),
                Err(err) => {
                    log::debug!(target: "dear-imgui-xplane", "clipboard unavailable: {err}");
                    return None;
                }
            }
        }
        self.inner.as_mut()
    }
}

impl ClipboardBackend for SystemClipboard {
    fn get(&mut self) -> Option<String> {
        match self.clipboard()?.get_text() {
            Ok(text) => Some(text),
            Err(err) => {
                log::debug!(target: "dear-imgui-xplane", "clipboard read failed: {err}");
                None
            }
        }
    }

    fn set(&mut self, value: &str) {
        if let Some(clipboard) = self.clipboard()
            && let Err(err) = clipboard.set_text(value.to_owned())
        {
            log::debug!(target: "dear-imgui-xplane", "clipboard write failed: {err}");
        }
    }
}
