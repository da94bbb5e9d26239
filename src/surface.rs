use std::io::{IsTerminal, Write};

/// Output side of the client: alert dialogs, the loading indicator and the
/// output element.
pub trait Surface {
    fn alert(&self, message: &str);

    fn set_loading(&self, visible: bool);

    fn render(&self, text: &str);

    /// Blank the output before a new submission starts.
    fn clear(&self) {}
}

/// Shows the loading indicator for as long as it lives.
pub struct LoadingGuard<'a, S: Surface + ?Sized> {
    surface: &'a S,
}

impl<'a, S: Surface + ?Sized> LoadingGuard<'a, S> {
    pub fn show(surface: &'a S) -> Self {
        surface.set_loading(true);
        Self { surface }
    }
}

impl<S: Surface + ?Sized> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_loading(false);
    }
}

/// Alerts and the indicator go to stderr, rendered text to stdout.
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    fn alert(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn set_loading(&self, visible: bool) {
        let mut stderr = std::io::stderr();
        if let Some(text) = indicator_text(visible, stderr.is_terminal()) {
            let _ = write!(stderr, "{text}");
            let _ = stderr.flush();
        }
    }

    fn render(&self, text: &str) {
        println!("{text}");
    }
}

/// What to write for an indicator change. Redirected output gets a plain
/// line on show and nothing on hide, never escape sequences.
fn indicator_text(visible: bool, interactive: bool) -> Option<&'static str> {
    match (visible, interactive) {
        (true, true) => Some("waiting for models..."),
        // erase the indicator line
        (false, true) => Some("\r\x1b[2K"),
        (true, false) => Some("waiting for models...\n"),
        (false, false) => None,
    }
}
