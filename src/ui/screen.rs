use std::time::Duration;

use ratatui::Frame;

use crate::{
    ui::{render_loading, render_page, Palette},
    App,
};

/// A UI Screen boundary: responsible for rendering one view of the page
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame, palette: &Palette, now: Duration);
}

/// Loading overlay - shown until the gate opens and its fade completes
pub struct LoadingScreen;

impl Screen for LoadingScreen {
    fn render(&self, app: &App, f: &mut Frame, palette: &Palette, now: Duration) {
        render_loading(app, f, palette, now);
    }
}

/// Main page - now playing, session progress and the playlist
pub struct PageScreen;

impl Screen for PageScreen {
    fn render(&self, app: &App, f: &mut Frame, palette: &Palette, now: Duration) {
        render_page(app, f, palette, now);
    }
}

/// Helper to construct the appropriate screen for the page's state
pub fn current_screen(app: &App) -> Box<dyn Screen> {
    if app.page.is_overlay_present() {
        Box::new(LoadingScreen)
    } else {
        Box::new(PageScreen)
    }
}
