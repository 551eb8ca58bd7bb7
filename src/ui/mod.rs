// src/ui/mod.rs

use crate::app::App;
use ratatui::prelude::*;

mod layout;
mod widgets;

pub fn render(app: &mut App, frame: &mut Frame) {
    let layout = layout::create_layout(frame.area(), app.show_logs);

    widgets::status_view::render_status(frame, app, layout.status);
    widgets::results::render_results(frame, app, layout.results);
    widgets::status_view::render_history(frame, app, layout.history);
    if app.show_logs {
        widgets::log_view::render_log_view(frame, app, layout.log_panel);
    }
    widgets::input::render_input(frame, app, layout.input);
    widgets::footer::render_footer(frame, app, layout.footer);
}
