use ratatui::Frame;
use ratatui::layout::{Constraint, Layout};

use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{ChatMessagesView, TitleBar};

/// The welcome screen is shown until the transcript has something to show,
/// and keeps its loading overlay while the opening query waits on the server.
pub fn shows_welcome(app: &App) -> bool {
    !app.has_visible_messages() || app.is_opening_run_pending()
}

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState) {
    use Constraint::{Length, Min};
    let [title_area, main_area] = Layout::vertical([Length(1), Min(0)]).areas(frame.area());

    let welcome = shows_welcome(app);

    let mut title_bar = TitleBar::new(
        &app.status_message,
        !welcome && tui.chat.has_unseen_content(),
    );
    title_bar.error = app.error.as_deref();
    title_bar.render(frame, title_area);

    if welcome {
        tui.welcome.render(frame, main_area);
    } else {
        ChatMessagesView {
            state: &mut tui.chat,
            messages: &app.messages,
            historical_activities: &app.historical_activities,
            live_events: &app.live_events,
            is_loading: app.is_loading,
            pulse_value: tui.pulse_value,
        }
        .render(frame, main_area);
    }
}
