//! Terminal lifecycle and the main event loop

use crate::config::Config;
use crate::endpoint::LaunchContext;
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};
use std::time::Duration;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the chat UI until the user quits. A saved endpoint rebuilds the
/// controller from scratch, which starts a new, empty transcript.
pub async fn run(config: Config, launch: LaunchContext) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &config, &launch).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(terminal: &mut Tui, config: &Config, launch: &LaunchContext) -> Result<()> {
    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms.max(10));
    let mut manager = ConversationManager::new(config, launch);

    loop {
        manager.process_responses();

        terminal
            .draw(|frame| frame.render_widget(&manager, frame.size()))
            .context("Failed to draw frame")?;

        if !event::poll(tick_rate).context("Failed to poll terminal events")? {
            // Let the spawned request make progress between frames
            tokio::task::yield_now().await;
            continue;
        }

        if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
            match manager.handle_key(key) {
                ConversationAction::None => {}
                ConversationAction::Exit => break,
                ConversationAction::Reload => {
                    tracing::info!("reloading with saved endpoint");
                    manager = ConversationManager::new(config, launch);
                }
            }
        }
    }

    Ok(())
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}
