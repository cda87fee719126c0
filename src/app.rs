use crate::bugzilla::cached_client::CachedBugzillaClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{TeamGateView, TeamListView};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Main application state
pub struct App {
  /// Navigation stack - root (team list) is always at index 0
  view_stack: Vec<Box<dyn View>>,

  bugzilla_url: String,

  should_quit: bool,
}

impl App {
  /// Build the app, optionally opening `team` on top of the team list.
  pub fn new(config: Config, team: Option<String>) -> Result<Self> {
    let client = CachedBugzillaClient::new(&config.bugzilla)?;
    let bugzilla_url = client.base_url().to_string();
    if let Some(team) = &team {
      if config.team(team).is_none() {
        return Err(eyre!("Unknown team: {}", team));
      }
    }

    let config = Arc::new(config);
    let mut view_stack: Vec<Box<dyn View>> = vec![Box::new(TeamListView::new(
      client.clone(),
      config.clone(),
    ))];

    if let Some(team) = team {
      view_stack.push(Box::new(TeamGateView::new(team, client, config)));
    }

    Ok(Self {
      view_stack,
      bugzilla_url,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.event_loop().await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut events = EventHandler::new(Duration::from_millis(250));

    info!(views = self.view_stack.len(), "dashboard started");

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {}
      // Every view polls, so the team list stays current under a pushed team view
      Event::Tick => self.view_stack.iter_mut().for_each(|v| v.tick()),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };

    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn bugzilla_url(&self) -> &str {
    &self.bugzilla_url
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn config() -> Config {
    Config::from_yaml("teams: []\n").unwrap()
  }

  #[tokio::test]
  async fn test_unknown_initial_team() {
    let err = App::new(config(), Some("nobody".to_string()))
      .err()
      .unwrap();
    assert_eq!(err.to_string(), "Unknown team: nobody");
  }

  #[tokio::test]
  async fn test_quit_from_root() {
    let mut app = App::new(config(), None).unwrap();
    assert_eq!(app.view_breadcrumb(), vec!["Teams"]);
    assert_eq!(app.bugzilla_url(), "https://bugzilla.redhat.com/");

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = App::new(config(), None).unwrap();
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }
}
