use crate::bugzilla::cached_client::CachedBugzillaClient;
use crate::config::{Config, Team};
use crate::gate::{load_team_gate, TeamGate};
use crate::query::{Query, QueryState};
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{gate_label, gate_style, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::TeamGateView;
use crossterm::event::{KeyCode, KeyEvent};
use futures::future::join_all;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One line of the team list
#[derive(Debug, Clone)]
struct TeamRow {
  name: String,
  peeps: u32,
  components: Vec<String>,
  /// Per-team failures stay on their row instead of failing the whole list
  gate: Result<TeamGate, String>,
}

async fn load_row(
  client: &CachedBugzillaClient,
  config: &Config,
  team: &Team,
  force: bool,
) -> TeamRow {
  let gate = load_team_gate(client, config, &team.name, force)
    .await
    .map_err(|e| e.to_string());
  TeamRow {
    name: team.name.clone(),
    peeps: team.peeps,
    components: team.components.clone(),
    gate,
  }
}

/// Evaluate every configured team concurrently. With `force` every team's
/// search goes to Bugzilla instead of the cache.
async fn load_rows(client: &CachedBugzillaClient, config: &Config, force: bool) -> Vec<TeamRow> {
  join_all(
    config
      .teams
      .iter()
      .map(|team| load_row(client, config, team, force)),
  )
  .await
}

/// Root view: all teams with their gate status per release
pub struct TeamListView {
  client: CachedBugzillaClient,
  config: Arc<Config>,
  /// Makes the next fetch bypass the search cache
  force_refresh: Arc<AtomicBool>,
  query: Query<Vec<TeamRow>>,
  list_state: ListState,
  search: SearchInput,
}

impl TeamListView {
  pub fn new(client: CachedBugzillaClient, config: Arc<Config>) -> Self {
    let force_refresh = Arc::new(AtomicBool::new(false));
    let force_for_query = force_refresh.clone();
    let client_for_query = client.clone();
    let config_for_query = config.clone();
    let mut query = Query::new(move || {
      let client = client_for_query.clone();
      let config = config_for_query.clone();
      let force = force_for_query.swap(false, Ordering::SeqCst);
      async move { Ok::<_, String>(load_rows(&client, &config, force).await) }
    });

    query.fetch();

    Self {
      client,
      config,
      force_refresh,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
    }
  }

  /// Rows matching the current filter, by team or component name
  fn visible_rows(&self) -> Vec<&TeamRow> {
    self
      .query
      .data()
      .map(|rows| {
        rows
          .iter()
          .filter(|row| {
            self.search.matches(&row.name) || row.components.iter().any(|c| self.search.matches(c))
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn row_line(row: &TeamRow) -> Line<'static> {
    let mut spans = vec![
      Span::styled(
        format!("{:<20}", truncate(&row.name, 20)),
        Style::default().fg(Color::Cyan),
      ),
      Span::raw(" "),
      Span::styled(
        format!("{:>3} peeps {:>3} components", row.peeps, row.components.len()),
        Style::default().fg(Color::DarkGray),
      ),
      Span::raw("  "),
    ];

    match &row.gate {
      Ok(gate) => {
        for release in &gate.report.releases {
          spans.push(Span::raw(format!("{} ", release.version)));
          spans.push(Span::styled(
            format!("{:<7}", gate_label(release.gate_open)),
            gate_style(release.gate_open),
          ));
          spans.push(Span::raw(" "));
        }
      }
      Err(e) => spans.push(Span::styled(
        truncate(e, 60),
        Style::default().fg(Color::Red),
      )),
    }

    Line::from(spans)
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.visible_rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Teams (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Teams (error: {}) ", e),
      _ if !self.search.query().is_empty() => format!(
        " Teams ({}/{}) [/{}] ",
        len,
        self.config.teams.len(),
        self.search.query()
      ),
      _ => format!(" Teams ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.config.teams.is_empty() {
        "No teams configured. Add a `teams` list to the config file."
      } else if self.query.error().is_some() {
        "Failed to evaluate teams. Press 'r' to retry."
      } else {
        "No teams match the filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    // Collect items first to avoid borrow conflicts with list_state
    let items: Vec<ListItem> = self
      .visible_rows()
      .into_iter()
      .map(|row| ListItem::new(Self::row_line(row)))
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(filter)) => {
        debug!(filter = %filter, "team filter changed");
        self.list_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => {
        self.list_state.select(Some(0));
        Some(ViewAction::None)
      }
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.force_refresh.store(true, Ordering::SeqCst);
        self.query.refetch();
        Some(ViewAction::None)
      }
      KeyCode::Enter => {
        let idx = self.list_state.selected()?;
        let name = self.visible_rows().get(idx)?.name.clone();
        Some(ViewAction::Push(Box::new(TeamGateView::new(
          name,
          self.client.clone(),
          self.config.clone(),
        ))))
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for TeamListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Teams".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refetch_if_stale();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.search.is_active() {
      return vec![
        Shortcut::new("enter", "apply").with_priority(10),
        Shortcut::new("esc", "clear").with_priority(20),
      ];
    }
    vec![
      Shortcut::new("/", "filter").with_priority(10),
      Shortcut::new("enter", "open").with_priority(20),
      Shortcut::new("r", "reload").with_priority(30),
      Shortcut::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn view() -> TeamListView {
    // No components: every team fails before any network call
    let config = Config::from_yaml("teams:\n  - name: ghosts\n    peeps: 1\n").unwrap();
    let client = CachedBugzillaClient::new(&config.bugzilla).unwrap();
    TeamListView::new(client, Arc::new(config))
  }

  #[tokio::test]
  async fn test_reload_bypasses_cache() {
    let mut view = view();
    assert!(!view.force_refresh.load(Ordering::SeqCst));

    let action = view.handle_key(key(KeyCode::Char('r')));
    assert!(matches!(action, ViewAction::None));
    // The flag is consumed by the fetch that 'r' started
    assert!(!view.force_refresh.load(Ordering::SeqCst));
    assert!(view.query.is_loading());
  }

  #[tokio::test]
  async fn test_filter_shortcuts_while_typing() {
    let mut view = view();
    let labels = |v: &TeamListView| -> Vec<String> {
      v.shortcuts().iter().map(|s| s.label.to_string()).collect()
    };
    assert!(labels(&view).contains(&"reload".to_string()));

    view.handle_key(key(KeyCode::Char('/')));
    assert_eq!(labels(&view), vec!["apply", "clear"]);

    view.handle_key(key(KeyCode::Esc));
    assert!(labels(&view).contains(&"reload".to_string()));
  }
}
