use crate::bugzilla::cached_client::CachedBugzillaClient;
use crate::bugzilla::types::Bug;
use crate::cache::CacheSource;
use crate::config::Config;
use crate::gate::{load_team_gate, TeamGate};
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{count_style, gate_label, gate_style, severity_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use chrono::{DateTime, Local, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Gate details for one team: thresholds, per-release counts and the bugs behind them
pub struct TeamGateView {
  team: String,
  /// Makes the next fetch bypass the search cache
  force_refresh: Arc<AtomicBool>,
  query: Query<TeamGate>,
  list_state: ListState,
}

impl TeamGateView {
  pub fn new(team: String, client: CachedBugzillaClient, config: Arc<Config>) -> Self {
    let force_refresh = Arc::new(AtomicBool::new(false));
    let force_for_query = force_refresh.clone();
    let team_for_query = team.clone();

    let mut query = Query::new(move || {
      let client = client.clone();
      let config = config.clone();
      let team = team_for_query.clone();
      let force = force_for_query.swap(false, Ordering::SeqCst);
      async move {
        load_team_gate(&client, &config, &team, force)
          .await
          .map_err(|e| e.to_string())
      }
    });

    query.fetch();

    Self {
      team,
      force_refresh,
      query,
      list_state: ListState::default(),
    }
  }

  fn render_gate(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => format!(" {} (loading...) ", self.team),
      QueryState::Error(_) => format!(" {} (error) ", self.team),
      QueryState::Success(gate) if gate.all_open() => format!(" {} (all gates open) ", self.team),
      _ => format!(" {} ", self.team),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Searching Bugzilla...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let gate = match self.query.data() {
      Some(gate) => gate.clone(),
      None => return,
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3), // Summary
        Constraint::Length(release_table_height(gate.report.releases.len())),
        Constraint::Min(3), // Bugs
      ])
      .split(inner);

    frame.render_widget(Paragraph::new(summary_lines(&gate)), chunks[0]);
    frame.render_widget(release_table(&gate), chunks[1]);
    self.render_bugs(frame, chunks[2], &gate);
  }

  fn render_bugs(&mut self, frame: &mut Frame, area: Rect, gate: &TeamGate) {
    ensure_valid_selection(&mut self.list_state, gate.bugs.len());

    let block = Block::default()
      .title(format!(" Counted bugs ({}) ", gate.bugs.len()))
      .borders(Borders::TOP)
      .border_style(Style::default().fg(Color::DarkGray));

    if gate.bugs.is_empty() {
      let paragraph = Paragraph::new("No medium+ bugs.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = gate
      .bugs
      .iter()
      .map(|bug| ListItem::new(bug_line(bug, gate.evaluated_at)))
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
}

/// Rows plus the table's border and header, clamped to what a terminal can hold
fn release_table_height(releases: usize) -> u16 {
  u16::try_from(releases)
    .unwrap_or(u16::MAX)
    .saturating_add(3)
}

fn local_time(t: DateTime<Utc>) -> String {
  t.with_timezone(&Local).format("%H:%M:%S").to_string()
}

fn summary_lines(gate: &TeamGate) -> Vec<Line<'static>> {
  let threshold = gate.report.threshold;
  let freshness = match gate.source {
    CacheSource::Network => "fetched from Bugzilla",
    CacheSource::Cache => "cached",
  };

  vec![
    Line::from(vec![
      Span::styled("Headcount: ", Style::default().fg(Color::DarkGray)),
      Span::raw(gate.headcount.to_string()),
      Span::styled("   Limits: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format!(
        "medium+ ≤ {}  recent blockers ≤ {}  aged blockers ≤ {}",
        threshold.medium_plus_limit,
        threshold.recent_blockers_limit,
        threshold.aged_blockers_limit
      )),
    ]),
    Line::from(vec![
      Span::styled("Data: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format!(
        "{}, valid until {}, evaluated {}",
        freshness,
        local_time(gate.valid_until),
        local_time(gate.evaluated_at)
      )),
    ]),
    Line::from(vec![
      Span::styled("Bugzilla: ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        gate.buglist_url.clone(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
      ),
    ]),
  ]
}

fn release_table(gate: &TeamGate) -> Table<'static> {
  let threshold = gate.report.threshold;

  let header = Row::new(vec![
    "Release", "Medium+", "Recent", "Aged", "Blockers", "Gate",
  ])
  .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

  let rows: Vec<Row> = gate
    .report
    .releases
    .iter()
    .map(|release| {
      let counts = release.counts;
      Row::new(vec![
        Cell::from(release.version.clone()),
        Cell::from(counts.medium_plus.to_string())
          .style(count_style(counts.medium_plus, threshold.medium_plus_limit)),
        Cell::from(counts.recent_blockers.to_string())
          .style(count_style(counts.recent_blockers, threshold.recent_blockers_limit)),
        Cell::from(counts.aged_blockers.to_string())
          .style(count_style(counts.aged_blockers, threshold.aged_blockers_limit)),
        Cell::from(release.total_blockers.to_string()),
        Cell::from(gate_label(release.gate_open)).style(gate_style(release.gate_open)),
      ])
    })
    .collect();

  let widths = [
    Constraint::Length(12),
    Constraint::Length(9),
    Constraint::Length(8),
    Constraint::Length(6),
    Constraint::Length(9),
    Constraint::Length(8),
  ];

  Table::new(rows, widths).header(header).block(
    Block::default()
      .borders(Borders::TOP)
      .title(" Releases ")
      .border_style(Style::default().fg(Color::DarkGray)),
  )
}

fn bug_line(bug: &Bug, now: DateTime<Utc>) -> Line<'static> {
  let target = bug
    .target_release
    .first()
    .map(String::as_str)
    .unwrap_or("-");
  let age_days = (now - bug.creation_time).num_days();

  Line::from(vec![
    Span::styled(format!("{:<9}", bug.id), Style::default().fg(Color::Cyan)),
    Span::styled(
      format!("{:<12}", bug.severity),
      Style::default().fg(severity_color(bug.severity)),
    ),
    Span::raw(format!("{:<10}", truncate(&bug.status, 10))),
    Span::styled(
      format!("{:<10}", truncate(target, 10)),
      Style::default().fg(Color::Yellow),
    ),
    Span::styled(format!("{:>4}d ", age_days), Style::default().fg(Color::DarkGray)),
    Span::raw(truncate(&bug.summary, 80)),
  ])
}

impl View for TeamGateView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.force_refresh.store(true, Ordering::SeqCst);
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_gate(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.team.clone()
  }

  fn team(&self) -> Option<&str> {
    Some(&self.team)
  }

  fn tick(&mut self) {
    self.query.poll();
    self.query.refetch_if_stale();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("r", "refresh").with_priority(10),
      Shortcut::new("j/k", "scroll").with_priority(20),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
