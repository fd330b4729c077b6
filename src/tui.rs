use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::directory::Directory;
use crate::models::Company;
use crate::query::{is_registration_open, DirectoryQuery, Page};
use crate::repository::today;
use crate::shell::format_date;

struct AppState {
    directory: Directory,
    query: DirectoryQuery,
    categories: Vec<String>,
    category_index: Option<usize>, // None = all categories
    selected: usize,
    today: NaiveDate,
}

impl AppState {
    fn new(directory: Directory, today: NaiveDate) -> Self {
        let categories = directory.unique_categories();
        Self {
            directory,
            query: DirectoryQuery::default(),
            categories,
            category_index: None,
            selected: 0,
            today,
        }
    }

    fn page(&self) -> Page<&Company> {
        self.query.run(self.directory.companies())
    }

    fn current_company(&self) -> Option<&Company> {
        self.page().items.get(self.selected).copied()
    }

    fn next(&mut self) {
        let len = self.page().items.len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
        }
    }

    fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn next_page(&mut self) {
        self.query.next_page(self.directory.companies());
        self.selected = 0;
    }

    fn prev_page(&mut self) {
        self.query.prev_page(self.directory.companies());
        self.selected = 0;
    }

    // all -> first category -> ... -> last category -> all
    fn cycle_category(&mut self) {
        self.category_index = match self.category_index {
            None if !self.categories.is_empty() => Some(0),
            Some(i) if i + 1 < self.categories.len() => Some(i + 1),
            _ => None,
        };
        let category = self.category_index.map(|i| self.categories[i].clone());
        self.query.set_category(category);
        self.selected = 0;
    }
}

pub fn run_browse(directory: Directory) -> Result<()> {
    if directory.companies().is_empty() {
        println!("No companies found.");
        return Ok(());
    }

    let mut state = AppState::new(directory, today());

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Right | KeyCode::Char('n') | KeyCode::PageDown => state.next_page(),
                KeyCode::Left | KeyCode::Char('p') | KeyCode::PageUp => state.prev_page(),
                KeyCode::Char('c') => state.cycle_category(),
                _ => {}
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: one page of companies
    let page = state.page();
    let items: Vec<ListItem> = page
        .items
        .iter()
        .map(|company| {
            let marker = if is_registration_open(company, state.today) {
                "+"
            } else {
                " "
            };
            ListItem::new(format!(
                "{} {:<24} {}",
                marker,
                crate::truncate(&company.company_name, 24),
                company.category
            ))
        })
        .collect();

    let category = state
        .category_index
        .map(|i| state.categories[i].as_str())
        .unwrap_or("all");
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Companies ({}) page {}/{} category: {} ",
            page.total,
            state.query.page(),
            page.total_pages.max(1),
            category
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: company detail
    let detail_widget = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false });

    frame.render_widget(detail_widget, chunks[1]);

    let help = Paragraph::new(" j/k:move  n/p:page  c:category  q:quit   (+ registration open)")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[1]);
}

fn build_detail(state: &AppState) -> Text<'static> {
    let Some(company) = state.current_company() else {
        return Text::raw("No companies match this filter");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        company.company_name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("Type: {}", company.kind)));
    lines.push(Line::from(format!("Category: {}", company.category)));
    lines.push(Line::from(""));

    let (label, style) = if is_registration_open(company, state.today) {
        ("Registration open", Style::default().fg(Color::Green))
    } else {
        ("Registration closed", Style::default().fg(Color::Red))
    };
    lines.push(Line::from(Span::styled(label, style)));
    lines.push(Line::from(format!(
        "  Registration date: {}",
        format_date(company.registration_date)
    )));
    lines.push(Line::from(format!(
        "  Placement opens:   {}",
        format_date(company.placement_open)
    )));
    lines.push(Line::from(format!(
        "  Drive:             {} to {}",
        format_date(company.start_date),
        format_date(company.end_date)
    )));
    lines.push(Line::from(""));

    if !company.criteria.is_empty() {
        lines.push(Line::from(Span::styled(
            "Eligible branches",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&company.criteria.join(", "), 50).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}
