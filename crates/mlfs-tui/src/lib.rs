// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use mlfs_api::{Page, Request, RequestError};
use mlfs_app::{
    AppCommand, AppEvent, AppMode, AppState, DEFAULT_FILTER_DEBOUNCE, DEFAULT_PAGE_SIZE,
    Debounce, Notice, NoticeLevel, PendingEdit, ResourceKind, Row, RowId, SelectOption,
    SortDirection, ViewQuery, wrap_index,
};
use mlfs_grid::adapter::build_cell;
use mlfs_grid::values::{edit_text, values_equal};
use mlfs_grid::{
    EditController, MemoryGrid, OptionLookup, SkipReason, build_view, columns_for,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row as TableRow, Table, Tabs};
use serde_json::Value;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

const SEARCH_FILTER: &str = "search";
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const SORT_MARK_ASC: &str = "▲";
const SORT_MARK_DESC: &str = "▼";
const EDIT_CARET: &str = "▏";
const PLACEHOLDER_ROWS: i64 = 5;

/// Data access for the terminal view. `spawn_patch` runs inline by default;
/// real runtimes override it to send from a worker thread.
pub trait GridRuntime {
    fn load_page(&mut self, resource: ResourceKind, params: Vec<(String, String)>)
    -> Result<Page>;
    fn load_lookup(&mut self) -> Result<OptionLookup>;
    fn send_patch(&mut self, request: &Request) -> std::result::Result<Value, RequestError>;
    fn spawn_patch(
        &mut self,
        generation: u64,
        pending: PendingEdit,
        request: Request,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self.send_patch(&request);
        tx.send(InternalEvent::PatchResolved {
            generation,
            pending,
            result,
        })
        .map_err(|_| anyhow!("patch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    PatchResolved {
        generation: u64,
        pending: PendingEdit,
        result: std::result::Result<Value, RequestError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub page_size: usize,
    pub filter_debounce: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            filter_debounce: DEFAULT_FILTER_DEBOUNCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CellEditor {
    row_id: RowId,
    field: String,
    buffer: String,
    options: Vec<SelectOption>,
    option_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
struct ViewData {
    options: ViewOptions,
    grid: MemoryGrid,
    lookup: OptionLookup,
    controller: EditController,
    query: ViewQuery,
    debounce: Debounce,
    total: usize,
    selected_row: usize,
    selected_col: usize,
    editor: Option<CellEditor>,
    filter_buffer: String,
    notice_level: Option<NoticeLevel>,
    status_token: u64,
    // Bumped on resource switch; patch results from an older generation
    // belong to a grid that no longer exists.
    generation: u64,
    help_visible: bool,
}

impl ViewData {
    fn new(resource: ResourceKind, options: ViewOptions) -> Self {
        Self {
            options,
            grid: MemoryGrid::new(columns_for(resource), placeholder_rows()),
            lookup: OptionLookup::default(),
            controller: EditController::new(resource),
            query: ViewQuery::new(options.page_size),
            debounce: Debounce::new(options.filter_debounce),
            total: 0,
            selected_row: 0,
            selected_col: 0,
            editor: None,
            filter_buffer: String::new(),
            notice_level: None,
            status_token: 0,
            generation: 0,
            help_visible: false,
        }
    }

    fn reset_for(&mut self, resource: ResourceKind) {
        let lookup = std::mem::take(&mut self.lookup);
        let status_token = self.status_token;
        let generation = self.generation.wrapping_add(1);
        *self = Self::new(resource, self.options);
        self.lookup = lookup;
        self.status_token = status_token;
        self.generation = generation;
    }
}

/// Blank rows shown until the first page arrives. Negative ids never collide
/// with server records.
fn placeholder_rows() -> Vec<Row> {
    (1..=PLACEHOLDER_ROWS)
        .map(|n| Row::skeleton(RowId::new(-n)))
        .collect()
}

pub fn run_app<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: ViewOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(state.resource, options);
    let (internal_tx, internal_rx) = mpsc::channel();
    terminal
        .draw(|frame| render(frame, state, &view_data))
        .context("draw frame")?;

    match runtime.load_lookup() {
        Ok(lookup) => view_data.lookup = lookup,
        Err(error) => {
            tracing::warn!("lookup load failed: {error:#}");
            emit_notice(
                state,
                &mut view_data,
                &internal_tx,
                Notice::error(format!("lookup load failed: {error:#}")),
            );
        }
    }
    reload_or_report(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);
        tick(state, runtime, &mut view_data, &internal_tx, Instant::now());

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
                view_data.notice_level = None;
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::PatchResolved {
                generation,
                pending,
                result,
            } => {
                if generation != view_data.generation {
                    tracing::debug!(
                        row = %pending.row_id,
                        field = %pending.field,
                        "dropping patch result for a previous resource"
                    );
                    continue;
                }
                let outcome = view_data
                    .controller
                    .resolve(&mut view_data.grid, pending, result);
                if let Some(notice) = outcome.notice() {
                    emit_notice(state, view_data, tx, notice.clone());
                }
            }
        }
    }
}

/// Fires a debounced filter refetch once the typing pause has elapsed.
fn tick<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    now: Instant,
) {
    if view_data.debounce.fire(now) {
        reload_or_report(state, runtime, view_data, internal_tx);
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.notice_level = None;
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn emit_notice(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    notice: Notice,
) {
    emit_status(state, view_data, internal_tx, notice.message);
    view_data.notice_level = Some(notice.level);
}

fn handle_key_event<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    match state.mode {
        AppMode::EditCell => {
            handle_editor_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Filter => {
            handle_filter_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_nav_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => return true,
        (KeyCode::Char('j') | KeyCode::Down, _) => move_row(view_data, 1),
        (KeyCode::Char('k') | KeyCode::Up, _) => move_row(view_data, -1),
        (KeyCode::Char('l') | KeyCode::Right, _) => move_col(view_data, 1),
        (KeyCode::Char('h') | KeyCode::Left, _) => move_col(view_data, -1),
        (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
            view_data.selected_row = 0;
        }
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => {
            view_data.selected_row = view_data.grid.len().saturating_sub(1);
        }
        (KeyCode::Enter | KeyCode::Char('e'), _) => start_cell_edit(state, view_data, internal_tx),
        (KeyCode::Char('/'), _) => {
            view_data.filter_buffer = view_data
                .query
                .filter(SEARCH_FILTER)
                .unwrap_or_default()
                .to_owned();
            state.dispatch(AppCommand::StartFilter);
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) => {
            view_data.filter_buffer.clear();
            if view_data.query.clear_filters() {
                reload_or_report(state, runtime, view_data, internal_tx);
                emit_status(state, view_data, internal_tx, "filters cleared");
            }
        }
        (KeyCode::Char('s'), KeyModifiers::NONE) => toggle_sort(state, runtime, view_data, internal_tx),
        (KeyCode::Char('n') | KeyCode::PageDown, _) => {
            if view_data.query.next_page(view_data.total) {
                view_data.selected_row = 0;
                reload_or_report(state, runtime, view_data, internal_tx);
            }
        }
        (KeyCode::Char('p') | KeyCode::PageUp, _) => {
            if view_data.query.prev_page() {
                view_data.selected_row = 0;
                reload_or_report(state, runtime, view_data, internal_tx);
            }
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            if reload_or_report(state, runtime, view_data, internal_tx) {
                emit_status(state, view_data, internal_tx, "reloaded");
            }
        }
        (KeyCode::Char('u'), KeyModifiers::NONE) => {
            let pending = view_data.controller.begin_revert(&mut view_data.grid);
            dispatch_pending(state, runtime, view_data, internal_tx, pending);
        }
        (KeyCode::Tab, _) => {
            switch_resource(state, runtime, view_data, internal_tx, AppCommand::NextResource);
        }
        (KeyCode::BackTab, _) => {
            switch_resource(state, runtime, view_data, internal_tx, AppCommand::PrevResource);
        }
        (KeyCode::Char(digit @ '1'..='4'), KeyModifiers::NONE) => {
            let index = digit
                .to_digit(10)
                .and_then(|number| usize::try_from(number).ok())
                .and_then(|number| number.checked_sub(1));
            if let Some(resource) = index.and_then(|index| ResourceKind::ALL.get(index)) {
                switch_resource(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    AppCommand::SelectResource(*resource),
                );
            }
        }
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        _ => {}
    }
    false
}

fn move_row(view_data: &mut ViewData, delta: isize) {
    let len = view_data.grid.len();
    if len == 0 {
        view_data.selected_row = 0;
        return;
    }
    let next = view_data.selected_row.saturating_add_signed(delta);
    view_data.selected_row = next.min(len - 1);
}

fn move_col(view_data: &mut ViewData, delta: isize) {
    let len = view_data.grid.columns().len();
    if len == 0 {
        return;
    }
    let next = view_data.selected_col.saturating_add_signed(delta);
    view_data.selected_col = next.min(len - 1);
}

fn start_cell_edit(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let (Some(row), Some(column)) = (
        view_data.grid.row_at(view_data.selected_row),
        view_data.grid.columns().get(view_data.selected_col),
    ) else {
        emit_status(state, view_data, internal_tx, "no cell selected");
        return;
    };

    if row.is_skeleton() {
        emit_status(state, view_data, internal_tx, "row is still loading");
        return;
    }
    let cell = build_cell(row, column, &view_data.lookup);
    if !cell.editable {
        let message = format!("{} is read-only", column.label);
        emit_status(state, view_data, internal_tx, message);
        return;
    }

    let value = row.value(&column.field);
    let option_index = cell
        .options
        .iter()
        .position(|option| values_equal(&option.value, &value));
    let buffer = match option_index {
        Some(index) => cell.options[index].label.clone(),
        None => edit_text(&value),
    };
    view_data.editor = Some(CellEditor {
        row_id: row.id,
        field: column.field.clone(),
        buffer,
        options: cell.options,
        option_index,
    });
    state.dispatch(AppCommand::StartCellEdit);
}

fn handle_editor_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(editor) = view_data.editor.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            view_data.editor = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Enter => commit_cell_edit(state, runtime, view_data, internal_tx),
        KeyCode::Up | KeyCode::BackTab => cycle_option(editor, -1),
        KeyCode::Down | KeyCode::Tab => cycle_option(editor, 1),
        KeyCode::Backspace => {
            editor.buffer.pop();
            editor.option_index = None;
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            editor.buffer.clear();
            editor.option_index = None;
        }
        KeyCode::Char(ch) => {
            editor.buffer.push(ch);
            editor.option_index = None;
        }
        _ => {}
    }
}

fn cycle_option(editor: &mut CellEditor, delta: isize) {
    let len = editor.options.len();
    if len == 0 {
        return;
    }
    let index = match editor.option_index {
        Some(index) => wrap_index(index, delta, len),
        None if delta < 0 => len - 1,
        None => 0,
    };
    editor.option_index = Some(index);
    editor.buffer = editor.options[index].label.clone();
}

fn commit_cell_edit<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(editor) = view_data.editor.take() else {
        return;
    };
    state.dispatch(AppCommand::ExitToNav);

    let edit = match view_data.grid.commit_input(
        editor.row_id,
        &editor.field,
        &editor.buffer,
        &view_data.lookup,
    ) {
        Ok(edit) => edit,
        Err(error) => {
            emit_notice(
                state,
                view_data,
                internal_tx,
                Notice::error(format!("{error:#}")),
            );
            return;
        }
    };
    let pending = view_data.controller.begin(edit);
    dispatch_pending(state, runtime, view_data, internal_tx, pending);
}

/// Hands a pending edit to the runtime. If it cannot even be dispatched the
/// edit resolves as a failure so the optimistic value is rolled back.
fn dispatch_pending<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    pending: std::result::Result<PendingEdit, SkipReason>,
) {
    let pending = match pending {
        Ok(pending) => pending,
        Err(SkipReason::Unchanged) => {
            emit_status(state, view_data, internal_tx, "no change");
            return;
        }
        Err(SkipReason::NothingToRevert) => {
            emit_status(state, view_data, internal_tx, "nothing to revert");
            return;
        }
        Err(SkipReason::UndoReplay) => return,
    };

    let request = view_data.controller.patch_request(&pending);
    let path = request.path.clone();
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("saving {}", pending.field),
    );
    if let Err(error) = runtime.spawn_patch(
        view_data.generation,
        pending.clone(),
        request,
        internal_tx.clone(),
    ) {
        let result = Err(RequestError::Connection {
            url: path,
            message: format!("{error:#}"),
        });
        let outcome = view_data
            .controller
            .resolve(&mut view_data.grid, pending, result);
        if let Some(notice) = outcome.notice() {
            emit_notice(state, view_data, internal_tx, notice.clone());
        }
    }
}

fn handle_filter_key<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.filter_buffer.clear();
            state.dispatch(AppCommand::ExitToNav);
            view_data.debounce.cancel();
            if view_data.query.set_filter(SEARCH_FILTER, "") {
                reload_or_report(state, runtime, view_data, internal_tx);
            }
        }
        KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            if view_data.debounce.is_pending() {
                reload_or_report(state, runtime, view_data, internal_tx);
            }
        }
        KeyCode::Backspace => {
            view_data.filter_buffer.pop();
            apply_filter_input(view_data, Instant::now());
        }
        KeyCode::Char(ch) => {
            view_data.filter_buffer.push(ch);
            apply_filter_input(view_data, Instant::now());
        }
        _ => {}
    }
}

fn apply_filter_input(view_data: &mut ViewData, now: Instant) {
    if view_data
        .query
        .set_filter(SEARCH_FILTER, &view_data.filter_buffer)
    {
        view_data.debounce.touch(now);
    }
}

fn toggle_sort<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(column) = view_data.grid.columns().get(view_data.selected_col) else {
        return;
    };
    let (field, label) = (column.field.clone(), column.label.clone());
    view_data.query.toggle_ordering(&field);
    let message = match view_data.query.ordering() {
        Some(ordering) if ordering.direction == SortDirection::Asc => format!("sorted by {label} asc"),
        Some(_) => format!("sorted by {label} desc"),
        None => "sort cleared".to_owned(),
    };
    view_data.selected_row = 0;
    if reload_or_report(state, runtime, view_data, internal_tx) {
        emit_status(state, view_data, internal_tx, message);
    }
}

fn switch_resource<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    let Some(resource) = events.iter().find_map(|event| match event {
        AppEvent::ResourceChanged(resource) => Some(*resource),
        _ => None,
    }) else {
        return;
    };
    tracing::debug!(resource = resource.as_str(), "switching resource");
    view_data.controller.cancel_all();
    view_data.reset_for(resource);
    reload_or_report(state, runtime, view_data, internal_tx);
}

/// Replaces the grid with the page the current query selects. Edits still in
/// flight stay tracked and resolve against the reloaded rows when their
/// responses arrive.
fn reload_page<R: GridRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.debounce.cancel();
    let page = runtime
        .load_page(state.resource, view_data.query.query_params())
        .with_context(|| format!("load {}", state.resource.label()))?;
    let rows = page
        .results
        .into_iter()
        .map(Row::from_record)
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(
        resource = state.resource.as_str(),
        rows = rows.len(),
        total = page.count,
        "page loaded"
    );
    view_data.total = page.count;
    view_data.grid.set_rows(rows);
    view_data.selected_row = view_data
        .selected_row
        .min(view_data.grid.len().saturating_sub(1));
    Ok(())
}

fn reload_or_report<R: GridRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) -> bool {
    match reload_page(state, runtime, view_data) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!("load failed: {error:#}");
            emit_notice(
                state,
                view_data,
                internal_tx,
                Notice::error(format!("load failed: {error:#}")),
            );
            false
        }
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = ResourceKind::ALL
        .iter()
        .position(|resource| *resource == state.resource)
        .unwrap_or(0);
    let titles = ResourceKind::ALL
        .iter()
        .enumerate()
        .map(|(index, resource)| format!("{} {}", index + 1, resource.label()))
        .collect::<Vec<_>>();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("mlfs").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_table(frame, layout[1], state, view_data);

    let status_color = match view_data.notice_level {
        Some(NoticeLevel::Error) => Color::Red,
        Some(NoticeLevel::Success) => Color::Green,
        None => Color::Yellow,
    };
    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(status_color))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if view_data.help_visible {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let view = build_view(
        view_data.grid.rows(),
        view_data.grid.columns(),
        &view_data.lookup,
    );
    let widths = view
        .columns
        .iter()
        .map(|column| Constraint::Length(column.width))
        .collect::<Vec<_>>();

    let header = TableRow::new(view.columns.iter().map(|column| {
        Cell::from(header_label(view_data, &column.field, &column.label)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let editing = state.mode == AppMode::EditCell;
    let rows = view.rows.iter().enumerate().map(|(row_index, row)| {
        let selected_row = row_index == view_data.selected_row;
        let cells = row
            .cells
            .iter()
            .enumerate()
            .map(|(column_index, cell)| {
                let selected_cell = selected_row && column_index == view_data.selected_col;
                let text = match &view_data.editor {
                    Some(editor) if editing && selected_cell => {
                        format!("{}{EDIT_CARET}", editor.buffer)
                    }
                    _ => cell.text.clone(),
                };
                let mut style = Style::default();
                if row.skeleton {
                    style = style.fg(Color::DarkGray);
                } else if !cell.editable {
                    style = style.fg(Color::Gray);
                }
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_cell {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(if editing { Color::Yellow } else { Color::Cyan })
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(text).style(style)
            })
            .collect::<Vec<_>>();
        TableRow::new(cells)
    });

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(state, view_data))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn header_label(view_data: &ViewData, field: &str, label: &str) -> String {
    match view_data.query.ordering() {
        Some(ordering) if ordering.field == field => {
            let mark = match ordering.direction {
                SortDirection::Asc => SORT_MARK_ASC,
                SortDirection::Desc => SORT_MARK_DESC,
            };
            format!("{label} {mark}")
        }
        _ => label.to_owned(),
    }
}

fn table_title(state: &AppState, view_data: &ViewData) -> String {
    let pagination = view_data.query.pagination();
    let mut title = format!(
        "{} | page {}/{} | {} rows",
        state.resource.label(),
        pagination.page,
        pagination.page_count(view_data.total),
        view_data.total
    );
    if let Some(search) = view_data.query.filter(SEARCH_FILTER) {
        title.push_str(&format!(" | search: {search}"));
    }
    title
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let (mode, hints) = match state.mode {
        AppMode::Nav => (
            "NAV",
            "j/k/h/l | enter edit | / search c | s sort | n/p page | u revert | tab 1-4 | ? | ctrl+q",
        ),
        AppMode::EditCell => ("EDIT", "enter save | esc cancel | up/down choose"),
        AppMode::Filter => ("SEARCH", "enter done | esc clear"),
    };
    let mode = if state.mode == AppMode::Filter {
        format!("{mode} {}{EDIT_CARET}", view_data.filter_buffer)
    } else {
        mode.to_owned()
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "j/k/h/l or arrows  move\n\
     g/G                first/last row\n\
     enter or e         edit cell\n\
     up/down            cycle choices while editing\n\
     /                  search (refetches after a pause)\n\
     c                  clear filters\n\
     s                  sort by column (asc, desc, off)\n\
     n/p                next/previous page\n\
     u                  revert last change\n\
     r                  reload page\n\
     tab, 1-4           switch resource\n\
     ctrl+q             quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
