use ratatui::{
    Frame,
    layout::{Layout, Direction, Constraint, Rect, Alignment},
    widgets::{Block, Borders, BorderType, List, ListItem, ListState, Paragraph, Wrap, Clear},
    style::{Style, Modifier},
    text::{Line, Span},
};
use crate::app::{App, Pane};
use crate::game_record::{self, GameRecord};
use crate::theme::ColorScheme;
use crate::types::{Block as ChainBlock, ChainRef, ChainView, MempoolEntry, MoveEntry, NodeBundle};
use crate::util_text::{format_clock, format_timestamp, plural, pretty_json, truncate, truncate_key, KEY_EDGE};

/// Cap for entries shown as raw JSON
const RAW_JSON_LIMIT: usize = 2 * 1024;

// ===============================
// Top-level draw
// ===============================
pub fn draw(f:&mut Frame, app:&App){
    let c = app.theme().colors();
    let show_banner = app.error().is_some();

    let mut constraints: Vec<Constraint> = Vec::with_capacity(4);
    constraints.push(Constraint::Length(2));                      // header
    if show_banner { constraints.push(Constraint::Length(3)); }   // error / no-data banner
    constraints.push(Constraint::Min(0));                         // body
    constraints.push(Constraint::Length(2));                      // footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    let mut idx = 0usize;
    header(f, chunks[idx], app, &c); idx += 1;
    if show_banner {
        banner(f, chunks[idx], app, &c); idx += 1;
    }
    body(f, chunks[idx], app, &c); idx += 1;
    footer(f, chunks[idx], app, &c);

    if let Some(block) = app.selection().block() {
        draw_block_popup(f, app, block, &c);
    }
}

// ===============================
// Header / banner / footer
// ===============================
fn header(f:&mut Frame, area:Rect, app:&App, c:&ColorScheme){
    let mut spans = vec![
        Span::styled("chainview", Style::default().fg(c.accent).add_modifier(Modifier::BOLD)),
        Span::raw(format!(" · {} mode", app.mode())),
    ];
    if let Some(s) = app.snapshot() {
        spans.push(Span::raw(format!(" · {}", plural(s.len(), "node", "nodes"))));
    }
    if app.skipped_files() > 0 {
        spans.push(Span::styled(
            format!(" · {} skipped", plural(app.skipped_files(), "file", "files")),
            Style::default().fg(c.pending),
        ));
    }
    spans.push(Span::raw(" │ "));
    if app.is_refreshing() {
        spans.push(Span::styled("Updating…", Style::default().fg(c.pending).add_modifier(Modifier::BOLD)));
    } else if let Some(t) = app.last_refresh() {
        spans.push(Span::styled(format!("Last updated: {}", format_clock(t)), Style::default().fg(c.text_dim)));
    } else {
        spans.push(Span::styled("Loading…", Style::default().fg(c.text_dim)));
    }
    spans.push(Span::raw(" │ "));
    spans.push(if app.auto_refresh() {
        Span::styled("auto ●", Style::default().fg(c.complete))
    } else {
        Span::styled("auto ○", Style::default().fg(c.text_dim))
    });

    let w = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::BOTTOM).border_type(BorderType::Plain));
    f.render_widget(w, area);
}

fn banner(f:&mut Frame, area:Rect, app:&App, c:&ColorScheme){
    let msg = app.error().unwrap_or("");
    let w = Paragraph::new(msg)
        .style(Style::default().fg(c.banner_error).add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true })
        .block(Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(c.banner_error)));
    f.render_widget(w, area);
}

fn footer(f:&mut Frame, area:Rect, app:&App, c:&ColorScheme){
    let key = |k: &'static str| Span::styled(k, Style::default().fg(c.focus_border));
    let mut spans: Vec<Span> = vec![
        key("Tab"), Span::raw(" switch │ "),
        key("Enter"), Span::raw(" open │ "),
        key("Esc"), Span::raw(" back │ "),
        key("r"), Span::raw(" refresh │ "),
        key("a"), Span::raw(" auto refresh │ "),
        key("q"), Span::raw(" quit"),
    ];
    if let Some(toast) = app.toast_message() {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(toast, Style::default().fg(c.pending).add_modifier(Modifier::BOLD)));
    }
    spans.push(Span::raw(format!(" │ FPS {}", app.fps())));

    let w = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::TOP).border_type(BorderType::Plain));
    f.render_widget(w, area);
}

// ===============================
// Body
// ===============================
fn body(f:&mut Frame, area:Rect, app:&App, c:&ColorScheme){
    if app.snapshot().is_none() {
        let msg = if app.error().is_some() { "" } else { "Reading snapshot directory…" };
        f.render_widget(Paragraph::new(msg).alignment(Alignment::Center).style(Style::default().fg(c.text_dim)), area);
        return;
    }

    // Stack vertically on narrow terminals
    const NARROW_THRESHOLD: u16 = 80;
    let direction = if area.width < NARROW_THRESHOLD { Direction::Vertical } else { Direction::Horizontal };
    let cols = Layout::default()
        .direction(direction)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(20), Constraint::Percentage(55)])
        .split(area);

    render_nodes_pane(f, cols[0], app, c);
    render_chains_pane(f, cols[1], app, c);
    render_entries_pane(f, cols[2], app, c);
}

fn pane_block<'a>(title: String, focused: bool, c: &ColorScheme) -> Block<'a> {
    let title = if focused { format!(" [ {title} ] ") } else { format!(" {title} ") };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(if focused { BorderType::Double } else { BorderType::Rounded })
        .border_style(Style::default()
            .fg(if focused { c.focus_border } else { c.unfocused_border })
            .add_modifier(if focused { Modifier::BOLD } else { Modifier::empty() }))
}

fn highlight(c: &ColorScheme) -> Style {
    Style::default().bg(c.selection_bg).fg(c.selection_fg).add_modifier(Modifier::BOLD)
}

fn render_nodes_pane(f: &mut Frame, area: Rect, app: &App, c: &ColorScheme) {
    let nodes = app.nodes();
    let selected_id = app.selection().node_id();

    let items: Vec<ListItem> = nodes.iter().map(|b| {
        let marker = if Some(b.node_id.as_str()) == selected_id { "▶ " } else { "  " };
        ListItem::new(vec![
            Line::from(vec![
                Span::raw(marker),
                Span::styled(format!("Node {}", b.node_id), Style::default().fg(c.accent).add_modifier(Modifier::BOLD)),
            ]),
            Line::styled(format!("    {}", node_summary(b)), Style::default().fg(c.text_dim)),
        ])
    }).collect();

    let mut state = ListState::default();
    if !nodes.is_empty() { state.select(Some(app.node_cursor())); }

    let w = List::new(items)
        .highlight_style(highlight(c))
        .block(pane_block(format!("Nodes ({})", nodes.len()), app.pane() == Pane::Nodes, c));
    f.render_stateful_widget(w, area, &mut state);
}

/// "3 blocks · 2 pending · 1 complete game"
pub fn node_summary(b: &NodeBundle) -> String {
    let mut parts = Vec::new();
    if let Some(chain) = &b.blockchain {
        parts.push(plural(chain.len(), "block", "blocks"));
    }
    if let Some(pool) = &b.mempool {
        parts.push(format!("{} pending", pool.len()));
    }
    if let Some(games) = &b.complete_games {
        parts.push(plural(games.len(), "complete game", "complete games"));
    }
    parts.join(" · ")
}

fn render_chains_pane(f: &mut Frame, area: Rect, app: &App, c: &ColorScheme) {
    let chains = app.chains();
    let selected = app.selection().chain_ref();
    let bundle = app.selection().bundle();

    let items: Vec<ListItem> = chains.iter().map(|chain| {
        let count = bundle.and_then(|b| b.chain(*chain)).map(|v| chain_count(*chain, &v)).unwrap_or_default();
        let marker = if Some(*chain) == selected { "▶ " } else { "  " };
        ListItem::new(Line::from(vec![
            Span::raw(marker),
            Span::styled(chain.to_string(), Style::default().fg(c.text)),
            Span::styled(format!("  {count}"), Style::default().fg(c.text_dim)),
        ]))
    }).collect();

    let mut state = ListState::default();
    if !chains.is_empty() { state.select(Some(app.chain_cursor())); }

    let title = match app.selection().node_id() {
        Some(id) => format!("Node {id}"),
        None => "Chains".to_string(),
    };
    let w = List::new(items)
        .highlight_style(highlight(c))
        .block(pane_block(title, app.pane() == Pane::Chains, c));
    f.render_stateful_widget(w, area, &mut state);
}

/// "K blocks" for block chains, "K pending moves" for the mempool.
pub fn chain_count(chain: ChainRef, view: &ChainView<'_>) -> String {
    if chain.has_blocks() {
        plural(view.len(), "block", "blocks")
    } else {
        plural(view.len(), "pending move", "pending moves")
    }
}

fn render_entries_pane(f: &mut Frame, area: Rect, app: &App, c: &ColorScheme) {
    let focused = app.pane() == Pane::Entries;
    let (Some(chain), Some(view)) = (app.selection().chain_ref(), app.entries()) else {
        let w = Paragraph::new("Select a chain")
            .style(Style::default().fg(c.text_dim))
            .block(pane_block("Entries".to_string(), focused, c));
        f.render_widget(w, area);
        return;
    };

    let title = format!("{chain} · {}", chain_count(chain, &view));
    let items: Vec<ListItem> = match view {
        ChainView::Blocks(blocks) => blocks.iter().map(|b| block_row(b, c)).collect(),
        ChainView::Mempool(entries) if entries.is_empty() => {
            vec![ListItem::new(Line::styled("No pending moves in the mempool", Style::default().fg(c.text_dim)))]
        }
        ChainView::Mempool(entries) => entries.iter().map(|e| mempool_row(e, c)).collect(),
    };

    let mut state = ListState::default();
    if !view.is_empty() { state.select(Some(app.entry_cursor())); }

    let w = List::new(items)
        .highlight_style(highlight(c))
        .block(pane_block(title, focused, c));
    f.render_stateful_widget(w, area, &mut state);
}

fn block_row<'a>(b: &ChainBlock, c: &ColorScheme) -> ListItem<'a> {
    let mut spans = vec![
        Span::styled(format!("#{:<4}", b.index), Style::default().fg(c.accent).add_modifier(Modifier::BOLD)),
        Span::styled(truncate(&b.hash, 20), Style::default().fg(c.key)),
    ];
    if !b.games.is_empty() {
        spans.push(Span::raw(format!("  {}", plural(b.games.len(), "game", "games"))));
    }
    if !b.moves.is_empty() {
        spans.push(Span::raw(format!("  {}", plural(b.moves.len(), "move", "moves"))));
    }
    spans.push(Span::styled(format!("  {}", format_timestamp(b.timestamp)), Style::default().fg(c.text_dim)));
    ListItem::new(Line::from(spans))
}

fn mempool_row<'a>(e: &MempoolEntry, c: &ColorScheme) -> ListItem<'a> {
    match e {
        MempoolEntry::Text(text) => {
            let r = game_record::parse(text);
            ListItem::new(Line::from(vec![
                Span::styled(format!("Game {}", r.game_id), Style::default().fg(c.accent)),
                Span::raw(format!("  {}", plural(r.players.len(), "player", "players"))),
                Span::styled(format!("  {}", plural(r.moves.len(), "move", "moves")), Style::default().fg(c.text_dim)),
            ]))
        }
        MempoolEntry::Move(m) => ListItem::new(move_line(m, c)),
        MempoolEntry::Raw(v) => {
            let style = Style::default().fg(c.text_dim);
            ListItem::new(pretty_json(v, RAW_JSON_LIMIT).lines().map(|l| Line::styled(l.to_string(), style)).collect::<Vec<_>>())
        }
    }
}

fn move_line<'a>(m: &MoveEntry, c: &ColorScheme) -> Line<'a> {
    let mut spans = Vec::new();
    let id = m.id_text();
    if !id.is_empty() {
        spans.push(Span::styled(format!("{id}: "), Style::default().fg(c.text_dim)));
    }
    spans.push(Span::styled(truncate_key(&m.sender, KEY_EDGE), Style::default().fg(c.key)));
    spans.push(Span::raw(" → "));
    spans.push(Span::styled(truncate_key(&m.receiver, KEY_EDGE), Style::default().fg(c.key)));
    spans.push(Span::styled(format!("  {}", m.payload()), Style::default().fg(c.text).add_modifier(Modifier::BOLD)));
    Line::from(spans)
}

// ===============================
// Block popup
// ===============================
fn draw_block_popup(f: &mut Frame, app: &App, block: &ChainBlock, c: &ColorScheme) {
    let area = f.area();
    let width = (area.width * 8) / 10;
    let height = (area.height * 8) / 10;
    let overlay = Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    f.render_widget(Clear, overlay);

    let chain = app.selection().chain_ref().map(|r| r.to_string()).unwrap_or_default();
    let w = Paragraph::new(block_detail_lines(block, c))
        .wrap(Wrap { trim: false })
        .scroll((app.details_scroll(), 0))
        .style(Style::default().fg(c.text).bg(c.background))
        .block(Block::default()
            .title(format!(" {chain} · Block #{} ", block.index))
            .title_bottom(" Esc close · ↑/↓ scroll ")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(c.focus_border)));
    f.render_widget(w, overlay);
}

/// Full detail of one block: header fields, then its moves or game records.
pub fn block_detail_lines(block: &ChainBlock, c: &ColorScheme) -> Vec<Line<'static>> {
    let label = Style::default().fg(c.text_dim);
    let field = |name: &str, value: String, style: Style| {
        Line::from(vec![Span::styled(format!("{name:<15}"), label), Span::styled(value, style)])
    };

    let mut lines = vec![
        field("Index", block.index.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        field("Timestamp", format_timestamp(block.timestamp), Style::default()),
        field("Nonce", block.nonce.to_string(), Style::default()),
        field("Hash", block.hash.clone(), Style::default().fg(c.key)),
        field("Previous Hash", block.previous_hash.clone(), Style::default().fg(c.key)),
    ];
    if let Some(game_id) = block.game_id_text() {
        lines.push(field("Game ID", game_id, Style::default().fg(c.accent)));
    }
    lines.push(Line::raw(""));

    if block.moves.is_empty() && block.games.is_empty() {
        lines.push(Line::styled("No moves in this block", label));
        return lines;
    }

    if !block.moves.is_empty() {
        lines.push(Line::styled(format!("Moves ({})", block.moves.len()), Style::default().fg(c.accent).add_modifier(Modifier::BOLD)));
        lines.extend(block.moves.iter().map(|m| move_line(m, c)));
    }

    for (i, text) in block.games.iter().enumerate() {
        if i > 0 || !block.moves.is_empty() {
            lines.push(Line::raw(""));
        }
        lines.extend(game_record_lines(&game_record::parse(text), c));
    }
    lines
}

fn game_record_lines(r: &GameRecord, c: &ColorScheme) -> Vec<Line<'static>> {
    let label = Style::default().fg(c.text_dim);
    let key = Style::default().fg(c.key);

    let mut title = vec![Span::styled(format!("Game {}", r.game_id), Style::default().fg(c.accent).add_modifier(Modifier::BOLD))];
    if r.game_complete {
        title.push(Span::styled("  [Complete]", Style::default().fg(c.complete).add_modifier(Modifier::BOLD)));
    } else {
        title.push(Span::styled("  [In progress]", Style::default().fg(c.pending)));
    }
    if !r.chain_size.is_empty() {
        title.push(Span::styled(format!("  chain size {}", r.chain_size), label));
    }

    let mut lines = vec![Line::from(title)];
    lines.push(Line::styled("Players", label));
    lines.extend(r.players.iter().map(|p| Line::from(vec![Span::raw("  "), Span::styled(truncate_key(p, KEY_EDGE), key)])));
    lines.push(Line::from(vec![
        Span::styled("Winner  ", label),
        match r.winner() {
            Some(w) => Span::styled(truncate_key(w, KEY_EDGE), Style::default().fg(c.complete)),
            None => Span::styled("none yet", label),
        },
    ]));
    if r.moves.is_empty() {
        lines.push(Line::styled("No moves recorded", label));
    } else {
        lines.push(Line::styled(format!("Moves ({})", r.moves.len()), label));
        lines.extend(r.moves.iter().map(|m| Line::from(vec![
            Span::raw("  "),
            Span::styled(truncate_key(&m.sender, KEY_EDGE), key),
            Span::raw(" → "),
            Span::styled(truncate_key(&m.receiver, KEY_EDGE), key),
            Span::styled(format!("  {}", m.mv), Style::default().add_modifier(Modifier::BOLD)),
        ])));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn block(v: serde_json::Value) -> ChainBlock {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_block_without_moves() {
        let b = block(json!({"index": 3, "hash": "abc", "previousHash": "000"}));
        let out = text(&block_detail_lines(&b, &ColorScheme::default()));
        assert!(out.contains("No moves in this block"));
        assert!(out.contains("abc"));
    }

    #[test]
    fn test_block_with_game_blob() {
        let b = block(json!({
            "index": 1,
            "games": ["Game ID: 9 Players: a b Game Complete: Yes Chain Size: 2 Moves:"]
        }));
        let out = text(&block_detail_lines(&b, &ColorScheme::default()));
        assert!(out.contains("Game 9"));
        assert!(out.contains("[Complete]"));
        assert!(out.contains("none yet"));
    }

    #[test]
    fn test_block_with_move_objects() {
        let b = block(json!({
            "index": 2, "gameId": 4,
            "moves": [{"id": 1, "sender": "s", "receiver": "r", "amount": "e2e4"}]
        }));
        let out = text(&block_detail_lines(&b, &ColorScheme::default()));
        assert!(out.contains("Game ID"));
        assert!(out.contains("Moves (1)"));
        assert!(out.contains("e2e4"));
    }

    #[test]
    fn test_chain_counts() {
        let blocks = vec![block(json!({"index": 0}))];
        assert_eq!(chain_count(ChainRef::Blockchain, &ChainView::Blocks(&blocks)), "1 block");
        assert_eq!(chain_count(ChainRef::Mempool, &ChainView::Mempool(&[])), "0 pending moves");
    }

    #[test]
    fn test_node_summary() {
        let mut b = NodeBundle::new("1");
        b.mempool = Some(vec![]);
        b.complete_games = Some(vec![vec![], vec![]]);
        assert_eq!(node_summary(&b), "0 pending · 2 complete games");
    }
}
