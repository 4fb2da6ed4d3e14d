//! Terminal rendering of classifications, focus views and filter lists.

use crate::color::highlight_color;
use crate::engine::{Classification, CombinedMatcher, classify_line_ranges, split_lines};
use crate::filter::FilterId;
use crate::focus::FocusView;
use crate::project::Project;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use std::collections::HashMap;
use std::fmt::Write;

/// The document with matched lines marked by their winner.
///
/// In color, the line number takes the winner's color and every matched range
/// is painted in the color of the filter that matched it. Without color,
/// matched lines are marked with `>` and tagged with the winning filter's name.
pub fn format_highlight(
    text: &str,
    classification: &Classification,
    matcher: &CombinedMatcher,
    project: &Project,
    use_color: bool,
) -> String {
    let names: HashMap<FilterId, (&str, u16)> = project
        .filters()
        .iter()
        .map(|f| (f.id(), (f.name(), f.hue())))
        .collect();

    let mut out = String::new();
    for (number, line) in split_lines(text).enumerate() {
        let line = line.trim_end_matches('\r');
        let winner = classification
            .winner(number)
            .and_then(|id| names.get(&id).copied());

        match winner {
            Some((_, hue)) if use_color => {
                let rgb = highlight_color(hue);
                let gutter = format!("{:>6}", number + 1);
                let _ = write!(
                    out,
                    "{}  ",
                    gutter.as_str().on_truecolor(rgb.r, rgb.g, rgb.b).bright_white()
                );
                for (segment, filter) in line_segments(line, matcher) {
                    match filter.and_then(|id| names.get(&id)) {
                        Some(&(_, hue)) => {
                            let rgb = highlight_color(hue);
                            let _ = write!(
                                out,
                                "{}",
                                segment.on_truecolor(rgb.r, rgb.g, rgb.b).bright_white()
                            );
                        }
                        None => out.push_str(segment),
                    }
                }
                out.push('\n');
            }
            Some((name, _)) => {
                let _ = writeln!(out, ">{:>5}  {}  [{}]", number + 1, line, name);
            }
            None => {
                let _ = writeln!(out, "{:>6}  {}", number + 1, line);
            }
        }
    }
    out
}

/// Cut `line` into consecutive pieces; matched pieces carry their filter.
/// Concatenating the pieces gives back the line.
pub fn line_segments<'a>(
    line: &'a str,
    matcher: &CombinedMatcher,
) -> Vec<(&'a str, Option<FilterId>)> {
    let mut segments = Vec::new();
    let mut pos = 0;
    for range in classify_line_ranges(line, matcher) {
        if range.start > pos {
            segments.push((&line[pos..range.start], None));
        }
        segments.push((&line[range.start..range.end], Some(range.filter)));
        pos = range.end;
    }
    if pos < line.len() {
        segments.push((&line[pos..], None));
    }
    segments
}

/// Per-filter counts: lines matched and lines won
pub fn format_summary(classification: &Classification, project: &Project) -> String {
    let won = classification.winning_lines();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} of {} lines matched",
        classification.winners().len(),
        classification.line_count()
    );
    for filter in project.filters() {
        let Some(matched) = classification.lines_for(filter.id()) else {
            continue;
        };
        let _ = writeln!(
            out,
            "  {:<24} matched {:>6}  won {:>6}",
            filter.name(),
            matched.len(),
            won.get(&filter.id()).map_or(0, |lines| lines.len())
        );
    }
    out
}

/// Focus view rows, one per output line, optionally prefixed with original
/// 1-based line numbers
pub fn format_focus(view: &FocusView, line_numbers: bool) -> String {
    let mut out = String::new();
    for (line, text) in view.visible_rows() {
        if line_numbers {
            let _ = writeln!(out, "{:>6}: {}", line + 1, text);
        } else {
            let _ = writeln!(out, "{text}");
        }
    }
    out
}

pub fn filters_table(project: &Project) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Name",
            "Pattern",
            "Mode",
            "Priority",
            "Focus",
            "Highlight",
            "Color",
            "Group",
        ]);

    for filter in project.filters() {
        let group = filter
            .group_id()
            .and_then(|id| project.group(id))
            .map(|g| g.name.clone())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(filter.name()),
            Cell::new(filter.pattern().source()),
            Cell::new(filter.pattern().mode()),
            Cell::new(filter.priority()),
            Cell::new(filter.disposition()),
            Cell::new(if filter.highlight_enabled() { "on" } else { "off" }),
            Cell::new(highlight_color(filter.hue()).to_hex()),
            Cell::new(group),
        ]);
    }
    table
}
