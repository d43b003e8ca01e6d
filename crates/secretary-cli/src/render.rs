//! Rendering of interpreter responses for the terminal.

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;

use secretary_core::command::ItemDetail;
use secretary_core::store::{FieldDef, Item, Tag};
use secretary_core::{Payload, Response, Severity};

#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    pub color: bool,
    pub quiet: bool,
}

/// Borderless table with a dim header, like a plain listing.
fn simple_table(ctx: &UiContext, headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|header| {
            let mut cell = Cell::new(header);
            if ctx.color {
                cell = cell.add_attribute(Attribute::Dim);
            }
            cell
        })
        .collect();
    table.set_header(header_cells);
    for i in 0..headers.len() {
        if let Some(column) = table.column_mut(i) {
            column.set_padding((0, 2));
        }
    }
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}

fn tags(ctx: &UiContext, tags: &[Tag]) -> String {
    let rows = tags
        .iter()
        .map(|tag| vec![tag.id.to_string(), tag.name.clone(), tag.count.to_string()])
        .collect();
    simple_table(ctx, &["ID", "TAG", "USED"], rows)
}

fn fields(ctx: &UiContext, fields: &[FieldDef]) -> String {
    let rows = fields
        .iter()
        .map(|field| {
            vec![
                field.id.to_string(),
                field.name.clone(),
                if field.sensitive { "yes" } else { "" }.to_string(),
                field.count.to_string(),
            ]
        })
        .collect();
    simple_table(ctx, &["ID", "FIELD", "SENSITIVE", "USED"], rows)
}

fn items(ctx: &UiContext, items: &[Item]) -> String {
    let rows = items
        .iter()
        .map(|item| vec![item.id.to_string(), item.modified(), item.name.clone()])
        .collect();
    simple_table(ctx, &["ID", "MODIFIED", "NAME"], rows)
}

fn label(ctx: &UiContext, text: &str) -> String {
    if ctx.color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

fn detail(ctx: &UiContext, detail: &ItemDetail) -> String {
    let item = &detail.item;
    let mut lines = vec![
        format!("{} {}", label(ctx, "Item:    "), item.name),
        format!("{} {}", label(ctx, "Id:      "), item.id),
        format!("{} {}", label(ctx, "Modified:"), item.modified()),
        format!("{} {}", label(ctx, "Tags:    "), detail.tags.join(", ")),
    ];
    if !detail.fields.is_empty() {
        let rows = detail
            .fields
            .iter()
            .map(|value| vec![value.id.to_string(), value.name.clone(), value.value.clone()])
            .collect();
        lines.push(simple_table(ctx, &["ID", "FIELD", "VALUE"], rows));
    }
    if !item.note.is_empty() {
        lines.push(label(ctx, "Note:"));
        lines.push(item.note.clone());
    }
    lines.join("\n")
}

fn payload(ctx: &UiContext, payload: &Payload) -> String {
    match payload {
        Payload::Tags(list) if !list.is_empty() => tags(ctx, list),
        Payload::Fields(list) if !list.is_empty() => fields(ctx, list),
        Payload::Items(list) if !list.is_empty() => items(ctx, list),
        Payload::Detail(item) => detail(ctx, item),
        other => other.to_string().trim_end().to_string(),
    }
}

/// Text to print for `response`, or `None` when there is nothing to show.
pub fn render(ctx: &UiContext, response: &Response) -> Option<String> {
    let body = payload(ctx, &response.payload);
    let prefix = match response.severity {
        Severity::Ok => {
            let chatter = matches!(response.payload, Payload::Message(_));
            if body.is_empty() || (ctx.quiet && chatter) {
                return None;
            }
            return Some(body);
        }
        Severity::Warning => "Warning:",
        Severity::Error => "Error:",
        Severity::Exception => "Exception:",
    };
    let prefix = match (ctx.color, response.severity) {
        (false, _) => prefix.to_string(),
        (true, Severity::Warning) => prefix.yellow().to_string(),
        (true, _) => prefix.red().bold().to_string(),
    };
    Some(format!("{} {}", prefix, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: UiContext = UiContext {
        color: false,
        quiet: false,
    };

    #[test]
    fn test_severity_prefix_without_color() {
        assert_eq!(
            render(&PLAIN, &Response::warning("no database")).as_deref(),
            Some("Warning: no database")
        );
        assert_eq!(
            render(&PLAIN, &Response::error("unknown command")).as_deref(),
            Some("Error: unknown command")
        );
    }

    #[test]
    fn test_quiet_hides_confirmations_only() {
        let quiet = UiContext {
            quiet: true,
            ..PLAIN
        };
        assert_eq!(render(&quiet, &Response::done("tag web added")), None);
        assert_eq!(
            render(&quiet, &Response::ok(Payload::Count(3))).as_deref(),
            Some("3")
        );
        assert!(render(&quiet, &Response::error("x")).is_some());
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(
            render(&PLAIN, &Response::ok(Payload::Items(Vec::new()))).as_deref(),
            Some("no items")
        );
        assert_eq!(render(&PLAIN, &Response::empty()), None);
    }

    #[test]
    fn test_tag_table() {
        let out = render(
            &PLAIN,
            &Response::ok(Payload::Tags(vec![Tag {
                id: 1,
                name: "web".to_string(),
                count: 2,
            }])),
        )
        .unwrap();
        assert!(out.contains("TAG"));
        assert!(out.contains("web"));
    }
}
