//! Text renderers for a finished register map.

use regmap_core::{ConstantValue, DataCells, DocRow, RegionDefinitions};

/// Fixed documentation table header, two rows.
pub const TABLE_HEADER: &str = "\
| Reg Hex | Reg Dec | Group | Name | Data |||||||| Comment
| ^^ | ^^ | ^^ | ^^ | bit 7 | bit 6 | bit 5 | bit 4 | bit 3 | bit 2 | bit 1 | bit 0 | ^^ |
";

/// Everything a renderer may draw from.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// Emitted constants, one entry per region.
    pub definitions: &'a [RegionDefinitions],
    /// Documentation rows.
    pub rows: &'a [DocRow],
}

/// Serializes a register map to one output format.
pub trait Renderer {
    /// Renders the complete artifact.
    fn render(&self, input: &RenderInput<'_>) -> String;
}

/// C preprocessor header with one `#define` per constant.
#[derive(Debug, Clone)]
pub struct HeaderRenderer {
    /// Prepended to every constant name.
    pub prefix: String,
    /// Column values are aligned to.
    pub tab_stop: usize,
}

impl Renderer for HeaderRenderer {
    fn render(&self, input: &RenderInput<'_>) -> String {
        let mut out = String::new();
        for region in input.definitions {
            out.push('\n');
            out.push_str(&format!("/* Region {}: {} */\n", region.region, region.access));
            for constant in &region.constants {
                let (indent, value) = match constant.value {
                    ConstantValue::Address(address) => ("", address.to_string()),
                    ConstantValue::BitRange { high, low } => {
                        ("   ", format!("GENMASK({high}, {low})"))
                    }
                };
                let define = format!("{indent}#define {}{}", self.prefix, constant.name);
                out.push_str(&pad_to_tab_stop(&define, self.tab_stop));
                out.push_str(&value);
                out.push('\n');
            }
        }
        out
    }
}

/// Pads `text` with spaces up to the next multiple of `tab_stop`, the way a
/// tab expands. A zero tab stop collapses to a single space.
#[must_use]
pub fn pad_to_tab_stop(text: &str, tab_stop: usize) -> String {
    let column = text.chars().count();
    let pad = if tab_stop == 0 {
        1
    } else {
        tab_stop - column % tab_stop
    };
    format!("{text}{}", " ".repeat(pad))
}

/// Markdown documentation table.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    /// Emit one row per register byte after the header.
    pub doc_rows: bool,
}

impl Renderer for MarkdownRenderer {
    fn render(&self, input: &RenderInput<'_>) -> String {
        let mut out = String::from(TABLE_HEADER);
        if self.doc_rows {
            for row in input.rows {
                out.push_str(&format_row(row));
            }
        }
        out
    }
}

fn format_row(row: &DocRow) -> String {
    let group = row.group.as_deref().unwrap_or("^^");
    let data = match &row.data {
        DataCells::Span(text) => format!("{text} ||||||||"),
        DataCells::Bits(bits) => {
            let cells: Vec<&str> = bits.iter().map(|b| b.as_deref().unwrap_or(" ")).collect();
            format!("{} |", cells.join(" | "))
        }
    };
    format!(
        "| 0x{:02X} | {} | {group} | {} | {data} {} |\n",
        row.address, row.address, row.name, row.access
    )
}
