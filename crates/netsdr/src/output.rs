use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use netsdr_frame::{Frame, FrameKind};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'a str,
    family: &'a str,
    discriminator: String,
    item: &'a str,
    body_size: usize,
    body: String,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: kind_name(frame.kind),
                family: family_name(frame.kind),
                discriminator: format!("0x{:04X}", frame.discriminator),
                item: frame.item().name(),
                body_size: frame.body.len(),
                body: hex_preview(frame.body.as_ref()),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ITEM", "DISCRIMINATOR", "SIZE", "BODY"])
                .add_row(vec![
                    kind_name(frame.kind).to_string(),
                    frame.item().name().to_string(),
                    format!("0x{:04X}", frame.discriminator),
                    frame.body.len().to_string(),
                    hex_preview(frame.body.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} ({}) item={} discriminator=0x{:04X} size={} body={}",
                kind_name(frame.kind),
                family_name(frame.kind),
                frame.item().name(),
                frame.discriminator,
                frame.body.len(),
                hex_preview(frame.body.as_ref())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.body.as_ref());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn kind_name(kind: FrameKind) -> &'static str {
    match kind {
        FrameKind::SetControlItem => "SET",
        FrameKind::CurrentControlItem => "CURRENT",
        FrameKind::ControlItemRange => "RANGE",
        FrameKind::Ack => "ACK",
        FrameKind::DataItem0 => "DATA0",
        FrameKind::DataItem1 => "DATA1",
        FrameKind::DataItem2 => "DATA2",
        FrameKind::DataItem3 => "DATA3",
    }
}

fn family_name(kind: FrameKind) -> &'static str {
    if kind.is_control() {
        "control"
    } else {
        "data"
    }
}

/// First bytes of the body as hex, elided past 32 bytes.
fn hex_preview(body: &[u8]) -> String {
    const PREVIEW: usize = 32;
    let shown: Vec<String> = body
        .iter()
        .take(PREVIEW)
        .map(|b| format!("{b:02X}"))
        .collect();
    let mut out = shown.join(" ");
    if body.len() > PREVIEW {
        out.push_str(&format!(" .. (+{} bytes)", body.len() - PREVIEW));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_preview_elides_long_bodies() {
        assert_eq!(hex_preview(&[0xAB, 0x01]), "AB 01");

        let long = vec![0u8; 40];
        let preview = hex_preview(&long);
        assert!(preview.ends_with(".. (+8 bytes)"));
    }

    #[test]
    fn kind_names_cover_both_families() {
        assert_eq!(kind_name(FrameKind::Ack), "ACK");
        assert_eq!(kind_name(FrameKind::DataItem2), "DATA2");
    }
}
