use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use streamchan_codec::Packet;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Render one received packet as a single line (or table) on stdout.
pub fn print_packet(packet: &Packet, format: OutputFormat) {
    println!("{}", render_packet(packet, format));
}

fn render_packet(packet: &Packet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string(packet).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "VALUE"])
                .add_row(vec![packet.type_name.clone(), packet.value.to_string()]);
            table.to_string()
        }
        OutputFormat::Pretty => format!("type={} value={}", packet.type_name, packet.value),
    }
}
