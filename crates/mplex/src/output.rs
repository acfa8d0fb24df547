use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
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

/// One decoded frame.
#[derive(Serialize)]
pub struct FrameRecord {
    pub group: usize,
    pub id: u8,
    pub id_name: &'static str,
    pub len: u16,
    pub destuffed: usize,
    #[serde(skip)]
    pub payload: Vec<u8>,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    #[serde(flatten)]
    record: &'a FrameRecord,
    payload: String,
    payload_hex: String,
}

/// Header fields and sizes of one group.
#[derive(Serialize)]
pub struct GroupRecord {
    pub group: usize,
    pub version: u8,
    pub timestamp_sec: u32,
    pub timestamp_nsec: u32,
    pub num_frames: u16,
    pub header_len: u8,
    pub hcrc: u8,
    pub header_valid: bool,
    pub size: usize,
    pub valid_frames: usize,
}

/// Result of `encode --output`.
#[derive(Serialize)]
pub struct EncodeSummary {
    pub output: String,
    pub size: usize,
    pub frames: u16,
    pub stuffed: usize,
    pub hcrc: u8,
}

pub fn print_frames(records: &[FrameRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                let out = FrameOutput {
                    record,
                    payload: payload_preview(&record.payload),
                    payload_hex: hex::encode(&record.payload),
                };
                print_json(&out);
            }
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["GROUP", "ID", "LEN", "PAYLOAD"]);
            for record in records {
                table.add_row(vec![
                    record.group.to_string(),
                    record.id.to_string(),
                    record.payload.len().to_string(),
                    payload_preview(&record.payload),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!(
                    "group={} id={} ({}) len={} destuffed={} payload={}",
                    record.group,
                    record.id,
                    record.id_name,
                    record.payload.len(),
                    record.destuffed,
                    payload_preview(&record.payload)
                );
            }
        }
        OutputFormat::Raw => {
            for record in records {
                print_raw(&record.payload);
            }
        }
    }
}

pub fn print_groups(records: &[GroupRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => records.iter().for_each(print_json),
        OutputFormat::Table => {
            let mut table = new_table(vec![
                "GROUP", "VERSION", "TIMESTAMP", "FRAMES", "VALID", "SIZE", "HCRC",
            ]);
            for record in records {
                table.add_row(vec![
                    record.group.to_string(),
                    record.version.to_string(),
                    format!("{}.{:09}", record.timestamp_sec, record.timestamp_nsec),
                    record.num_frames.to_string(),
                    record.valid_frames.to_string(),
                    record.size.to_string(),
                    format!("{:#04x}", record.hcrc),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for record in records {
                println!(
                    "group={} version={} timestamp={}.{:09} frames={} valid_frames={} size={} header_len={} hcrc={:#04x} header_valid={}",
                    record.group,
                    record.version,
                    record.timestamp_sec,
                    record.timestamp_nsec,
                    record.num_frames,
                    record.valid_frames,
                    record.size,
                    record.header_len,
                    record.hcrc,
                    record.header_valid
                );
            }
        }
    }
}

pub fn print_encoded(summary: &EncodeSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(summary),
        OutputFormat::Table => {
            let mut table = new_table(vec!["OUTPUT", "SIZE", "FRAMES", "STUFFED", "HCRC"]);
            table.add_row(vec![
                summary.output.clone(),
                summary.size.to_string(),
                summary.frames.to_string(),
                summary.stuffed.to_string(),
                format!("{:#04x}", summary.hcrc),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "wrote {} bytes ({} frames, {} stuffed) to {}",
                summary.size, summary.frames, summary.stuffed, summary.output
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
