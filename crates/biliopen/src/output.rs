use std::io::IsTerminal;

use biliopen_frame::Frame;
use biliopen_live::{Danmaku, DanmakuType, LiveEvent};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

const BODY_PREVIEW_LIMIT: usize = 256;

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

pub fn print_event(event: &LiveEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIME", "ROOM", "UID", "USER", "KIND", "MESSAGE"]);
            if let Some(row) = event_row(event) {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if let Some(line) = event_line(event) {
                println!("{line}");
            }
        }
    }
}

fn event_row(event: &LiveEvent) -> Option<Vec<String>> {
    match event {
        LiveEvent::Danmaku(dm) => Some(vec![
            dm.timestamp.to_string(),
            dm.room_id.to_string(),
            dm.uid.to_string(),
            dm.uname.clone(),
            kind_name(dm.dm_type).to_string(),
            danmaku_text(dm),
        ]),
        _ => None,
    }
}

pub fn event_line(event: &LiveEvent) -> Option<String> {
    match event {
        LiveEvent::Danmaku(dm) => {
            let medal = if dm.fans_medal_wearing_status && !dm.fans_medal_name.is_empty() {
                format!("[{} {}] ", dm.fans_medal_name, dm.fans_medal_level)
            } else {
                String::new()
            };
            let admin = if dm.is_admin() { " (admin)" } else { "" };
            Some(format!(
                "room={} {medal}{}{admin}: {}",
                dm.room_id,
                dm.uname,
                danmaku_text(dm)
            ))
        }
        _ => None,
    }
}

fn danmaku_text(dm: &Danmaku) -> String {
    match dm.dm_type {
        DanmakuType::Sticker if !dm.emoji_img_url.is_empty() => {
            format!("{} <{}>", dm.msg, dm.emoji_img_url)
        }
        _ => dm.msg.clone(),
    }
}

fn kind_name(kind: DanmakuType) -> &'static str {
    match kind {
        DanmakuType::Text => "text",
        DanmakuType::Sticker => "sticker",
        DanmakuType::Voice => "voice",
        DanmakuType::Other(_) => "other",
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    packet_length: usize,
    version: u16,
    operation: u32,
    operation_name: &'a str,
    sequence: u32,
    body_size: usize,
    body: String,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let out = FrameOutput {
        packet_length: frame.wire_size(),
        version: frame.version,
        operation: frame.operation.code(),
        operation_name: frame.operation.name(),
        sequence: frame.sequence,
        body_size: frame.body.len(),
        body: body_preview(frame.body.as_ref()),
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OPERATION", "SEQUENCE", "VERSION", "SIZE", "BODY"])
                .add_row(vec![
                    format!("{} ({})", out.operation_name, out.operation),
                    out.sequence.to_string(),
                    out.version.to_string(),
                    out.body_size.to_string(),
                    out.body,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "operation={} ({}) sequence={} version={} size={} body={}",
            out.operation,
            out.operation_name,
            out.sequence,
            out.version,
            out.body_size,
            out.body
        ),
    }
}

pub fn body_preview(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) if text.chars().count() > BODY_PREVIEW_LIMIT => {
            let cut: String = text.chars().take(BODY_PREVIEW_LIMIT).collect();
            format!("{cut}...")
        }
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", body.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_line_shows_medal_and_sticker() {
        let event = LiveEvent::Danmaku(Danmaku {
            room_id: 9,
            uname: "alice".to_string(),
            msg: "[doge]".to_string(),
            dm_type: DanmakuType::Sticker,
            emoji_img_url: "https://i0.hdslb.com/doge.png".to_string(),
            fans_medal_wearing_status: true,
            fans_medal_name: "fan".to_string(),
            fans_medal_level: 12,
            ..Danmaku::default()
        });
        assert_eq!(
            event_line(&event).unwrap(),
            "room=9 [fan 12] alice: [doge] <https://i0.hdslb.com/doge.png>"
        );
    }

    #[test]
    fn preview_marks_binary_and_truncates() {
        assert_eq!(body_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
        let long = "x".repeat(BODY_PREVIEW_LIMIT + 10);
        assert!(body_preview(long.as_bytes()).ends_with("..."));
        assert_eq!(body_preview(b"{}"), "{}");
    }
}
