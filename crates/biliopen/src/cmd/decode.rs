use biliopen_frame::{decode_frame, Operation};
use biliopen_live::decode_event;
use bytes::Bytes;
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_event, print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let data = parse_hex(&args.hex)?;
    let frame = decode_frame(&data).map_err(|err| frame_error("decode failed", err))?;
    print_frame(&frame, format);

    if frame.operation == Operation::MessageAck {
        match decode_event(&frame.body) {
            Ok(Some(event)) => print_event(&event, format),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "message body is not a known event"),
        }
    }
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Bytes> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|err| CliError::new(USAGE, format!("invalid hex input: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_ignores_whitespace_and_prefix() {
        let data = parse_hex("0x0000 0012\n0010").unwrap();
        assert_eq!(data.as_ref(), &[0, 0, 0, 0x12, 0, 0x10]);
    }

    #[test]
    fn parse_hex_rejects_odd_length() {
        assert_eq!(parse_hex("abc").unwrap_err().code, USAGE);
    }

    #[test]
    fn heartbeat_ack_decodes() {
        let data = parse_hex("00000014 0010 0000 00000003 00000001 00000001").unwrap();
        let frame = decode_frame(&data).unwrap();
        assert_eq!(frame.operation, Operation::HeartbeatAck);
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.body.len(), 4);
    }
}
