use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use mplex_frame::{
    FrameError, Group, GroupConfig, GroupReader, GROUP_MAX_SIZE, MAX_USER_ID,
};

use crate::exit::{frame_error, io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one group from the given frames and write it out.
    Encode(EncodeArgs),
    /// Print the valid frames of every group in a stream.
    Decode(DecodeArgs),
    /// Print group header fields and sizes.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// One `ID=PAYLOAD` argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameArg {
    pub id: u8,
    pub payload: Vec<u8>,
}

/// A byte sequence given as hex on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Text frame, repeatable. Text frames are written before hex frames.
    #[arg(long = "frame", value_name = "ID=TEXT", value_parser = parse_text_frame)]
    pub frames: Vec<FrameArg>,
    /// Binary frame given as hex, repeatable.
    #[arg(long = "hex-frame", value_name = "ID=HEX", value_parser = parse_hex_frame)]
    pub hex_frames: Vec<FrameArg>,
    /// Byte-stuff every payload so this sequence (hex, 2+ bytes) never appears.
    #[arg(long, value_name = "HEX", value_parser = parse_hex_bytes)]
    pub stuff: Option<HexBytes>,
    /// Write the group here instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Group stream to read. Default: stdin.
    pub path: Option<PathBuf>,
    /// Undo byte stuffing of this sequence (hex) on every frame.
    #[arg(long, value_name = "HEX", value_parser = parse_hex_bytes)]
    pub stuff: Option<HexBytes>,
    /// Only print frames with these IDs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub id: Option<Vec<u8>>,
    /// Largest group accepted from the stream.
    #[arg(long, default_value_t = GROUP_MAX_SIZE)]
    pub max_group_size: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Group stream to read. Default: stdin.
    pub path: Option<PathBuf>,
    /// Largest group accepted from the stream.
    #[arg(long, default_value_t = GROUP_MAX_SIZE)]
    pub max_group_size: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_frame_arg(
    arg: &str,
    payload: impl FnOnce(&str) -> Result<Vec<u8>, String>,
) -> Result<FrameArg, String> {
    let (id, data) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=PAYLOAD, got {arg:?}"))?;
    let id: u8 = id
        .trim()
        .parse()
        .map_err(|err| format!("invalid frame id {id:?}: {err}"))?;
    if id > MAX_USER_ID {
        return Err(format!("frame id {id} out of range 0..={MAX_USER_ID}"));
    }
    Ok(FrameArg {
        id,
        payload: payload(data)?,
    })
}

fn parse_text_frame(arg: &str) -> Result<FrameArg, String> {
    parse_frame_arg(arg, |text| Ok(text.as_bytes().to_vec()))
}

fn parse_hex_frame(arg: &str) -> Result<FrameArg, String> {
    parse_frame_arg(arg, parse_hex)
}

fn parse_hex_bytes(arg: &str) -> Result<HexBytes, String> {
    parse_hex(arg).map(HexBytes)
}

fn parse_hex(arg: &str) -> Result<Vec<u8>, String> {
    hex::decode(arg.trim()).map_err(|err| format!("invalid hex {arg:?}: {err}"))
}

fn open_input(path: Option<&Path>) -> CliResult<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("open {}", path.display()), err))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(std::io::stdin().lock())),
    }
}

/// Feed every group of the input to `visit` in stream order. Returns the
/// number of groups read.
fn for_each_group(
    path: Option<&Path>,
    max_group_size: usize,
    mut visit: impl FnMut(usize, Group) -> CliResult<()>,
) -> CliResult<usize> {
    let input = open_input(path)?;
    let mut reader = GroupReader::with_config(input, GroupConfig { max_group_size });
    let mut index = 0usize;
    loop {
        match reader.read_group() {
            Ok(group) => {
                visit(index, group)?;
                index += 1;
            }
            Err(FrameError::ConnectionClosed) => return Ok(index),
            Err(err) => return Err(frame_error("read group", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_arg_parsing() {
        assert_eq!(
            parse_text_frame("7=a=b").unwrap(),
            FrameArg {
                id: 7,
                payload: b"a=b".to_vec()
            }
        );
        assert_eq!(parse_text_frame("0=").unwrap().payload, b"");
        assert_eq!(parse_hex_frame("126=00ff").unwrap().payload, [0x00, 0xFF]);
        assert!(parse_text_frame("no-separator").is_err());
        assert!(parse_text_frame("x=1").is_err());
        assert!(parse_text_frame("300=1").is_err());
        assert!(parse_hex_frame("1=abc").is_err());
    }
}
