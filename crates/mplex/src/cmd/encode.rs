use std::fs::File;
use std::io::BufWriter;

use mplex_frame::{Group, GroupWriter};
use tracing::{debug, info};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_encoded, EncodeSummary, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.frames.is_empty() && args.hex_frames.is_empty() {
        return Err(CliError::usage(
            "at least one --frame or --hex-frame is required",
        ));
    }

    let avoid = args.stuff.as_ref().map(|avoid| avoid.0.as_slice());
    let mut group = Group::new();
    let mut stuffed = 0usize;

    for arg in args.frames.iter().chain(&args.hex_frames) {
        let context = format!("frame {}", arg.id);
        let mut frame = group
            .curr_frame()
            .map_err(|err| frame_error(&context, err))?;
        frame
            .write_bytes(&arg.payload)
            .map_err(|err| frame_error(&context, err))?;
        if let Some(avoid) = avoid {
            stuffed += frame
                .byte_stuff(avoid)
                .map_err(|err| frame_error(&context, err))?;
        }
        frame
            .write_header(arg.id)
            .map_err(|err| frame_error(&context, err))?;
        debug!(id = arg.id, len = frame.len(), crc = frame.crc(), "frame finalized");
        group
            .commit_frame()
            .map_err(|err| frame_error(&context, err))?;
    }

    group
        .write_header_trailer()
        .map_err(|err| frame_error("finalize group", err))?;

    let summary = EncodeSummary {
        output: args
            .output
            .as_ref()
            .map_or_else(|| "-".to_string(), |path| path.display().to_string()),
        size: group.calc_group_size(),
        frames: group.num_frames(),
        stuffed,
        hcrc: group.hcrc(),
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("create {}", path.display()), err))?;
            GroupWriter::new(BufWriter::new(file))
                .write_group(&group)
                .map_err(|err| frame_error("write group", err))?;
            print_encoded(&summary, format);
        }
        None => {
            GroupWriter::new(std::io::stdout().lock())
                .write_group(&group)
                .map_err(|err| frame_error("write group", err))?;
            info!(
                size = summary.size,
                frames = summary.frames,
                stuffed = summary.stuffed,
                "group written to stdout"
            );
        }
    }

    Ok(SUCCESS)
}
