use mplex_frame::{ids, Frame, Group, Mode};
use tracing::debug;

use crate::cmd::{for_each_group, DecodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frames, FrameRecord, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let avoid = args.stuff.as_ref().map(|avoid| avoid.0.as_slice());
    let mut records = Vec::new();

    let groups = for_each_group(args.path.as_deref(), args.max_group_size, |index, mut group| {
        let before = records.len();
        visit_frames(&mut group, |frame| {
            if args.id.as_ref().is_none_or(|ids| ids.contains(&frame.id())) {
                records.push(record(index, frame, avoid)?);
            }
            Ok(())
        })?;
        debug!(group = index, frames = records.len() - before, "group decoded");
        Ok(())
    })?;

    debug!(groups, frames = records.len(), "stream decoded");
    print_frames(&records, format);
    Ok(SUCCESS)
}

/// Call `visit` on every valid data frame of a received group, in order.
pub(crate) fn visit_frames(
    group: &mut Group,
    mut visit: impl FnMut(&Frame<'_>) -> CliResult<()>,
) -> CliResult<()> {
    {
        let first = group
            .curr_frame()
            .map_err(|err| frame_error("read frame", err))?;
        if first.is_valid() && !first.is_end_of_group() {
            visit(&first)?;
        }
    }
    while let Some(frame) = group
        .next_valid_frame()
        .map_err(|err| frame_error("scan group", err))?
    {
        visit(&frame)?;
    }
    Ok(())
}

/// Destuffing runs on a copy so the group buffer keeps validating.
fn record(group: usize, frame: &Frame<'_>, avoid: Option<&[u8]>) -> CliResult<FrameRecord> {
    let context = format!("group {group} frame {}", frame.id());
    let mut copy = frame.buf()[..frame.msg_size()].to_vec();
    let mut view =
        Frame::new(&mut copy, Mode::Read).map_err(|err| frame_error(&context, err))?;
    let destuffed = match avoid {
        Some(avoid) => view
            .byte_destuff(avoid)
            .map_err(|err| frame_error(&context, err))?,
        None => 0,
    };

    Ok(FrameRecord {
        group,
        id: frame.id(),
        id_name: ids::id_name(frame.id()),
        len: frame.len(),
        destuffed,
        payload: view.payload().unwrap_or_default().to_vec(),
    })
}
