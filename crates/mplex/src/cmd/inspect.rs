use crate::cmd::decode::visit_frames;
use crate::cmd::{for_each_group, InspectArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_groups, GroupRecord, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let mut records = Vec::new();

    for_each_group(args.path.as_deref(), args.max_group_size, |index, mut group| {
        let mut valid_frames = 0usize;
        visit_frames(&mut group, |_| {
            valid_frames += 1;
            Ok(())
        })?;

        let (timestamp_sec, timestamp_nsec) = group.timestamp();
        records.push(GroupRecord {
            group: index,
            version: group.version(),
            timestamp_sec,
            timestamp_nsec,
            num_frames: group.num_frames(),
            header_len: group.header_len(),
            hcrc: group.hcrc(),
            header_valid: group.header_is_valid(),
            size: group.calc_group_size(),
            valid_frames,
        });
        Ok(())
    })?;

    print_groups(&records, format);
    Ok(SUCCESS)
}
