use nx584_frame::Message;
use nx584_panel::{commands, ArmAction, PanelConfig};

use crate::cmd::{deliver, open, CommandArgs, Request};
use crate::exit::{panel_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: CommandArgs, format: OutputFormat, config: PanelConfig) -> CliResult<i32> {
    let message = build(&args.request).map_err(|err| panel_error("invalid request", err))?;
    let mut conn = open(&args.addr, config)?;
    deliver(&conn, message, &args.reply, format)?;
    conn.disconnect();
    Ok(SUCCESS)
}

fn build(request: &Request) -> nx584_panel::Result<Message> {
    Ok(match request {
        Request::ZoneName { zone } => commands::zone_name(*zone)?,
        Request::ZoneStatus { zone } => commands::zone_status(*zone)?,
        Request::PartitionStatus { partition } => commands::partition_status(*partition)?,
        Request::PartitionSnapshot => commands::partition_snapshot(),
        Request::SystemStatus => commands::system_status(),
        Request::UserInfo { user } => commands::user_info(*user)?,
        Request::AudibleOff => commands::keypad_function(ArmAction::AudibleOff),
        Request::Disarm => commands::keypad_function(ArmAction::Disarm),
        Request::ArmAway => commands::keypad_function(ArmAction::ArmAway),
        Request::ArmStay => commands::keypad_function(ArmAction::ArmStay),
        Request::AutoArm => commands::keypad_function(ArmAction::AutoArm),
        Request::Ack => commands::ack(),
        Request::Nak => commands::nak(),
    })
}
