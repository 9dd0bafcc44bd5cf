use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");
    if !args.extended {
        println!("{name} {version}");
        return Ok(SUCCESS);
    }

    println!("name: {name}");
    println!("version: {version}");
    println!(
        "build_target: {}",
        option_env!("NX584_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("default_baud: {}", nx584_transport::DEFAULT_BAUD);
    println!(
        "features: panel={}, async={}, cli=true",
        cfg!(feature = "panel"),
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
