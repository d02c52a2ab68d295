use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("streamchan {}", env!("CARGO_PKG_VERSION"));
    if args.extended {
        println!(
            "target: {}",
            option_env!("STREAMCHAN_BUILD_TARGET").unwrap_or("unknown")
        );
        println!(
            "profile: {}",
            option_env!("STREAMCHAN_BUILD_PROFILE").unwrap_or("unknown")
        );
        println!(
            "max_payload: {} bytes",
            streamchan_codec::DEFAULT_MAX_PAYLOAD
        );
    }
    Ok(SUCCESS)
}
