use pupila_app::PUPILA_APP_ABI_VERSION;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("pupila {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: pupila");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("PUPILA_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("unit_abi: {PUPILA_APP_ABI_VERSION}");
    println!(
        "unit_entry_symbol: {}",
        pupila_app::PUPILA_APP_ENTRY_SYMBOL
    );

    Ok(SUCCESS)
}
