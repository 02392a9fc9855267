use super::print_json;
use depwatch_core::version::{user_agent, version_string};
use depwatch_core::VERSION;
use miette::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionResult {
    ok: bool,
    version: &'static str,
    user_agent: String,
}

pub fn run(json: bool) -> Result<()> {
    if json {
        return print_json(&VersionResult {
            ok: true,
            version: VERSION,
            user_agent: user_agent(),
        });
    }
    println!("{}", version_string());
    Ok(())
}
