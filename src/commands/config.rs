//! `roam config`: print the effective configuration

use super::Context;
use crate::config::Config;
use crate::error::Result;

pub fn run(ctx: &Context) -> Result<()> {
    println!("{}", render(&ctx.config)?);
    Ok(())
}

fn render(config: &Config) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::tests::config;

    #[test]
    fn test_render_includes_remotes() {
        let text = render(&config()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["workspace"], "/work");
        assert_eq!(value["remotes"]["corp"]["clone"], "gitlab.example.com");
        assert_eq!(value["remotes"]["github"]["provider"], "github");
    }
}
