//! Fuzz target for both configuration parsers.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to the daemon config loader (JSON, then TOML) and to
//! the settings parser. A daemon document that parses must also survive a
//! write and re-read unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use yggcommander_config::{AppConfig, ConfigSource, DaemonConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = AppConfig::parse(text);

    if let Some((config, _)) = DaemonConfig::parse(text) {
        let _ = config.tunnel_routing();
        let written = config
            .to_pretty_json()
            .expect("parsed document must serialize");
        let (reread, source) = DaemonConfig::parse(&written).expect("written document must parse");
        assert_eq!(source, ConfigSource::Json);
        assert_eq!(reread, config);
    }
});
