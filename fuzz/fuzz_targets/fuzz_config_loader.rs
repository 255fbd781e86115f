#![no_main]

use bookwright::config::ConfigLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        let loader = ConfigLoader::with_defaults();

        // Only panics matter here
        let _ = loader.load_volumes_from_str(yaml_str);
    }
});
