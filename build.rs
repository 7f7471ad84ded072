use std::fs;

const DEFAULT_CONFIG: &str = "src/default_config.toml";
const SECTIONS: [&str; 3] = ["section", "parse", "render"];

fn main() {
    // `Config::compiled_default` falls back silently, so a broken file must fail here
    println!("cargo:rerun-if-changed={}", DEFAULT_CONFIG);

    let content = fs::read_to_string(DEFAULT_CONFIG)
        .unwrap_or_else(|e| panic!("heading-range: cannot read {}: {}", DEFAULT_CONFIG, e));

    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("heading-range: {} is not valid TOML: {}", DEFAULT_CONFIG, e),
    };

    for section in SECTIONS {
        if !table.get(section).is_some_and(toml::Value::is_table) {
            panic!("heading-range: {} is missing the [{}] table", DEFAULT_CONFIG, section);
        }
    }
}
