use std::{env, fs, fs::File, io::prelude::*, path::Path};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=rules/");

    let out_dir = env::var("OUT_DIR")?;

    let dest_rules_path = Path::new(&out_dir).join("all-rules.yaml");

    let mut paths: Vec<_> = fs::read_dir("./rules")?.filter_map(Result::ok).collect();
    paths.sort_by_key(std::fs::DirEntry::path);

    let mut all_group_rules = String::new();
    for entry in &paths {
        let contents = fs::read_to_string(entry.path())?;
        all_group_rules.push_str(&contents);
        all_group_rules.push('\n');
    }

    let mut file = File::create(dest_rules_path)?;
    file.write_all(all_group_rules.as_bytes())?;

    Ok(())
}
