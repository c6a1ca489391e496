//! Command line handling.
//!
//! Examples:
//!   mvast run.json
//!   mvast run.json --participant P12
//!   mvast --participant P12 --schedule EXP1_master_trials.csv \
//!         --image-a checker_a.png --image-b checker_b.png --out data
//!
//! A config file, when given, is loaded first and the flags override it.

use mvast_experiment::RunConfig;
use std::path::PathBuf;
use std::process;

pub fn usage() -> ! {
    eprintln!("mvast (flicker discomfort rating run)");
    eprintln!("Usage: mvast [config.json] [options]\n");
    eprintln!("Options:");
    eprintln!("  --participant <id>          Participant identifier");
    eprintln!("  --schedule <file.csv>       Master trial schedule");
    eprintln!("  --image-a <file>            First checkerboard image");
    eprintln!("  --image-b <file>            Second checkerboard image");
    eprintln!("  --out <dir>                 Output directory (default: data)");
    eprintln!("  --font <file.ttf>           Font for on-screen text");
    eprintln!("  --no-instructions           Start with the first trial");
    process::exit(1);
}

#[derive(Debug, Default, PartialEq)]
struct Overrides {
    participant: Option<String>,
    schedule: Option<PathBuf>,
    image_a: Option<PathBuf>,
    image_b: Option<PathBuf>,
    out: Option<PathBuf>,
    font: Option<PathBuf>,
    no_instructions: bool,
}

/// Builds the run configuration from the arguments after the program name.
pub fn parse_args(args: &[String]) -> Result<RunConfig, String> {
    let mut config_path: Option<PathBuf> = None;
    let mut o = Overrides::default();

    let mut it = args.iter();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| format!("{flag} needs a value"))
        };
        match arg.as_str() {
            "-h" | "--help" => usage(),
            "--participant" => o.participant = Some(value(arg)?),
            "--schedule" => o.schedule = Some(value(arg)?.into()),
            "--image-a" => o.image_a = Some(value(arg)?.into()),
            "--image-b" => o.image_b = Some(value(arg)?.into()),
            "--out" => o.out = Some(value(arg)?.into()),
            "--font" => o.font = Some(value(arg)?.into()),
            "--no-instructions" => o.no_instructions = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path if config_path.is_none() => config_path = Some(path.into()),
            extra => return Err(format!("unexpected argument {extra}")),
        }
    }

    let mut config = match config_path {
        Some(path) => RunConfig::from_json_file(&path).map_err(|e| e.to_string())?,
        None => {
            let missing = |name: &str| format!("{name} is required without a config file");
            RunConfig::new(
                o.participant.take().ok_or_else(|| missing("--participant"))?,
                o.schedule.take().ok_or_else(|| missing("--schedule"))?,
                o.image_a.take().ok_or_else(|| missing("--image-a"))?,
                o.image_b.take().ok_or_else(|| missing("--image-b"))?,
            )
        }
    };
    apply(&mut config, o);
    Ok(config)
}

fn apply(config: &mut RunConfig, o: Overrides) {
    if let Some(v) = o.participant {
        config.participant_id = v;
    }
    if let Some(v) = o.schedule {
        config.schedule = v;
    }
    if let Some(v) = o.image_a {
        config.image_a = v;
    }
    if let Some(v) = o.image_b {
        config.image_b = v;
    }
    if let Some(v) = o.out {
        config.output_dir = v;
    }
    if o.font.is_some() {
        config.font = o.font;
    }
    if o.no_instructions {
        config.show_instructions = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn flags_alone_build_a_config() {
        let cfg = parse_args(&args(
            "--participant P3 --schedule s.csv --image-a a.png --image-b b.png --out runs --no-instructions",
        ))
        .unwrap();
        assert_eq!(cfg.participant_id, "P3");
        assert_eq!(cfg.schedule, PathBuf::from("s.csv"));
        assert_eq!(cfg.output_dir, PathBuf::from("runs"));
        assert!(!cfg.show_instructions);
        assert_eq!(cfg.font, None);
    }

    #[test]
    fn flags_override_the_config_file() {
        let path = std::env::temp_dir().join(format!("mvast-cli-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"participant_id":"P1","schedule":"s.csv","image_a":"a.png","image_b":"b.png"}"#,
        )
        .unwrap();
        let mut a = vec![path.display().to_string()];
        a.extend(args("--participant P9 --font f.ttf"));
        let cfg = parse_args(&a).unwrap();
        assert_eq!(cfg.participant_id, "P9");
        assert_eq!(cfg.image_b, PathBuf::from("b.png"));
        assert_eq!(cfg.font, Some(PathBuf::from("f.ttf")));
        assert!(cfg.show_instructions);
    }

    #[test]
    fn reports_missing_and_unknown_arguments() {
        assert!(parse_args(&args("--participant P1")).unwrap_err().contains("--schedule"));
        assert!(parse_args(&args("--bogus")).unwrap_err().contains("unknown option"));
        assert!(parse_args(&args("--out")).unwrap_err().contains("needs a value"));
        assert!(parse_args(&args("a.json b.json")).unwrap_err().contains("unexpected"));
    }
}
