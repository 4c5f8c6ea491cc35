use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let args: Vec<String> = env::args().collect();
  if !(2..=3).contains(&args.len()) {
    let program = args.first().map(String::as_str).unwrap_or("stackc");
    eprintln!("usage: {program} <source> [output]");
    process::exit(1);
  }

  let source_path = Path::new(&args[1]);
  let output_path = args
    .get(2)
    .map(PathBuf::from)
    .unwrap_or_else(|| source_path.with_extension("tam"));

  let source = match fs::read_to_string(source_path) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("error: cannot read {}: {err}", source_path.display());
      process::exit(1);
    }
  };

  match stackc::compile(&source) {
    Ok(code) => {
      if let Err(err) = fs::write(&output_path, code) {
        eprintln!("error: cannot write {}: {err}", output_path.display());
        process::exit(1);
      }
    }
    Err(err) => {
      eprintln!("{}", err.render(&source));
      process::exit(1);
    }
  }
}
