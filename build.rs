use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

const DEFAULT_BUFFER_SIZE: usize = 257;
const DEFAULT_ALIGNMENT: usize = 4;
const MAX_ALIGNMENT: usize = 16;

fn main() {
  println!("cargo:rerun-if-env-changed=PRIVHEAP_BUFFER_SIZE");
  println!("cargo:rerun-if-env-changed=PRIVHEAP_ALIGNMENT");
  if let Err(err) = generate_heap_config() {
    panic!("heap configuration failed: {err}");
  }
}

fn generate_heap_config() -> Result<(), Box<dyn Error>> {
  let buffer_size = parse_env("PRIVHEAP_BUFFER_SIZE")?.unwrap_or(DEFAULT_BUFFER_SIZE);
  let alignment = parse_env("PRIVHEAP_ALIGNMENT")?.unwrap_or(DEFAULT_ALIGNMENT);

  if !alignment.is_power_of_two() {
    return Err(format!("PRIVHEAP_ALIGNMENT must be a power of two, got {alignment}").into());
  }
  if alignment > MAX_ALIGNMENT {
    return Err(format!("PRIVHEAP_ALIGNMENT must be <= {MAX_ALIGNMENT}, got {alignment}").into());
  }
  if buffer_size == 0 {
    return Err("PRIVHEAP_BUFFER_SIZE must be > 0".into());
  }

  let out_dir = PathBuf::from(env::var("OUT_DIR")?);
  let config_path = out_dir.join("heap_config.rs");
  let contents = format!(
    "pub const HEAP_BUFFER_SIZE_CFG: usize = {buffer_size};\n\
     pub const BYTE_ALIGNMENT_CFG: usize = {alignment};\n"
  );
  fs::write(config_path, contents)?;
  Ok(())
}

fn parse_env(name: &str) -> Result<Option<usize>, Box<dyn Error>> {
  match env::var(name) {
    Ok(val) => {
      let trimmed = val.trim();
      if trimmed.is_empty() {
        return Ok(None);
      }

      let parsed = if let Some(rest) = trimmed.strip_prefix("0x") {
        usize::from_str_radix(rest, 16)?
      } else {
        trimmed.parse()?
      };
      Ok(Some(parsed))
    }
    Err(env::VarError::NotPresent) => Ok(None),
    Err(other) => Err(Box::new(other)),
  }
}
