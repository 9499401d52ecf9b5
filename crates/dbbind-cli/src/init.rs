use crate::cli::InitArgs;
use std::path::Path;

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    write_template(&args.config)?;
    println!("wrote {}", args.config.display());
    Ok(())
}

const TEMPLATE: &str = r#"version = "1"

[database]
url = "${DATABASE_URL}"

[session]
# Placeholder style sent to the driver; PostgreSQL uses "dollar".
# param_style = "dollar"
# Compiled statements to keep (0 disables the cache).
compile_cache = 64

[executor]
chunk_size = 10000
verbose_first_chunk = false
commit_chunks = true
failure_policy = "abort" # abort | isolate
"#;

fn write_template(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", path.display());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create directory {}: {e}", parent.display())
            })?;
        }
    }

    std::fs::write(path, TEMPLATE)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn template_is_a_valid_config() {
        let raw = TEMPLATE.replace("${DATABASE_URL}", "postgres://localhost/db");
        let file = ConfigFile::parse(&raw).unwrap();
        assert_eq!(file.executor.chunk_size, 10_000);
        assert_eq!(file.session.compile_cache, 64);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("dbbind-init-{}", std::process::id()));
        let path = dir.join("nested").join("dbbind.toml");
        let _ = std::fs::remove_dir_all(&dir);

        write_template(&path).unwrap();
        assert!(path.exists());
        assert!(write_template(&path).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
